// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Monitor trait, shared types, and the concrete monitors.
//!
//! "Monitoring" here means actively sampling a resource (frame timings,
//! process memory) to keep a bounded rolling history, as opposed to
//! discrete event-based metrics. Housekeeping periodically calls
//! `update` and asks for threshold issues; nothing here ever touches the
//! state store.

mod leak;
mod memory;
mod performance;
mod registry;

pub use leak::LeakTracker;
pub use memory::{MemoryMonitor, MemoryTrend};
pub use performance::{PerfIssue, PerfThresholds, PerformanceMonitor};
pub use registry::MonitorRegistry;

use std::borrow::Cow;
use std::fmt::Debug;

/// The general type of resource a monitor observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitoredResourceType {
    /// Main system RAM used by this process.
    SystemRam,
    /// Loop iteration and callback timings.
    FrameTiming,
}

/// The core trait for a passive resource monitor.
///
/// A monitor is a stateful sampler owned by the application context. The
/// housekeeping activity holds a [`MonitorRegistry`] of these and
/// periodically calls [`update`](ResourceMonitor::update), then consumes
/// [`stats`](ResourceMonitor::stats) or [`report`](ResourceMonitor::report).
pub trait ResourceMonitor: Send + Sync + Debug + 'static {
    /// Returns a unique, human-readable identifier for this monitor
    /// instance.
    fn monitor_id(&self) -> Cow<'static, str>;

    /// Returns the general type of resource being monitored.
    fn resource_type(&self) -> MonitoredResourceType;

    /// Triggers the monitor to take a sample. Default: no-op, for
    /// monitors that are fed measurements externally.
    fn update(&self) {
        // Default: no-op
    }

    /// Clears the monitor's rolling history.
    fn reset(&self);

    /// Renders a plain-text, human-readable report for operators.
    fn report(&self) -> String;

    /// Returns a structured stats mapping for programmatic consumption.
    fn stats(&self) -> serde_json::Value;
}
