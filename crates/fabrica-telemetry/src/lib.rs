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

//! # Fabrica Telemetry
//!
//! Passive diagnostics for the simulation runtime: a performance monitor
//! (rolling iteration timings, rate thresholds), a memory monitor
//! (process-RSS sampling, trend, leak tracking), and a registry the
//! game loop's housekeeping activity drives. Monitors observe; they
//! never mutate simulation state.

pub mod monitoring;

pub use monitoring::{
    LeakTracker, MemoryMonitor, MemoryTrend, MonitorRegistry, MonitoredResourceType, PerfIssue,
    PerfThresholds, PerformanceMonitor, ResourceMonitor,
};
