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

use crate::monitoring::{MonitoredResourceType, ResourceMonitor};
use serde_json::json;
use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Maximum number of iteration durations retained; oldest discarded
/// first.
const HISTORY_CAPACITY: usize = 120;

/// A threshold breach raised by the performance monitor, consumed by
/// housekeeping.
#[derive(Debug, Clone, PartialEq)]
pub enum PerfIssue {
    /// Rolling-average iteration rate fell below the minimum.
    LowRate {
        /// Current rate in iterations per second.
        rate: f64,
    },
    /// A single loop iteration took too long.
    IterationSpike {
        /// Duration of the offending iteration in milliseconds.
        duration_ms: f64,
    },
    /// The update activity of the last iteration took too long.
    UpdateSpike {
        /// Update duration in milliseconds.
        duration_ms: f64,
    },
    /// The render activity of the last iteration took too long.
    RenderSpike {
        /// Render duration in milliseconds.
        duration_ms: f64,
    },
    /// Process memory exceeded the high-water mark.
    HighMemory {
        /// Current usage in megabytes.
        usage_mb: f64,
    },
}

impl fmt::Display for PerfIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerfIssue::LowRate { rate } => {
                write!(f, "Iteration rate dropped to {rate:.1}/s")
            }
            PerfIssue::IterationSpike { duration_ms } => {
                write!(f, "Iteration spike: {duration_ms:.1} ms")
            }
            PerfIssue::UpdateSpike { duration_ms } => {
                write!(f, "Update spike: {duration_ms:.1} ms")
            }
            PerfIssue::RenderSpike { duration_ms } => {
                write!(f, "Render spike: {duration_ms:.1} ms")
            }
            PerfIssue::HighMemory { usage_mb } => {
                write!(f, "Memory usage high: {usage_mb:.1} MB")
            }
        }
    }
}

/// Thresholds for issue detection.
#[derive(Debug, Clone)]
pub struct PerfThresholds {
    /// Minimum acceptable rolling iteration rate, per second.
    pub min_rate: f64,
    /// Single-iteration duration spike threshold, milliseconds.
    pub iteration_spike_ms: f64,
    /// Update-activity duration spike threshold, milliseconds.
    pub update_spike_ms: f64,
    /// Render-activity duration spike threshold, milliseconds.
    pub render_spike_ms: f64,
    /// Process memory high-water mark, megabytes.
    pub memory_limit_mb: f64,
    /// Minimum time between issue checks; breaches are raised at most
    /// once per interval.
    pub check_interval: Duration,
}

impl Default for PerfThresholds {
    fn default() -> Self {
        Self {
            min_rate: 20.0,
            iteration_spike_ms: 100.0,
            update_spike_ms: 50.0,
            render_spike_ms: 50.0,
            memory_limit_mb: 512.0,
            check_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Default)]
struct PerfInner {
    history: VecDeque<f64>,
    min_rate_seen: Option<f64>,
    last_iteration_ms: f64,
    last_update_ms: f64,
    last_render_ms: f64,
    last_check: Option<Instant>,
    sample_count: u64,
}

/// Rolling-window performance monitor.
///
/// The game loop feeds it per-iteration and per-activity durations; it
/// derives a current rate (1000 / average duration over the window) and
/// the minimum rate ever observed, and raises threshold breaches once
/// per check interval.
#[derive(Debug)]
pub struct PerformanceMonitor {
    thresholds: PerfThresholds,
    inner: Mutex<PerfInner>,
}

impl PerformanceMonitor {
    /// Creates a monitor with the given thresholds.
    pub fn new(thresholds: PerfThresholds) -> Self {
        Self {
            thresholds,
            inner: Mutex::new(PerfInner::default()),
        }
    }

    /// Records the duration of one full loop iteration.
    pub fn record_iteration(&self, duration: Duration) {
        let ms = duration.as_secs_f64() * 1000.0;
        let mut inner = self.inner.lock().unwrap();
        if inner.history.len() == HISTORY_CAPACITY {
            inner.history.pop_front();
        }
        inner.history.push_back(ms);
        inner.last_iteration_ms = ms;
        inner.sample_count += 1;

        if let Some(rate) = rate_of(&inner.history) {
            let lower = inner.min_rate_seen.map_or(true, |min| rate < min);
            if lower {
                inner.min_rate_seen = Some(rate);
            }
        }
    }

    /// Records the update activity's duration for the last iteration.
    pub fn record_update(&self, duration: Duration) {
        self.inner.lock().unwrap().last_update_ms = duration.as_secs_f64() * 1000.0;
    }

    /// Records the render activity's duration for the last iteration.
    pub fn record_render(&self, duration: Duration) {
        self.inner.lock().unwrap().last_render_ms = duration.as_secs_f64() * 1000.0;
    }

    /// Current rate over the rolling window, iterations per second.
    /// `None` until at least one iteration has been recorded.
    pub fn current_rate(&self) -> Option<f64> {
        rate_of(&self.inner.lock().unwrap().history)
    }

    /// The lowest rolling rate observed since creation or reset.
    pub fn minimum_rate(&self) -> Option<f64> {
        self.inner.lock().unwrap().min_rate_seen
    }

    /// Evaluates thresholds and returns any breaches. Rate-limited: at
    /// most one evaluation per check interval; calls in between return
    /// an empty list.
    pub fn check_issues(&self, memory_usage_mb: Option<f64>) -> Vec<PerfIssue> {
        let mut inner = self.inner.lock().unwrap();
        let due = inner
            .last_check
            .map_or(true, |at| at.elapsed() >= self.thresholds.check_interval);
        if !due {
            return Vec::new();
        }
        inner.last_check = Some(Instant::now());

        let mut issues = Vec::new();
        if let Some(rate) = rate_of(&inner.history) {
            if rate < self.thresholds.min_rate {
                issues.push(PerfIssue::LowRate { rate });
            }
        }
        if inner.last_iteration_ms > self.thresholds.iteration_spike_ms {
            issues.push(PerfIssue::IterationSpike {
                duration_ms: inner.last_iteration_ms,
            });
        }
        if inner.last_update_ms > self.thresholds.update_spike_ms {
            issues.push(PerfIssue::UpdateSpike {
                duration_ms: inner.last_update_ms,
            });
        }
        if inner.last_render_ms > self.thresholds.render_spike_ms {
            issues.push(PerfIssue::RenderSpike {
                duration_ms: inner.last_render_ms,
            });
        }
        if let Some(usage_mb) = memory_usage_mb {
            if usage_mb > self.thresholds.memory_limit_mb {
                issues.push(PerfIssue::HighMemory { usage_mb });
            }
        }
        issues
    }
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(PerfThresholds::default())
    }
}

impl ResourceMonitor for PerformanceMonitor {
    fn monitor_id(&self) -> Cow<'static, str> {
        Cow::Borrowed("performance")
    }

    fn resource_type(&self) -> MonitoredResourceType {
        MonitoredResourceType::FrameTiming
    }

    fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = PerfInner::default();
    }

    fn report(&self) -> String {
        let inner = self.inner.lock().unwrap();
        let rate = rate_of(&inner.history);
        let mut out = String::from("=== Performance Monitor ===\n");
        out.push_str(&format!("Samples:        {}\n", inner.sample_count));
        match rate {
            Some(rate) => out.push_str(&format!("Current rate:   {rate:.1}/s\n")),
            None => out.push_str("Current rate:   n/a\n"),
        }
        match inner.min_rate_seen {
            Some(min) => out.push_str(&format!("Minimum rate:   {min:.1}/s\n")),
            None => out.push_str("Minimum rate:   n/a\n"),
        }
        out.push_str(&format!(
            "Last iteration: {:.2} ms (update {:.2} ms, render {:.2} ms)\n",
            inner.last_iteration_ms, inner.last_update_ms, inner.last_render_ms
        ));
        out
    }

    fn stats(&self) -> serde_json::Value {
        let inner = self.inner.lock().unwrap();
        json!({
            "sample_count": inner.sample_count,
            "current_rate": rate_of(&inner.history),
            "minimum_rate": inner.min_rate_seen,
            "last_iteration_ms": inner.last_iteration_ms,
            "last_update_ms": inner.last_update_ms,
            "last_render_ms": inner.last_render_ms,
        })
    }
}

fn rate_of(history: &VecDeque<f64>) -> Option<f64> {
    if history.is_empty() {
        return None;
    }
    let avg = history.iter().sum::<f64>() / history.len() as f64;
    if avg <= 0.0 {
        return None;
    }
    Some(1000.0 / avg)
}
