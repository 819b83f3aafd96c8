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

//! Process memory monitor.
//!
//! Samples the process resident set through `sysinfo` on each `update`,
//! keeps a bounded rolling history, and derives a three-way trend. When
//! the runtime exposes no usable process metric, sampling is a no-op
//! returning nothing.

use crate::monitoring::{LeakTracker, MonitoredResourceType, ResourceMonitor};
use serde_json::json;
use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Maximum number of retained memory samples.
const HISTORY_CAPACITY: usize = 60;
/// Number of recent samples the trend is computed over.
const TREND_WINDOW: usize = 5;
/// Differences below this magnitude (bytes) count as stable.
const TREND_STABILITY_BYTES: u64 = 512 * 1024;

/// Direction of recent memory usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryTrend {
    /// Usage movement is within the stability threshold.
    Stable,
    /// Usage is increasing.
    Growing,
    /// Usage is decreasing.
    Shrinking,
}

impl fmt::Display for MemoryTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryTrend::Stable => write!(f, "stable"),
            MemoryTrend::Growing => write!(f, "growing"),
            MemoryTrend::Shrinking => write!(f, "shrinking"),
        }
    }
}

#[derive(Debug, Default)]
struct MemInner {
    history: VecDeque<u64>,
    peak_bytes: u64,
    sample_count: u64,
}

/// Process memory monitor with trend derivation and leak tracking.
#[derive(Debug)]
pub struct MemoryMonitor {
    id: String,
    system: Mutex<System>,
    pid: Option<Pid>,
    inner: Mutex<MemInner>,
    leaks: LeakTracker,
}

impl MemoryMonitor {
    /// Creates a monitor for the current process. If the runtime cannot
    /// identify the process, sampling becomes a no-op.
    pub fn new(id: impl Into<String>) -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                log::warn!("Memory metric unavailable: {e}");
                None
            }
        };
        Self {
            id: id.into(),
            system: Mutex::new(System::new()),
            pid,
            inner: Mutex::new(MemInner::default()),
            leaks: LeakTracker::new(),
        }
    }

    /// Takes one sample of the process resident set. Returns the sampled
    /// byte count, or `None` when no metric is available.
    pub fn sample(&self) -> Option<u64> {
        let pid = self.pid?;
        let bytes = {
            let mut system = self.system.lock().unwrap();
            system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
            system.process(pid)?.memory()
        };
        self.push_sample(bytes);
        Some(bytes)
    }

    /// Records an externally measured sample. Used by tests and by hosts
    /// that already track memory themselves.
    pub fn push_sample(&self, bytes: u64) {
        let mut inner = self.inner.lock().unwrap();
        if inner.history.len() == HISTORY_CAPACITY {
            inner.history.pop_front();
        }
        inner.history.push_back(bytes);
        inner.sample_count += 1;
        if bytes > inner.peak_bytes {
            inner.peak_bytes = bytes;
        }
    }

    /// Latest sampled usage in bytes, if any.
    pub fn current_bytes(&self) -> Option<u64> {
        self.inner.lock().unwrap().history.back().copied()
    }

    /// Latest sampled usage in megabytes, if any.
    pub fn current_mb(&self) -> Option<f64> {
        self.current_bytes()
            .map(|b| b as f64 / (1024.0 * 1024.0))
    }

    /// Peak sampled usage in bytes.
    pub fn peak_bytes(&self) -> u64 {
        self.inner.lock().unwrap().peak_bytes
    }

    /// Three-way trend from the first vs last of the most recent
    /// [`TREND_WINDOW`] samples. Stable until enough samples exist.
    pub fn trend(&self) -> MemoryTrend {
        trend_of(&self.inner.lock().unwrap().history)
    }

    /// The monitor's leak tracker, for owners registering long-lived
    /// objects and for housekeeping's sweep.
    pub fn leak_tracker(&self) -> &LeakTracker {
        &self.leaks
    }
}

impl ResourceMonitor for MemoryMonitor {
    fn monitor_id(&self) -> Cow<'static, str> {
        Cow::Owned(self.id.clone())
    }

    fn resource_type(&self) -> MonitoredResourceType {
        MonitoredResourceType::SystemRam
    }

    fn update(&self) {
        if self.sample().is_none() {
            log::trace!("Memory sample skipped: no metric available");
        }
    }

    fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MemInner::default();
    }

    fn report(&self) -> String {
        let inner = self.inner.lock().unwrap();
        let mut out = String::from("=== Memory Monitor ===\n");
        out.push_str(&format!("Samples:     {}\n", inner.sample_count));
        match inner.history.back() {
            Some(bytes) => out.push_str(&format!(
                "Current:     {:.1} MB\n",
                *bytes as f64 / (1024.0 * 1024.0)
            )),
            None => out.push_str("Current:     n/a\n"),
        }
        out.push_str(&format!(
            "Peak:        {:.1} MB\n",
            inner.peak_bytes as f64 / (1024.0 * 1024.0)
        ));
        drop(inner);
        out.push_str(&format!("Trend:       {}\n", self.trend()));
        out.push_str(&format!(
            "Leak track:  {} live / {} tracked\n",
            self.leaks.live_count(),
            self.leaks.tracked_count()
        ));
        out
    }

    fn stats(&self) -> serde_json::Value {
        let inner = self.inner.lock().unwrap();
        let current = inner.history.back().copied();
        json!({
            "sample_count": inner.sample_count,
            "current_bytes": current,
            "peak_bytes": inner.peak_bytes,
            "trend": trend_of(&inner.history).to_string(),
            "leaks_live": self.leaks.live_count(),
        })
    }
}

/// Single source of truth for the trend rule: first vs last of the most
/// recent [`TREND_WINDOW`] samples, stable under
/// [`TREND_STABILITY_BYTES`].
fn trend_of(history: &VecDeque<u64>) -> MemoryTrend {
    if history.len() < TREND_WINDOW {
        return MemoryTrend::Stable;
    }
    let first = history[history.len() - TREND_WINDOW];
    let last = history[history.len() - 1];
    if last.abs_diff(first) < TREND_STABILITY_BYTES {
        MemoryTrend::Stable
    } else if last > first {
        MemoryTrend::Growing
    } else {
        MemoryTrend::Shrinking
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn trend_is_stable_until_enough_samples() {
        let monitor = MemoryMonitor::new("test-memory");
        monitor.push_sample(10 * MB);
        monitor.push_sample(20 * MB);
        assert_eq!(monitor.trend(), MemoryTrend::Stable);
    }

    #[test]
    fn growing_trend_from_recent_window() {
        let monitor = MemoryMonitor::new("test-memory");
        for i in 0..TREND_WINDOW as u64 {
            monitor.push_sample(10 * MB + i * 2 * MB);
        }
        assert_eq!(monitor.trend(), MemoryTrend::Growing);
    }

    #[test]
    fn shrinking_trend_from_recent_window() {
        let monitor = MemoryMonitor::new("test-memory");
        for i in (0..TREND_WINDOW as u64).rev() {
            monitor.push_sample(10 * MB + i * 2 * MB);
        }
        assert_eq!(monitor.trend(), MemoryTrend::Shrinking);
    }

    #[test]
    fn small_movement_counts_as_stable() {
        let monitor = MemoryMonitor::new("test-memory");
        for i in 0..TREND_WINDOW as u64 {
            monitor.push_sample(10 * MB + i * 1024); // 1 KiB steps
        }
        assert_eq!(monitor.trend(), MemoryTrend::Stable);
    }

    #[test]
    fn stats_trend_matches_trend() {
        let monitor = MemoryMonitor::new("test-memory");
        for i in 0..TREND_WINDOW as u64 {
            monitor.push_sample(10 * MB + i * 2 * MB);
        }
        assert_eq!(monitor.trend(), MemoryTrend::Growing);
        assert_eq!(monitor.stats()["trend"], monitor.trend().to_string());
    }

    #[test]
    fn peak_is_monotonic_until_reset() {
        let monitor = MemoryMonitor::new("test-memory");
        monitor.push_sample(50 * MB);
        monitor.push_sample(10 * MB);
        assert_eq!(monitor.peak_bytes(), 50 * MB);

        monitor.reset();
        assert_eq!(monitor.peak_bytes(), 0);
        assert!(monitor.current_bytes().is_none());
    }

    #[test]
    fn history_is_bounded() {
        let monitor = MemoryMonitor::new("test-memory");
        for i in 0..(HISTORY_CAPACITY as u64 + 10) {
            monitor.push_sample(i);
        }
        let inner = monitor.inner.lock().unwrap();
        assert_eq!(inner.history.len(), HISTORY_CAPACITY);
        assert_eq!(*inner.history.front().unwrap(), 10);
    }

    #[test]
    fn live_sampling_reports_something_or_nothing_gracefully() {
        let monitor = MemoryMonitor::new("test-memory");
        // On supported platforms this returns the RSS; on unsupported
        // ones it must return None without panicking.
        if let Some(bytes) = monitor.sample() {
            assert!(bytes > 0);
            assert_eq!(monitor.current_bytes(), Some(bytes));
        }
    }

    #[test]
    fn report_mentions_trend_and_leaks() {
        let monitor = MemoryMonitor::new("test-memory");
        monitor.push_sample(MB);
        let report = monitor.report();
        assert!(report.contains("Trend:"));
        assert!(report.contains("Leak track:"));
        let stats = monitor.stats();
        assert_eq!(stats["sample_count"], 1);
    }
}
