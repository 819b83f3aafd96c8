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

//! Registry for resource monitors.

use crate::monitoring::ResourceMonitor;
use std::sync::{Arc, Mutex};

/// A thread-safe registry of resource monitors, driven by the game
/// loop's housekeeping activity.
#[derive(Debug, Clone, Default)]
pub struct MonitorRegistry {
    monitors: Arc<Mutex<Vec<Arc<dyn ResourceMonitor>>>>,
}

impl MonitorRegistry {
    /// Creates a new, empty monitor registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new resource monitor.
    pub fn register(&self, monitor: Arc<dyn ResourceMonitor>) {
        let mut monitors = self.monitors.lock().unwrap();
        log::info!("Registered resource monitor: {}", monitor.monitor_id());
        monitors.push(monitor);
    }

    /// Calls `update` on every registered monitor.
    pub fn update_all(&self) {
        let monitors = self.monitors.lock().unwrap();
        for monitor in monitors.iter() {
            monitor.update();
        }
    }

    /// Returns clones of all registered monitors.
    pub fn all(&self) -> Vec<Arc<dyn ResourceMonitor>> {
        self.monitors.lock().unwrap().clone()
    }

    /// Concatenates every monitor's human-readable report.
    pub fn combined_report(&self) -> String {
        self.all()
            .iter()
            .map(|m| m.report())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::{MonitoredResourceType, PerformanceMonitor};
    use std::borrow::Cow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingMonitor {
        updates: AtomicUsize,
    }

    impl ResourceMonitor for CountingMonitor {
        fn monitor_id(&self) -> Cow<'static, str> {
            Cow::Borrowed("counting")
        }
        fn resource_type(&self) -> MonitoredResourceType {
            MonitoredResourceType::FrameTiming
        }
        fn update(&self) {
            self.updates.fetch_add(1, Ordering::SeqCst);
        }
        fn reset(&self) {
            self.updates.store(0, Ordering::SeqCst);
        }
        fn report(&self) -> String {
            format!("updates: {}", self.updates.load(Ordering::SeqCst))
        }
        fn stats(&self) -> serde_json::Value {
            serde_json::json!({ "updates": self.updates.load(Ordering::SeqCst) })
        }
    }

    #[test]
    fn update_all_reaches_every_monitor() {
        let registry = MonitorRegistry::new();
        let monitor = Arc::new(CountingMonitor::default());
        registry.register(monitor.clone());
        registry.register(Arc::new(PerformanceMonitor::default()));

        registry.update_all();
        registry.update_all();
        assert_eq!(monitor.updates.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn combined_report_includes_each_monitor() {
        let registry = MonitorRegistry::new();
        registry.register(Arc::new(CountingMonitor::default()));
        registry.register(Arc::new(PerformanceMonitor::default()));
        let report = registry.combined_report();
        assert!(report.contains("updates:"));
        assert!(report.contains("Performance Monitor"));
    }
}
