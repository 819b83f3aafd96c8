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

use std::any::Any;
use std::sync::{Arc, Mutex, Weak};

/// Default number of still-live tracked objects considered a leak.
const DEFAULT_LEAK_THRESHOLD: usize = 256;

#[derive(Debug)]
struct TrackedObject {
    label: String,
    weak: Weak<dyn Any + Send + Sync>,
}

/// Weak-reference-based object leak detector.
///
/// Owners register long-lived shared objects here; the tracker holds only
/// weak references, so it never extends a lifetime. Housekeeping sweeps
/// dead entries and raises an issue when an excessive number of tracked
/// objects remain reachable.
#[derive(Debug)]
pub struct LeakTracker {
    tracked: Mutex<Vec<TrackedObject>>,
    threshold: usize,
}

impl LeakTracker {
    /// Creates a tracker with the default leak threshold.
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_LEAK_THRESHOLD)
    }

    /// Creates a tracker that raises a leak once more than `threshold`
    /// tracked objects are simultaneously live.
    pub fn with_threshold(threshold: usize) -> Self {
        Self {
            tracked: Mutex::new(Vec::new()),
            threshold,
        }
    }

    /// Starts tracking a shared object under a diagnostic label.
    pub fn track<T: Any + Send + Sync>(&self, label: impl Into<String>, object: &Arc<T>) {
        let object: Arc<dyn Any + Send + Sync> = object.clone();
        let weak: Weak<dyn Any + Send + Sync> = Arc::downgrade(&object);
        self.tracked.lock().unwrap().push(TrackedObject {
            label: label.into(),
            weak,
        });
    }

    /// Number of tracked objects that are still reachable.
    pub fn live_count(&self) -> usize {
        self.tracked
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.weak.strong_count() > 0)
            .count()
    }

    /// Total number of registrations, live or dead.
    pub fn tracked_count(&self) -> usize {
        self.tracked.lock().unwrap().len()
    }

    /// Removes entries whose object has been dropped. Returns how many
    /// were removed.
    pub fn sweep(&self) -> usize {
        let mut tracked = self.tracked.lock().unwrap();
        let before = tracked.len();
        tracked.retain(|t| t.weak.strong_count() > 0);
        before - tracked.len()
    }

    /// Raises an object-leak description when the live count exceeds the
    /// threshold.
    pub fn check_leak(&self) -> Option<String> {
        let live = self.live_count();
        if live > self.threshold {
            Some(format!(
                "Object leak suspected: {live} tracked objects still reachable (threshold {})",
                self.threshold
            ))
        } else {
            None
        }
    }

    /// Labels of all still-live tracked objects, for reports.
    pub fn live_labels(&self) -> Vec<String> {
        self.tracked
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.weak.strong_count() > 0)
            .map(|t| t.label.clone())
            .collect()
    }

    /// Forgets every registration.
    pub fn clear(&self) {
        self.tracked.lock().unwrap().clear();
    }
}

impl Default for LeakTracker {
    fn default() -> Self {
        Self::new()
    }
}
