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

//! The mutation batcher.
//!
//! Mutation requests are keyed by (target, category); within one flush
//! cycle only the most recent request per key survives. Flushing applies
//! categories in the fixed order visibility → styles → classes → text:
//! the changes most likely to alter layout settle first, so anything
//! measured afterwards reflects the final layout exactly once.

use crate::cache::{CacheStats, TargetCache};
use crate::surface::{ClassChange, StyleMap, Surface, SurfaceError, TargetHandle};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Properties whose read forces pending writes to flush first, because
/// they reflect layout.
const LAYOUT_PROPERTIES: &[&str] = &[
    "offsetWidth",
    "offsetHeight",
    "offsetTop",
    "offsetLeft",
    "clientWidth",
    "clientHeight",
    "scrollTop",
    "scrollLeft",
    "scrollWidth",
    "scrollHeight",
    "boundingRect",
];

#[derive(Debug, Default)]
struct Pending {
    visibility: HashMap<String, bool>,
    styles: HashMap<String, StyleMap>,
    classes: HashMap<String, ClassChange>,
    text: HashMap<String, String>,
}

impl Pending {
    fn is_empty(&self) -> bool {
        self.visibility.is_empty()
            && self.styles.is_empty()
            && self.classes.is_empty()
            && self.text.is_empty()
    }
}

/// Collects visual mutation requests and flushes them coalesced, once
/// per display frame.
#[derive(Debug)]
pub struct MutationBatcher {
    surface: Arc<dyn Surface>,
    cache: TargetCache,
    pending: Mutex<Pending>,
    batching: AtomicBool,
    flush_scheduled: AtomicBool,
}

impl MutationBatcher {
    /// Creates a batcher over the given surface, with batching enabled.
    pub fn new(surface: Arc<dyn Surface>) -> Self {
        Self {
            surface,
            cache: TargetCache::new(),
            pending: Mutex::new(Pending::default()),
            batching: AtomicBool::new(true),
            flush_scheduled: AtomicBool::new(false),
        }
    }

    /// Turns batching on or off. With batching off, every request is
    /// applied immediately.
    pub fn set_batching(&self, enabled: bool) {
        self.batching.store(enabled, Ordering::SeqCst);
    }

    /// Whether a flush is currently scheduled.
    pub fn is_flush_scheduled(&self) -> bool {
        self.flush_scheduled.load(Ordering::SeqCst)
    }

    /// Queues (or immediately applies) a text mutation.
    pub fn update_text(&self, target: &str, text: impl Into<String>) {
        let text = text.into();
        if self.batching.load(Ordering::SeqCst) {
            self.pending.lock().unwrap().text.insert(target.to_string(), text);
            self.schedule_flush();
        } else if let Err(e) = self.apply_text(target, &text) {
            log::warn!("Immediate text update for '{target}' failed: {e}");
        }
    }

    /// Queues (or immediately applies) a style mutation.
    pub fn update_styles(&self, target: &str, styles: StyleMap) {
        if self.batching.load(Ordering::SeqCst) {
            self.pending
                .lock()
                .unwrap()
                .styles
                .insert(target.to_string(), styles);
            self.schedule_flush();
        } else if let Err(e) = self.apply_styles(target, &styles) {
            log::warn!("Immediate style update for '{target}' failed: {e}");
        }
    }

    /// Queues (or immediately applies) a class-list mutation.
    pub fn update_classes(&self, target: &str, change: ClassChange) {
        if self.batching.load(Ordering::SeqCst) {
            self.pending
                .lock()
                .unwrap()
                .classes
                .insert(target.to_string(), change);
            self.schedule_flush();
        } else if let Err(e) = self.apply_classes(target, &change) {
            log::warn!("Immediate class update for '{target}' failed: {e}");
        }
    }

    /// Queues (or immediately applies) a visibility mutation.
    pub fn update_visibility(&self, target: &str, visible: bool) {
        if self.batching.load(Ordering::SeqCst) {
            self.pending
                .lock()
                .unwrap()
                .visibility
                .insert(target.to_string(), visible);
            self.schedule_flush();
        } else if let Err(e) = self.apply_visibility(target, visible) {
            log::warn!("Immediate visibility update for '{target}' failed: {e}");
        }
    }

    /// Applies all pending mutations in the fixed category order and
    /// clears the pending collections. A failure in one category is
    /// logged and does not prevent the remaining categories from
    /// flushing.
    pub fn flush(&self) {
        let pending = {
            let mut guard = self.pending.lock().unwrap();
            std::mem::take(&mut *guard)
        };
        self.flush_scheduled.store(false, Ordering::SeqCst);
        if pending.is_empty() {
            return;
        }

        let mut failures = 0usize;
        for (target, visible) in &pending.visibility {
            if let Err(e) = self.apply_visibility(target, *visible) {
                log::warn!("Flush (visibility) failed for '{target}': {e}");
                failures += 1;
            }
        }
        for (target, styles) in &pending.styles {
            if let Err(e) = self.apply_styles(target, styles) {
                log::warn!("Flush (styles) failed for '{target}': {e}");
                failures += 1;
            }
        }
        for (target, change) in &pending.classes {
            if let Err(e) = self.apply_classes(target, change) {
                log::warn!("Flush (classes) failed for '{target}': {e}");
                failures += 1;
            }
        }
        for (target, text) in &pending.text {
            if let Err(e) = self.apply_text(target, text) {
                log::warn!("Flush (text) failed for '{target}': {e}");
                failures += 1;
            }
        }
        if failures > 0 {
            log::debug!("Flush completed with {failures} failed mutation(s)");
        }
    }

    /// Flushes only if a flush is scheduled. The game loop's render
    /// activity calls this once per display frame.
    pub fn flush_if_scheduled(&self) {
        if self.flush_scheduled.load(Ordering::SeqCst) {
            self.flush();
        }
    }

    /// Reads a target property. Layout-reflecting properties force an
    /// immediate flush of all pending writes first, so the caller
    /// observes post-write layout rather than stale geometry.
    pub fn read(&self, target: &str, property: &str) -> Option<Value> {
        if LAYOUT_PROPERTIES.contains(&property) {
            self.flush();
        }
        let handle = self.resolve(target)?;
        self.surface.read_property(handle, property)
    }

    /// Runs `f` with batching forced on; if batching was previously off,
    /// flushes immediately afterwards so the group lands together.
    pub fn batch(&self, f: impl FnOnce(&Self)) {
        let was_batching = self.batching.swap(true, Ordering::SeqCst);
        f(self);
        if !was_batching {
            self.batching.store(false, Ordering::SeqCst);
            self.flush();
        }
    }

    /// Handle-cache counters for diagnostics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Drops cached handles whose target is detached; called by
    /// housekeeping. Returns how many entries were removed.
    pub fn trim_cache(&self) -> usize {
        self.cache.trim(self.surface.as_ref())
    }

    fn schedule_flush(&self) {
        // Idempotent while a flush is pending.
        self.flush_scheduled.store(true, Ordering::SeqCst);
    }

    fn resolve(&self, target: &str) -> Option<TargetHandle> {
        self.cache.resolve(self.surface.as_ref(), target)
    }

    fn resolve_or_err(&self, target: &str) -> Result<TargetHandle, SurfaceError> {
        self.resolve(target).ok_or_else(|| SurfaceError::UnknownTarget {
            id: target.to_string(),
        })
    }

    fn apply_visibility(&self, target: &str, visible: bool) -> Result<(), SurfaceError> {
        let handle = self.resolve_or_err(target)?;
        self.surface.apply_visibility(handle, visible)
    }

    fn apply_styles(&self, target: &str, styles: &StyleMap) -> Result<(), SurfaceError> {
        let handle = self.resolve_or_err(target)?;
        self.surface.apply_styles(handle, styles)
    }

    fn apply_classes(&self, target: &str, change: &ClassChange) -> Result<(), SurfaceError> {
        let handle = self.resolve_or_err(target)?;
        self.surface.apply_classes(handle, change)
    }

    fn apply_text(&self, target: &str, text: &str) -> Result<(), SurfaceError> {
        let handle = self.resolve_or_err(target)?;
        self.surface.apply_text(handle, text)
    }
}
