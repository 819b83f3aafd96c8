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

use crate::surface::{Surface, TargetHandle};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Hit/miss counters for the target-handle cache, exposed for
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from a still-attached cached handle.
    pub hits: u64,
    /// Lookups that had to resolve through the surface (including
    /// invalidated entries).
    pub misses: u64,
    /// Current number of cached entries.
    pub entries: usize,
}

/// Cache of identity → handle resolutions.
///
/// A cached handle is revalidated on every lookup: if the target is no
/// longer attached, the entry is invalidated and re-resolved through the
/// surface.
#[derive(Debug, Default)]
pub struct TargetCache {
    entries: Mutex<HashMap<String, TargetHandle>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TargetCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves an identity, preferring the cached handle when it is
    /// still attached. Returns `None` when the surface has no such
    /// target.
    pub fn resolve(&self, surface: &dyn Surface, id: &str) -> Option<TargetHandle> {
        {
            let entries = self.entries.lock().unwrap();
            if let Some(handle) = entries.get(id) {
                if surface.is_attached(*handle) {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(*handle);
                }
            }
        }
        // Miss or stale entry: resolve through the surface.
        self.misses.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.lock().unwrap();
        match surface.resolve(id) {
            Some(handle) => {
                entries.insert(id.to_string(), handle);
                Some(handle)
            }
            None => {
                entries.remove(id);
                None
            }
        }
    }

    /// Current hit/miss counters and size.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.lock().unwrap().len(),
        }
    }

    /// Drops entries whose handle is no longer attached. Returns how
    /// many entries were removed.
    pub fn trim(&self, surface: &dyn Surface) -> usize {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, handle| surface.is_attached(*handle));
        before - entries.len()
    }

    /// Empties the cache without touching the counters.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::HeadlessSurface;

    #[test]
    fn second_lookup_is_a_hit() {
        let surface = HeadlessSurface::new();
        surface.add_target("clips");
        let cache = TargetCache::new();

        cache.resolve(&surface, "clips").unwrap();
        cache.resolve(&surface, "clips").unwrap();

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn detached_entry_is_invalidated_and_reresolved() {
        let surface = HeadlessSurface::new();
        surface.add_target("panel");
        let cache = TargetCache::new();

        let first = cache.resolve(&surface, "panel").unwrap();
        surface.detach("panel");
        let fresh = surface.reattach("panel");

        let second = cache.resolve(&surface, "panel").unwrap();
        assert_ne!(first, second);
        assert_eq!(second, fresh);
        assert_eq!(cache.stats().misses, 2, "Stale entry must count as a miss");
    }

    #[test]
    fn unknown_target_resolves_to_none() {
        let surface = HeadlessSurface::new();
        let cache = TargetCache::new();
        assert!(cache.resolve(&surface, "nope").is_none());
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn trim_drops_only_detached_entries() {
        let surface = HeadlessSurface::new();
        surface.add_target("alive");
        surface.add_target("dead");
        let cache = TargetCache::new();
        cache.resolve(&surface, "alive");
        cache.resolve(&surface, "dead");

        surface.detach("dead");
        assert_eq!(cache.trim(&surface), 1);
        assert_eq!(cache.stats().entries, 1);
    }
}
