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

use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{CodecError, PersistError};
use crate::event::{Notification, NotificationLevel};
use crate::persist::codec;
use crate::persist::envelope::Envelope;
use crate::persist::StorageBackend;
use crate::state::defaults::default_tree;
use crate::state::observer::{ObserverEntry, ObserverFn, ObserverHandle, ObserverPattern};
use crate::state::path::parent_and_leaf;

/// Version string written into every persisted envelope.
pub const SAVE_FORMAT_VERSION: &str = "1";

/// The single shared mutable resource of the simulation: a hierarchical
/// tree of JSON values addressed by dotted paths, with synchronous change
/// notification and a persistence envelope.
///
/// Locking discipline: the tree lock and the observer-list lock are never
/// held while user callbacks run, so an observer may freely call back
/// into the store (including `set`). Unbounded recursion from an observer
/// writing the path it observes is the caller's responsibility.
pub struct StateStore {
    tree: Mutex<Value>,
    observers: Mutex<Vec<ObserverEntry>>,
    next_observer_id: AtomicU64,
    backend: Arc<dyn StorageBackend>,
    notifier: Mutex<Option<flume::Sender<Notification>>>,
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("backend", &self.backend)
            .field(
                "observers",
                &self.observers.lock().map(|o| o.len()).unwrap_or(0),
            )
            .finish_non_exhaustive()
    }
}

impl StateStore {
    /// Creates a store with the fixed default tree shape, persisting
    /// through the given backend.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            tree: Mutex::new(default_tree()),
            observers: Mutex::new(Vec::new()),
            next_observer_id: AtomicU64::new(1),
            backend,
            notifier: Mutex::new(None),
        }
    }

    /// Attaches a sender on which user-visible save/load failures are
    /// published. Without one, failures are only logged.
    pub fn attach_notifier(&self, sender: flume::Sender<Notification>) {
        *self.notifier.lock().unwrap() = Some(sender);
    }

    // ------------------------------------------------------------------
    // Reads and writes
    // ------------------------------------------------------------------

    /// Resolves a dotted path to a clone of the value stored there.
    /// Returns `None` if any segment is missing; this is never an error.
    pub fn get(&self, path: &str) -> Option<Value> {
        let tree = self.tree.lock().unwrap();
        let mut current = &*tree;
        for segment in crate::state::path::split_path(path) {
            current = current.as_object()?.get(segment)?;
        }
        Some(current.clone())
    }

    /// Reads a numeric leaf, defaulting to `0.0` when the path is absent
    /// or not a number.
    pub fn get_number(&self, path: &str) -> f64 {
        self.get(path).and_then(|v| v.as_f64()).unwrap_or(0.0)
    }

    /// Reads a boolean leaf, defaulting to `false`.
    pub fn get_bool(&self, path: &str) -> bool {
        self.get(path).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// Writes a value to a dotted path, auto-creating intermediate
    /// objects. If the new value differs structurally from the old one,
    /// every matching observer fires synchronously before `set` returns.
    /// Writes that do not change the value are silent.
    ///
    /// Returns whether the value actually changed.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let Some((parents, leaf)) = parent_and_leaf(path) else {
            log::warn!("Ignoring write to empty path");
            return false;
        };

        let changed = {
            let mut tree = self.tree.lock().unwrap();
            let mut current = &mut *tree;
            for segment in parents {
                let map = current
                    .as_object_mut()
                    .expect("State tree root and intermediates are objects by construction");
                // A scalar in an intermediate position is overwritten by
                // an object, preserving the original's permissiveness.
                let entry = map
                    .entry(segment.to_string())
                    .or_insert_with(|| Value::Object(Default::default()));
                if !entry.is_object() {
                    *entry = Value::Object(Default::default());
                }
                current = entry;
            }
            let map = current.as_object_mut().expect("Intermediate is an object");
            match map.get(leaf) {
                Some(old) if *old == value => false,
                _ => {
                    map.insert(leaf.to_string(), value.clone());
                    true
                }
            }
            // Tree lock is dropped here, before any observer runs.
        };

        if changed {
            self.notify(path, &value);
        }
        changed
    }

    /// Adds `amount` to a numeric leaf (missing reads as zero).
    /// Returns the new value.
    pub fn increment(&self, path: &str, amount: f64) -> f64 {
        let next = self.get_number(path) + amount;
        self.set(path, next);
        next
    }

    /// Subtracts `amount` from a numeric leaf, clamped at a floor of
    /// zero. Returns the new value; never negative.
    pub fn decrement(&self, path: &str, amount: f64) -> f64 {
        let next = (self.get_number(path) - amount).max(0.0);
        self.set(path, next);
        next
    }

    /// Returns a deep clone of the whole tree, for diagnostics and tests.
    pub fn snapshot(&self) -> Value {
        self.tree.lock().unwrap().clone()
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Registers an observer for an exact path (`"resources.wire"`) or a
    /// wildcard over direct children (`"flags.*"`). The returned handle
    /// deregisters exactly this registration via [`Self::remove_observer`].
    pub fn add_observer(
        &self,
        pattern: &str,
        callback: impl Fn(&str, &Value) + Send + Sync + 'static,
    ) -> ObserverHandle {
        let id = self.next_observer_id.fetch_add(1, Ordering::Relaxed);
        let entry = ObserverEntry {
            id,
            pattern: ObserverPattern::parse(pattern),
            callback: Arc::new(callback),
        };
        self.observers.lock().unwrap().push(entry);
        log::trace!("Registered observer #{id} on '{pattern}'");
        ObserverHandle(id)
    }

    /// Deregisters an observer. Idempotent: removing a handle twice is a
    /// no-op.
    pub fn remove_observer(&self, handle: ObserverHandle) {
        let mut observers = self.observers.lock().unwrap();
        observers.retain(|entry| entry.id != handle.0);
    }

    fn notify(&self, path: &str, value: &Value) {
        // Snapshot matching callbacks in registration order, then drop
        // the lock so callbacks may re-enter the store.
        let matching: Vec<ObserverFn> = {
            let observers = self.observers.lock().unwrap();
            observers
                .iter()
                .filter(|entry| entry.pattern.matches(path))
                .map(|entry| Arc::clone(&entry.callback))
                .collect()
        };
        for callback in matching {
            callback(path, value);
        }
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Serializes the full tree into a versioned envelope and writes it
    /// through the storage backend. I/O failures are logged, surfaced as
    /// a user notification, and collapsed into `false`; never propagated.
    pub fn save(&self) -> bool {
        let envelope = Envelope {
            version: SAVE_FORMAT_VERSION.to_string(),
            timestamp: epoch_millis(),
            state: self.snapshot(),
        };
        let payload = match serde_json::to_string(&envelope) {
            Ok(payload) => payload,
            Err(e) => {
                log::error!("{}", PersistError::Serialize {
                    details: e.to_string()
                });
                return false;
            }
        };
        match self.backend.write(&payload) {
            Ok(()) => {
                log::debug!("State saved ({} bytes)", payload.len());
                true
            }
            Err(e) => {
                log::error!("Save failed: {e}");
                self.notify_user(NotificationLevel::Error, "Failed to save the game");
                false
            }
        }
    }

    /// Reads the persisted envelope and shallow-merges each saved
    /// category into the live tree. Returns `false`, leaving the live
    /// state untouched, if the payload is absent, unparsable, or missing
    /// a required envelope field. Merging does not fire observers.
    pub fn load(&self) -> bool {
        let payload = match self.backend.read() {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                log::debug!("No persisted state to load");
                return false;
            }
            Err(e) => {
                log::error!("Load failed: {e}");
                self.notify_user(NotificationLevel::Error, "Failed to load the saved game");
                return false;
            }
        };
        let saved_state = match validate_envelope(&payload) {
            Ok(state) => state,
            Err(e) => {
                log::warn!("Rejecting saved payload: {e}");
                self.notify_user(NotificationLevel::Error, "Saved game is corrupted");
                return false;
            }
        };

        let mut tree = self.tree.lock().unwrap();
        let live = tree
            .as_object_mut()
            .expect("State tree root is an object by construction");
        for (category, saved) in &saved_state {
            let Some(saved_map) = saved.as_object() else {
                log::warn!("Skipping non-object category '{category}' in save");
                continue;
            };
            let target = live
                .entry(category.clone())
                .or_insert_with(|| Value::Object(Default::default()));
            if !target.is_object() {
                *target = Value::Object(Default::default());
            }
            let target_map = target.as_object_mut().expect("Just ensured object");
            // Category-level shallow merge: only keys present in the
            // save replace live values; unknown keys merge in as-is.
            for (key, value) in saved_map {
                target_map.insert(key.clone(), value.clone());
            }
        }
        log::info!("State loaded from persisted envelope");
        true
    }

    /// Reconstructs the default state in place, then persists it.
    /// Returns the `save()` result.
    pub fn reset(&self) -> bool {
        {
            let mut tree = self.tree.lock().unwrap();
            *tree = default_tree();
        }
        log::info!("State reset to defaults");
        self.save()
    }

    /// Produces a reversible text encoding of the raw persisted payload
    /// (the last save, not a fresh serialization). `None` when nothing
    /// has been persisted or the medium cannot be read.
    pub fn export_save(&self) -> Option<String> {
        match self.backend.read() {
            Ok(Some(payload)) => Some(codec::encode_save(&payload)),
            Ok(None) => {
                log::debug!("{}", CodecError::NothingToExport);
                None
            }
            Err(e) => {
                log::error!("Export failed: {e}");
                None
            }
        }
    }

    /// Decodes an exported text blob back to a raw payload, stores it,
    /// and performs an ordinary `load()`. A bad encoding returns `false`
    /// without mutating the stored payload.
    pub fn import_save(&self, text: &str) -> bool {
        let payload = match codec::decode_save(text) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("Import rejected: {e}");
                self.notify_user(NotificationLevel::Error, "Import text is not a valid save");
                return false;
            }
        };
        if let Err(e) = self.backend.write(&payload) {
            log::error!("Import failed to store payload: {e}");
            self.notify_user(NotificationLevel::Error, "Failed to store the imported save");
            return false;
        }
        self.load()
    }

    fn notify_user(&self, level: NotificationLevel, message: &str) {
        if let Some(sender) = &*self.notifier.lock().unwrap() {
            if sender.send(Notification::new(level, message)).is_err() {
                log::trace!("Notification receiver disconnected");
            }
        }
    }
}

/// Parses a raw payload and checks the envelope contract: `version` must
/// be present and `state` must be an object. Returns the saved state map.
fn validate_envelope(
    payload: &str,
) -> Result<serde_json::Map<String, Value>, PersistError> {
    let parsed: Value = serde_json::from_str(payload).map_err(|e| PersistError::Malformed {
        details: e.to_string(),
    })?;
    if parsed.get("version").is_none() {
        return Err(PersistError::MissingField { field: "version" });
    }
    match parsed.get("state").and_then(|s| s.as_object()) {
        Some(state) => Ok(state.clone()),
        None => Err(PersistError::MissingField { field: "state" }),
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryStorageBackend;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn test_store() -> StateStore {
        StateStore::new(Arc::new(MemoryStorageBackend::new()))
    }

    #[test]
    fn path_round_trip() {
        let store = test_store();
        store.set("resources.clips", 42.0);
        assert_eq!(store.get("resources.clips"), Some(json!(42.0)));
    }

    #[test]
    fn absent_path_returns_none() {
        let store = test_store();
        assert_eq!(store.get("never.written.path"), None);
        assert_eq!(store.get(""), None);
    }

    #[test]
    fn write_autocreates_intermediate_levels() {
        let store = test_store();
        store.set("exploration.sector.alpha", true);
        assert_eq!(store.get("exploration.sector.alpha"), Some(json!(true)));
        assert!(store.get("exploration.sector").unwrap().is_object());
    }

    #[test]
    fn decrement_floors_at_zero() {
        let store = test_store();
        // Fresh store seeds resources.wire = 1000.
        let result = store.decrement("resources.wire", 1500.0);
        assert_eq!(result, 0.0, "1000 - 1500 must clamp to 0, not go to -500");
        assert_eq!(store.get("resources.wire"), Some(json!(0.0)));
    }

    #[test]
    fn decrement_on_absent_path_stays_at_zero() {
        let store = test_store();
        assert_eq!(store.decrement("resources.unobtainium", 5.0), 0.0);
    }

    #[test]
    fn increment_defaults_missing_leaf_to_zero() {
        let store = test_store();
        assert_eq!(store.increment("meta.sessions", 1.0), 1.0);
        assert_eq!(store.increment("meta.sessions", 1.0), 2.0);
    }

    #[test]
    fn observers_fire_once_each_in_registration_order() {
        let store = test_store();
        let order = Arc::new(Mutex::new(Vec::new()));

        let order_a = Arc::clone(&order);
        store.add_observer("flags.space", move |_, _| {
            order_a.lock().unwrap().push("exact");
        });
        let order_b = Arc::clone(&order);
        store.add_observer("flags.*", move |_, _| {
            order_b.lock().unwrap().push("wildcard");
        });

        store.set("flags.space", true);
        assert_eq!(*order.lock().unwrap(), vec!["exact", "wildcard"]);
    }

    #[test]
    fn same_value_write_is_silent() {
        let store = test_store();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        store.add_observer("market.demand", move |_, _| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        store.set("market.demand", 2.0);
        store.set("market.demand", 2.0);
        assert_eq!(
            fired.load(Ordering::SeqCst),
            1,
            "Second identical write must not notify"
        );
    }

    #[test]
    fn wildcard_observer_sees_full_path_and_new_value() {
        let store = test_store();
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        store.add_observer("flags.*", move |path, value| {
            *seen_clone.lock().unwrap() = Some((path.to_string(), value.clone()));
        });

        store.set("flags.space", true);
        let (path, value) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(path, "flags.space");
        assert_eq!(value, json!(true));
    }

    #[test]
    fn remove_observer_is_idempotent() {
        let store = test_store();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        let handle = store.add_observer("resources.clips", move |_, _| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        store.remove_observer(handle);
        store.remove_observer(handle); // double-dispose is a no-op
        store.set("resources.clips", 1.0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn observer_may_write_back_into_the_store() {
        let store = Arc::new(test_store());
        let store_clone = Arc::clone(&store);
        store.add_observer("resources.clips", move |_, value| {
            // Re-entrant set on a different path must not deadlock.
            store_clone.set("meta.last_clip_batch", value.clone());
        });

        store.set("resources.clips", 7.0);
        assert_eq!(store.get("meta.last_clip_batch"), Some(json!(7.0)));
    }

    #[test]
    fn replacing_container_with_equal_contents_is_silent() {
        let store = test_store();
        store.set("projects.unlocked", json!(["p1"]));

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        store.add_observer("projects.unlocked", move |_, _| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        // Structural equality rule: equal-content container, no event.
        store.set("projects.unlocked", json!(["p1"]));
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        store.set("projects.unlocked", json!(["p1", "p2"]));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn save_then_load_round_trips_state() {
        let store = test_store();
        store.set("resources.clips", 123.0);
        assert!(store.save());

        let before = store.snapshot();
        assert!(store.load());
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn load_without_save_returns_false_and_keeps_state() {
        let store = test_store();
        let before = store.snapshot();
        assert!(!store.load());
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn load_merges_only_saved_keys() {
        let backend = Arc::new(MemoryStorageBackend::new());
        let store = StateStore::new(backend.clone());

        // A hand-written envelope with a partial resources category.
        let envelope = json!({
            "version": "1",
            "timestamp": 0,
            "state": { "resources": { "clips": 55.0, "exotic_matter": 3.0 } }
        });
        backend.write(&envelope.to_string()).unwrap();

        assert!(store.load());
        assert_eq!(store.get("resources.clips"), Some(json!(55.0)));
        // Unknown leaf keys merge in as-is.
        assert_eq!(store.get("resources.exotic_matter"), Some(json!(3.0)));
        // Keys absent from the save keep their live value.
        assert_eq!(store.get("resources.wire"), Some(json!(1000.0)));
    }

    #[test]
    fn malformed_payload_is_rejected_without_touching_state() {
        let backend = Arc::new(MemoryStorageBackend::new());
        let store = StateStore::new(backend.clone());
        let before = store.snapshot();

        backend.write("this is not json").unwrap();
        assert!(!store.load());
        assert_eq!(store.snapshot(), before);

        backend
            .write(&json!({"timestamp": 0, "state": {}}).to_string())
            .unwrap();
        assert!(!store.load(), "Envelope without 'version' must be rejected");

        backend
            .write(&json!({"version": "1", "timestamp": 0}).to_string())
            .unwrap();
        assert!(!store.load(), "Envelope without 'state' must be rejected");
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn reset_restores_defaults_and_persists() {
        let backend = Arc::new(MemoryStorageBackend::new());
        let store = StateStore::new(backend.clone());
        store.set("resources.wire", 5.0);

        assert!(store.reset());
        assert_eq!(store.get("resources.wire"), Some(json!(1000.0)));
        // The reset state was persisted immediately.
        assert!(backend.read().unwrap().is_some());
    }

    #[test]
    fn save_failure_surfaces_as_notification() {
        let backend = Arc::new(MemoryStorageBackend::new());
        backend.fail_writes(true);
        let store = StateStore::new(backend);

        let bus = crate::event::EventBus::new();
        store.attach_notifier(bus.sender());

        assert!(!store.save());
        let notes = bus.drain();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Error);
    }

    #[test]
    fn export_reflects_last_save_not_live_state() {
        let store = test_store();
        store.set("resources.clips", 1.0);
        assert!(store.save());
        store.set("resources.clips", 999.0); // not saved

        let exported = store.export_save().expect("Export should exist after save");
        let decoded = codec::decode_save(&exported).unwrap();
        let parsed: Value = serde_json::from_str(&decoded).unwrap();
        assert_eq!(parsed["state"]["resources"]["clips"], json!(1.0));
    }

    #[test]
    fn import_round_trip_restores_state() {
        let store = test_store();
        store.set("combat.honor", 12.0);
        assert!(store.save());
        let exported = store.export_save().unwrap();

        let fresh = test_store();
        assert!(fresh.import_save(&exported));
        assert_eq!(fresh.get("combat.honor"), Some(json!(12.0)));
    }

    #[test]
    fn bad_import_encoding_leaves_stored_payload_alone() {
        let backend = Arc::new(MemoryStorageBackend::new());
        let store = StateStore::new(backend.clone());
        assert!(store.save());
        let stored_before = backend.read().unwrap();

        assert!(!store.import_save("!!! not base64 !!!"));
        assert_eq!(backend.read().unwrap(), stored_before);
    }

    #[test]
    fn export_without_prior_save_is_none() {
        let store = test_store();
        assert!(store.export_save().is_none());
    }
}
