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

//! Shared simulation context.
//!
//! Bundles the services every part of the runtime needs: the state
//! store, the mutation batcher, the diagnostics monitors and the
//! notification bus. Cloning the context is cheap; all services are
//! behind `Arc`.

use fabrica_core::persist::StorageBackend;
use fabrica_core::{EventBus, Notification, StateStore};
use fabrica_render::{MutationBatcher, Surface};
use fabrica_telemetry::monitoring::{
    MemoryMonitor, MonitorRegistry, PerfThresholds, PerformanceMonitor,
};
use std::sync::Arc;

/// Shared handles to the runtime's services.
#[derive(Clone)]
pub struct SimContext {
    pub store: Arc<StateStore>,
    pub batcher: Arc<MutationBatcher>,
    pub perf: Arc<PerformanceMonitor>,
    pub memory: Arc<MemoryMonitor>,
    pub monitors: MonitorRegistry,
    pub notifications: Arc<EventBus<Notification>>,
}

impl SimContext {
    /// Wires together a full context over the given storage backend and
    /// render surface. Monitors are registered and the store is hooked
    /// up to the notification bus.
    pub fn new(backend: Arc<dyn StorageBackend>, surface: Arc<dyn Surface>) -> Self {
        let store = Arc::new(StateStore::new(backend));
        let batcher = Arc::new(MutationBatcher::new(surface));
        let perf = Arc::new(PerformanceMonitor::new(PerfThresholds::default()));
        let memory = Arc::new(MemoryMonitor::new("sim_memory"));
        let notifications = Arc::new(EventBus::new());

        store.attach_notifier(notifications.sender());

        let monitors = MonitorRegistry::new();
        monitors.register(perf.clone());
        monitors.register(memory.clone());

        memory.leak_tracker().track("state_store", &store);

        Self {
            store,
            batcher,
            perf,
            memory,
            monitors,
            notifications,
        }
    }
}
