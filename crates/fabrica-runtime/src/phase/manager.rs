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

//! The phase manager: observes progression flags and activates modules.

use super::modules::{CapabilityModule, ModuleRegistry, NoOpModule};
use super::Phase;
use fabrica_core::state::ObserverHandle;
use fabrica_core::StateStore;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

/// Errors raised while activating modules.
#[derive(Debug)]
pub enum PhaseError {
    /// A module's one-time `init` hook failed.
    ModuleInit { name: String, details: String },
}

impl fmt::Display for PhaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseError::ModuleInit { name, details } => {
                write!(f, "Module '{name}' failed to initialize: {details}")
            }
        }
    }
}

impl std::error::Error for PhaseError {}

/// Watches the progression flags and keeps the active module set in
/// sync with the derived [`Phase`].
///
/// Modules are instantiated on first use and cached; a transition never
/// tears a module instance down, it only stops receiving `update` calls
/// once its phase is left.
pub struct PhaseManager {
    store: Arc<StateStore>,
    registry: ModuleRegistry,
    current: Mutex<Phase>,
    loaded: Mutex<HashMap<&'static str, Arc<dyn CapabilityModule>>>,
    lazy_loading: AtomicBool,
    observers: Mutex<Vec<ObserverHandle>>,
}

impl PhaseManager {
    /// Creates a manager with lazy module instantiation.
    pub fn new(store: Arc<StateStore>, registry: ModuleRegistry) -> Arc<Self> {
        Self::with_lazy_loading(store, registry, true)
    }

    /// Creates a manager; with `lazy_loading` disabled every assigned
    /// module is instantiated up front during [`init`](Self::init).
    pub fn with_lazy_loading(
        store: Arc<StateStore>,
        registry: ModuleRegistry,
        lazy_loading: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            registry,
            current: Mutex::new(Phase::Human),
            loaded: Mutex::new(HashMap::new()),
            lazy_loading: AtomicBool::new(lazy_loading),
            observers: Mutex::new(Vec::new()),
        })
    }

    /// Derives the starting phase, activates its modules and subscribes
    /// to the progression flags. Must be called once, on the `Arc`.
    pub fn init(self: &Arc<Self>) {
        if !self.lazy_loading.load(Ordering::SeqCst) {
            self.load_all_known();
        }

        let weak: Weak<PhaseManager> = Arc::downgrade(self);
        let handle = self.store.add_observer("flags.*", move |path, _value| {
            if let Some(manager) = weak.upgrade() {
                log::debug!("Progression flag '{path}' changed");
                manager.refresh();
            }
        });
        self.observers.lock().unwrap().push(handle);

        let initial = Phase::from_flags(&self.store);
        self.transition_to(initial);
    }

    /// Drops the flag subscriptions. The manager stops reacting to
    /// state changes afterwards.
    pub fn detach(&self) {
        let mut observers = self.observers.lock().unwrap();
        for handle in observers.drain(..) {
            self.store.remove_observer(handle);
        }
    }

    /// The phase the manager currently considers active.
    pub fn current_phase(&self) -> Phase {
        *self.current.lock().unwrap()
    }

    /// Re-derives the phase from the flags and transitions if it
    /// changed.
    pub fn refresh(&self) {
        let derived = Phase::from_flags(&self.store);
        if derived != self.current_phase() {
            self.transition_to(derived);
        }
    }

    /// Moves to `next`, firing `on_exit` on modules leaving the active
    /// set and `on_enter` on modules joining it. Hook failures are
    /// logged; the transition always completes.
    pub fn transition_to(&self, next: Phase) {
        let previous = {
            let mut current = self.current.lock().unwrap();
            let previous = *current;
            *current = next;
            previous
        };
        log::info!("Phase transition: {previous} -> {next}");

        let staying: Vec<&str> = self.registry.modules_for(next).to_vec();
        if previous != next {
            for &name in self.registry.modules_for(previous) {
                if staying.contains(&name) {
                    continue;
                }
                if let Some(module) = self.loaded_module(name) {
                    if let Err(e) = module.on_exit(&self.store) {
                        log::error!("Module '{name}' on_exit failed: {e:#}");
                    }
                }
            }
        }

        for &name in self.registry.modules_for(next) {
            match self.load_module(name) {
                Ok(module) => {
                    if let Err(e) = module.on_enter(&self.store) {
                        log::error!("Module '{name}' on_enter failed: {e:#}");
                    }
                }
                Err(e) => {
                    log::error!("{e}");
                    self.disable_lazy_loading();
                }
            }
        }
    }

    /// Degraded mode after a load failure: lazy activation is switched
    /// off and every known module is brought up eagerly, best-effort.
    fn disable_lazy_loading(&self) {
        if self.lazy_loading.swap(false, Ordering::SeqCst) {
            log::warn!("Lazy module loading disabled, loading all known modules eagerly");
            self.load_all_known();
        }
    }

    fn load_all_known(&self) {
        for name in self.registry.all_assigned() {
            if let Err(e) = self.load_module(name) {
                log::error!("{e}");
            }
        }
    }

    /// Runs the `update` hook of every module in the active phase.
    /// Intended as a loop update callback.
    pub fn update_active(&self, delta: Duration) {
        let phase = self.current_phase();
        for &name in self.registry.modules_for(phase) {
            if let Some(module) = self.loaded_module(name) {
                if let Err(e) = module.update(&self.store, delta) {
                    log::error!("Module '{name}' update failed: {e:#}");
                }
            }
        }
    }

    /// Names of the modules instantiated so far, in no particular
    /// order.
    pub fn loaded_modules(&self) -> Vec<&'static str> {
        self.loaded.lock().unwrap().keys().copied().collect()
    }

    fn loaded_module(&self, name: &str) -> Option<Arc<dyn CapabilityModule>> {
        self.loaded.lock().unwrap().get(name).cloned()
    }

    /// Returns the cached instance for `name`, instantiating and
    /// initializing it on first use. A name with no registered factory
    /// resolves to a [`NoOpModule`] so later lookups stay silent.
    fn load_module(&self, name: &'static str) -> Result<Arc<dyn CapabilityModule>, PhaseError> {
        if let Some(module) = self.loaded_module(name) {
            return Ok(module);
        }

        let module = match self.registry.instantiate(name) {
            Some(module) => module,
            None => {
                log::warn!("No factory for module '{name}', substituting a no-op");
                Arc::new(NoOpModule::new(name)) as Arc<dyn CapabilityModule>
            }
        };

        if let Err(e) = module.init(&self.store) {
            return Err(PhaseError::ModuleInit {
                name: name.to_string(),
                details: format!("{e:#}"),
            });
        }

        log::debug!("Module '{name}' loaded");
        self.loaded.lock().unwrap().insert(name, module.clone());
        Ok(module)
    }
}

impl fmt::Debug for PhaseManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseManager")
            .field("current", &self.current_phase())
            .field("lazy_loading", &self.lazy_loading.load(Ordering::SeqCst))
            .field("loaded", &self.loaded_modules())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabrica_core::persist::MemoryStorageBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct HookCounter {
        inits: AtomicUsize,
        enters: AtomicUsize,
        exits: AtomicUsize,
        updates: AtomicUsize,
    }

    #[derive(Debug)]
    struct CountingModule {
        name: &'static str,
        hooks: Arc<HookCounter>,
    }

    impl CapabilityModule for CountingModule {
        fn name(&self) -> &'static str {
            self.name
        }
        fn init(&self, _store: &StateStore) -> anyhow::Result<()> {
            self.hooks.inits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn on_enter(&self, _store: &StateStore) -> anyhow::Result<()> {
            self.hooks.enters.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn on_exit(&self, _store: &StateStore) -> anyhow::Result<()> {
            self.hooks.exits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn update(&self, _store: &StateStore, _delta: Duration) -> anyhow::Result<()> {
            self.hooks.updates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn store() -> Arc<StateStore> {
        Arc::new(StateStore::new(Arc::new(MemoryStorageBackend::new())))
    }

    fn counted_registry(name: &'static str, phase: Phase) -> (ModuleRegistry, Arc<HookCounter>) {
        let hooks = Arc::new(HookCounter::default());
        let mut registry = ModuleRegistry::new();
        let factory_hooks = hooks.clone();
        registry.register(name, move || {
            Arc::new(CountingModule {
                name,
                hooks: factory_hooks.clone(),
            })
        });
        registry.assign(phase, name);
        (registry, hooks)
    }

    #[test]
    fn flag_change_triggers_transition() {
        let store = store();
        let (registry, hooks) = counted_registry("auto_clippers", Phase::Automation);
        let manager = PhaseManager::new(store.clone(), registry);
        manager.init();
        assert_eq!(manager.current_phase(), Phase::Human);
        assert_eq!(hooks.inits.load(Ordering::SeqCst), 0);

        store.set("flags.automation", true);
        assert_eq!(manager.current_phase(), Phase::Automation);
        assert_eq!(hooks.inits.load(Ordering::SeqCst), 1);
        assert_eq!(hooks.enters.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn leaving_a_phase_fires_on_exit_and_keeps_the_instance() {
        let store = store();
        let (registry, hooks) = counted_registry("auto_clippers", Phase::Automation);
        let manager = PhaseManager::new(store.clone(), registry);
        manager.init();

        store.set("flags.automation", true);
        store.set("flags.space", true);
        assert_eq!(manager.current_phase(), Phase::Space);
        assert_eq!(hooks.exits.load(Ordering::SeqCst), 1);
        // Instance stays cached, init never re-runs.
        store.set("flags.space", false);
        assert_eq!(hooks.enters.load(Ordering::SeqCst), 2);
        assert_eq!(hooks.inits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn lazy_loading_defers_instantiation() {
        let store = store();
        let (registry, hooks) = counted_registry("probes", Phase::Space);
        let manager = PhaseManager::new(store.clone(), registry);
        manager.init();
        assert!(manager.loaded_modules().is_empty());
        assert_eq!(hooks.inits.load(Ordering::SeqCst), 0);

        store.set("flags.space", true);
        assert_eq!(manager.loaded_modules(), vec!["probes"]);
    }

    #[test]
    fn eager_loading_instantiates_everything_at_init() {
        let store = store();
        let (registry, hooks) = counted_registry("probes", Phase::Space);
        let manager = PhaseManager::with_lazy_loading(store, registry, false);
        manager.init();
        assert_eq!(hooks.inits.load(Ordering::SeqCst), 1);
        assert_eq!(manager.loaded_modules(), vec!["probes"]);
    }

    #[test]
    fn unknown_module_becomes_a_noop() {
        let store = store();
        let mut registry = ModuleRegistry::new();
        registry.assign(Phase::Human, "not_registered");
        let manager = PhaseManager::new(store, registry);
        manager.init();
        assert_eq!(manager.loaded_modules(), vec!["not_registered"]);
        assert_eq!(manager.current_phase(), Phase::Human);
    }

    #[test]
    fn update_active_only_runs_current_phase_modules() {
        let store = store();
        let hooks_auto = Arc::new(HookCounter::default());
        let hooks_space = Arc::new(HookCounter::default());
        let mut registry = ModuleRegistry::new();
        let h = hooks_auto.clone();
        registry.register("factory", move || {
            Arc::new(CountingModule {
                name: "factory",
                hooks: h.clone(),
            })
        });
        let h = hooks_space.clone();
        registry.register("probes", move || {
            Arc::new(CountingModule {
                name: "probes",
                hooks: h.clone(),
            })
        });
        registry.assign(Phase::Automation, "factory");
        registry.assign(Phase::Space, "probes");

        let manager = PhaseManager::new(store.clone(), registry);
        manager.init();
        store.set("flags.automation", true);

        manager.update_active(Duration::from_millis(16));
        assert_eq!(hooks_auto.updates.load(Ordering::SeqCst), 1);
        assert_eq!(hooks_space.updates.load(Ordering::SeqCst), 0);
    }

    #[derive(Debug)]
    struct FailingInit;

    impl CapabilityModule for FailingInit {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn init(&self, _store: &StateStore) -> anyhow::Result<()> {
            anyhow::bail!("refusing to start")
        }
    }

    #[test]
    fn init_failure_degrades_to_eager_loading() {
        let store = store();
        let (mut registry, hooks) = counted_registry("probes", Phase::Space);
        registry.register("failing", || Arc::new(FailingInit));
        registry.assign(Phase::Automation, "failing");

        let manager = PhaseManager::new(store.clone(), registry);
        manager.init();
        assert_eq!(hooks.inits.load(Ordering::SeqCst), 0);

        // Entering automation trips the failing module; the manager
        // falls back to loading every known module eagerly.
        store.set("flags.automation", true);
        assert_eq!(hooks.inits.load(Ordering::SeqCst), 1);
        assert!(manager.loaded_modules().contains(&"probes"));
        assert!(!manager.loaded_modules().contains(&"failing"));
    }

    #[test]
    fn detach_stops_flag_reactions() {
        let store = store();
        let (registry, _) = counted_registry("probes", Phase::Space);
        let manager = PhaseManager::new(store.clone(), registry);
        manager.init();
        manager.detach();
        store.set("flags.space", true);
        assert_eq!(manager.current_phase(), Phase::Human);
    }

    #[test]
    fn dropped_manager_does_not_react_through_stale_observers() {
        let store = store();
        let (registry, hooks) = counted_registry("probes", Phase::Space);
        let manager = PhaseManager::new(store.clone(), registry);
        manager.init();
        drop(manager);
        // Observer upgrade fails; nothing happens.
        store.set("flags.space", true);
        assert_eq!(hooks.inits.load(Ordering::SeqCst), 0);
    }
}
