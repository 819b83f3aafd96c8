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

//! Capability modules and the registry that maps phases to them.

use super::Phase;
use fabrica_core::StateStore;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// A self-contained simulation capability activated by a phase.
///
/// Implementations are instantiated once by the [`super::PhaseManager`]
/// and stay resident for the rest of the session; `on_enter`/`on_exit`
/// fire on every phase boundary they participate in.
pub trait CapabilityModule: Send + Sync + Debug {
    /// Stable identifier, also used in registry lookups and logs.
    fn name(&self) -> &'static str;

    /// One-time setup when the module is first instantiated.
    fn init(&self, _store: &StateStore) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when a phase that includes this module is entered.
    fn on_enter(&self, _store: &StateStore) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called when leaving a phase for one that does not include this
    /// module.
    fn on_exit(&self, _store: &StateStore) -> anyhow::Result<()> {
        Ok(())
    }

    /// Per-update-activity hook, run only while the module's phase is
    /// active.
    fn update(&self, _store: &StateStore, _delta: Duration) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Stand-in for a module name with no registered factory. All hooks are
/// no-ops.
#[derive(Debug)]
pub struct NoOpModule {
    name: &'static str,
}

impl NoOpModule {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl CapabilityModule for NoOpModule {
    fn name(&self) -> &'static str {
        self.name
    }
}

type ModuleFactory = Box<dyn Fn() -> Arc<dyn CapabilityModule> + Send + Sync>;

/// Maps module names to factories and phases to module sets.
#[derive(Default)]
pub struct ModuleRegistry {
    factories: HashMap<&'static str, ModuleFactory>,
    phase_modules: HashMap<Phase, Vec<&'static str>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under a module name. A repeated name replaces
    /// the earlier factory.
    pub fn register(
        &mut self,
        name: &'static str,
        factory: impl Fn() -> Arc<dyn CapabilityModule> + Send + Sync + 'static,
    ) {
        if self.factories.insert(name, Box::new(factory)).is_some() {
            log::warn!("Module factory '{name}' replaced");
        }
    }

    /// Declares that `phase` activates the named module.
    pub fn assign(&mut self, phase: Phase, name: &'static str) {
        let modules = self.phase_modules.entry(phase).or_default();
        if !modules.contains(&name) {
            modules.push(name);
        }
    }

    /// Module names activated by the given phase, in assignment order.
    pub fn modules_for(&self, phase: Phase) -> &[&'static str] {
        self.phase_modules
            .get(&phase)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every module name assigned to any phase.
    pub fn all_assigned(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .phase_modules
            .values()
            .flatten()
            .copied()
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Instantiates the named module, or `None` when no factory is
    /// registered under that name.
    pub fn instantiate(&self, name: &str) -> Option<Arc<dyn CapabilityModule>> {
        self.factories.get(name).map(|factory| factory())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Probe;

    impl CapabilityModule for Probe {
        fn name(&self) -> &'static str {
            "probe"
        }
    }

    #[test]
    fn registry_maps_phases_to_modules() {
        let mut registry = ModuleRegistry::new();
        registry.register("probe", || Arc::new(Probe));
        registry.assign(Phase::Space, "probe");
        registry.assign(Phase::Space, "probe");

        assert_eq!(registry.modules_for(Phase::Space), &["probe"]);
        assert!(registry.modules_for(Phase::Human).is_empty());
        assert!(registry.instantiate("probe").is_some());
        assert!(registry.instantiate("missing").is_none());
    }

    #[test]
    fn all_assigned_is_deduplicated() {
        let mut registry = ModuleRegistry::new();
        registry.assign(Phase::Automation, "factory");
        registry.assign(Phase::Space, "factory");
        registry.assign(Phase::Space, "probe");
        assert_eq!(registry.all_assigned(), vec!["factory", "probe"]);
    }
}
