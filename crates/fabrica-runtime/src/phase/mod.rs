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

//! Phase management and capability modules.
//!
//! The simulation moves through coarse phases (manual production, then
//! automation, then space expansion) driven entirely by boolean flags in
//! the state tree. Each phase activates a set of capability modules;
//! modules are instantiated lazily the first time their phase is
//! entered and stay resident afterwards.

mod manager;
mod modules;

pub use manager::{PhaseError, PhaseManager};
pub use modules::{CapabilityModule, ModuleRegistry, NoOpModule};

use fabrica_core::StateStore;
use std::fmt;

/// The coarse progression phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Manual production only.
    Human,
    /// Automated production unlocked.
    Automation,
    /// Space expansion unlocked.
    Space,
}

impl Phase {
    /// Derives the phase from the progression flags. `flags.space` takes
    /// precedence over `flags.automation`; with neither set the phase is
    /// [`Phase::Human`].
    pub fn from_flags(store: &StateStore) -> Self {
        if store.get_bool("flags.space") {
            Phase::Space
        } else if store.get_bool("flags.automation") {
            Phase::Automation
        } else {
            Phase::Human
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Human => write!(f, "human"),
            Phase::Automation => write!(f, "automation"),
            Phase::Space => write!(f, "space"),
        }
    }
}
