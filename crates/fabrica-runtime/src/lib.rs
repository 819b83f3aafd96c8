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

//! Fabrica Runtime
//!
//! Drives the simulation: a four-activity tick loop (update, render,
//! autosave, housekeeping), phase-gated capability modules and runtime
//! configuration. The runtime owns no simulation rules of its own; it
//! schedules the callbacks handed to it and keeps the ambient services
//! (persistence, diagnostics, render flushing) running on their
//! cadences.

pub mod config;
pub mod context;
pub mod game_loop;
pub mod phase;

pub use config::RuntimeConfig;
pub use context::SimContext;
pub use game_loop::GameLoop;
pub use phase::{CapabilityModule, ModuleRegistry, Phase, PhaseError, PhaseManager};
