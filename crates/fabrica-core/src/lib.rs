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

//! # Fabrica Core
//!
//! Foundational crate for the fabrica simulation runtime: the reactive
//! hierarchical state store, the versioned persistence envelope with
//! pluggable storage backends, the user-notification event bus, and the
//! small shared utilities (stopwatch, error hierarchy) the other crates
//! build on.

pub mod error;
pub mod event;
pub mod persist;
pub mod state;
pub mod utils;

pub use error::{CodecError, PersistError};
pub use event::{EventBus, Notification, NotificationLevel};
pub use state::StateStore;
pub use utils::timer::Stopwatch;
