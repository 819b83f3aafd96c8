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

//! # Fabrica Render
//!
//! The batched render pipeline: decouples "what changed in state" from
//! "when the visual surface is touched". Mutation requests are coalesced
//! per (target, category) key and flushed once per display frame in a
//! fixed order that lets layout-affecting changes settle before content
//! changes. The underlying surface is abstract; the pipeline only needs
//! id→handle resolution and an attachment query.

pub mod batcher;
pub mod bindings;
pub mod cache;
pub mod surface;

pub use batcher::MutationBatcher;
pub use bindings::StateBindings;
pub use cache::{CacheStats, TargetCache};
pub use surface::{
    ClassChange, HeadlessSurface, StyleMap, Surface, SurfaceError, TargetHandle,
};
