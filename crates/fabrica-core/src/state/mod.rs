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

//! The reactive hierarchical state store.
//!
//! Every piece of mutable simulation state lives in one tree of
//! [`serde_json::Value`]s, addressed by dotted path strings such as
//! `"resources.wire"`. Writes that change a value fire registered
//! observers synchronously; reads of missing paths return `None` rather
//! than failing.

mod defaults;
mod observer;
mod path;
mod store;

pub use observer::{ObserverHandle, ObserverPattern};
pub use path::{parent_and_leaf, split_path};
pub use store::{StateStore, SAVE_FORMAT_VERSION};
