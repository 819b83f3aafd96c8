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

//! Observer registration types for the state store.

use serde_json::Value;
use std::sync::Arc;

/// The signature of a state observer: receives the exact path that
/// changed and the new value.
pub type ObserverFn = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// What a registration watches: one exact path, or every direct child of
/// a prefix (the `"flags.*"` form).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverPattern {
    /// Fires only for writes to exactly this path.
    Exact(String),
    /// Fires for writes to any direct child of this prefix.
    Children(String),
}

impl ObserverPattern {
    /// Parses a registration string. A trailing `.*` selects the
    /// wildcard form; anything else is an exact path.
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix(".*") {
            Some(prefix) => ObserverPattern::Children(prefix.to_string()),
            None => ObserverPattern::Exact(pattern.to_string()),
        }
    }

    /// Whether a write to `path` should fire this registration.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            ObserverPattern::Exact(exact) => exact == path,
            ObserverPattern::Children(prefix) => match path.strip_prefix(prefix.as_str()) {
                // Direct children only: one more segment, no deeper.
                Some(rest) => {
                    rest.len() > 1 && rest.starts_with('.') && !rest[1..].contains('.')
                }
                None => false,
            },
        }
    }
}

/// An opaque handle to a single observer registration, returned by
/// [`StateStore::add_observer`](crate::state::StateStore::add_observer).
/// Dropping the handle does not deregister; pass it to
/// `remove_observer`, which is idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(pub(crate) u64);

pub(crate) struct ObserverEntry {
    pub id: u64,
    pub pattern: ObserverPattern,
    pub callback: ObserverFn,
}
