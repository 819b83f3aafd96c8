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

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The versioned wrapper persisted to and loaded from storage.
///
/// `state` carries the full category map of the state tree. Loading
/// validates only the envelope contract (`version` present, `state` an
/// object); category contents are merged permissively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Save format version.
    pub version: String,
    /// Epoch milliseconds at save time.
    pub timestamp: u64,
    /// Full snapshot of the state tree.
    pub state: Value,
}
