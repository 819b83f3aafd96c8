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

use crate::error::PersistError;
use std::fmt::Debug;

/// Trait defining the interface for save-payload storage backends.
///
/// A backend holds at most one payload (the last save). The store treats
/// every error from this seam as a transient I/O failure: logged,
/// surfaced as `false`, never propagated.
pub trait StorageBackend: Send + Sync + Debug + 'static {
    /// Reads the stored payload, `Ok(None)` when nothing has ever been
    /// written.
    fn read(&self) -> Result<Option<String>, PersistError>;

    /// Stores a payload, replacing any previous one.
    fn write(&self, payload: &str) -> Result<(), PersistError>;

    /// Removes the stored payload, if any.
    fn clear(&self) -> Result<(), PersistError>;
}
