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

//! Persistence: the versioned save envelope, the storage-backend seam,
//! and the export/import text codec.
//!
//! The store never talks to a medium directly; it goes through
//! [`StorageBackend`], with an in-memory implementation for tests and a
//! file-backed one for real use.

pub mod codec;
pub mod envelope;

mod backend;
mod file_backend;
mod memory_backend;

pub use backend::StorageBackend;
pub use file_backend::FileStorageBackend;
pub use memory_backend::MemoryStorageBackend;
