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
use crate::persist::StorageBackend;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// In-memory storage backend.
///
/// The default backend for tests and for running without persistence.
/// Write failures can be injected to exercise the store's transient-I/O
/// error path.
#[derive(Debug, Default)]
pub struct MemoryStorageBackend {
    slot: Mutex<Option<String>>,
    fail_writes: AtomicBool,
}

impl MemoryStorageBackend {
    /// Creates an empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `write` fail, simulating a full medium.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl StorageBackend for MemoryStorageBackend {
    fn read(&self) -> Result<Option<String>, PersistError> {
        Ok(self.slot.lock().unwrap().clone())
    }

    fn write(&self, payload: &str) -> Result<(), PersistError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistError::Io {
                operation: "write".to_string(),
                source_error: "injected failure (medium full)".to_string(),
            });
        }
        *self.slot.lock().unwrap() = Some(payload.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), PersistError> {
        *self.slot.lock().unwrap() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let backend = MemoryStorageBackend::new();
        assert_eq!(backend.read().unwrap(), None);
    }

    #[test]
    fn write_then_read_returns_payload() {
        let backend = MemoryStorageBackend::new();
        backend.write("payload").unwrap();
        assert_eq!(backend.read().unwrap().as_deref(), Some("payload"));
    }

    #[test]
    fn clear_removes_payload() {
        let backend = MemoryStorageBackend::new();
        backend.write("payload").unwrap();
        backend.clear().unwrap();
        assert_eq!(backend.read().unwrap(), None);
    }

    #[test]
    fn injected_write_failure_keeps_old_payload() {
        let backend = MemoryStorageBackend::new();
        backend.write("original").unwrap();
        backend.fail_writes(true);
        assert!(backend.write("replacement").is_err());
        assert_eq!(backend.read().unwrap().as_deref(), Some("original"));
    }
}
