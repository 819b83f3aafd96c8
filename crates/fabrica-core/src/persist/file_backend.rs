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
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// File-backed storage: one save file on disk.
#[derive(Debug)]
pub struct FileStorageBackend {
    path: PathBuf,
}

impl FileStorageBackend {
    /// Creates a backend persisting to the given file path. The file is
    /// created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The save file's path.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl StorageBackend for FileStorageBackend {
    fn read(&self) -> Result<Option<String>, PersistError> {
        match fs::read_to_string(&self.path) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistError::Io {
                operation: format!("read {}", self.path.display()),
                source_error: e.to_string(),
            }),
        }
    }

    fn write(&self, payload: &str) -> Result<(), PersistError> {
        fs::write(&self.path, payload).map_err(|e| PersistError::Io {
            operation: format!("write {}", self.path.display()),
            source_error: e.to_string(),
        })
    }

    fn clear(&self) -> Result<(), PersistError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistError::Io {
                operation: format!("remove {}", self.path.display()),
                source_error: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = env::temp_dir();
        path.push(format!("fabrica-backend-{name}-{}.json", std::process::id()));
        path
    }

    #[test]
    fn missing_file_reads_as_none() {
        let backend = FileStorageBackend::new(temp_path("missing"));
        let _ = backend.clear();
        assert_eq!(backend.read().unwrap(), None);
    }

    #[test]
    fn write_read_clear_cycle() {
        let backend = FileStorageBackend::new(temp_path("cycle"));
        backend.write("{\"version\":\"1\"}").unwrap();
        assert_eq!(
            backend.read().unwrap().as_deref(),
            Some("{\"version\":\"1\"}")
        );
        backend.clear().unwrap();
        assert_eq!(backend.read().unwrap(), None);
    }

    #[test]
    fn clear_on_missing_file_is_fine() {
        let backend = FileStorageBackend::new(temp_path("clear-missing"));
        let _ = backend.clear();
        assert!(backend.clear().is_ok());
    }
}
