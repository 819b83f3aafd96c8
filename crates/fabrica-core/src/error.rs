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

//! Defines the hierarchy of error types for the core state and
//! persistence subsystems.
//!
//! These errors never cross the public surface of [`StateStore`]'s
//! boolean-returning operations; they exist so that the storage-backend
//! seam and the export/import codec can report *why* something failed to
//! the log before the failure is collapsed into `false`.
//!
//! [`StateStore`]: crate::state::StateStore

use std::fmt;

/// An error raised by a persistence storage backend or by envelope
/// (de)serialization.
#[derive(Debug)]
pub enum PersistError {
    /// The underlying storage medium failed (disk full, permission
    /// denied, quota exceeded, ...).
    Io {
        /// Human-readable description of the failed operation.
        operation: String,
        /// The underlying I/O error message.
        source_error: String,
    },
    /// The live state could not be serialized into an envelope payload.
    Serialize {
        /// Detailed error message from the serializer.
        details: String,
    },
    /// A stored payload exists but could not be parsed as an envelope.
    Malformed {
        /// Detailed error message from the parser.
        details: String,
    },
    /// A parsed payload is missing a required envelope field.
    MissingField {
        /// The name of the absent field (`version` or `state`).
        field: &'static str,
    },
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Io {
                operation,
                source_error,
            } => {
                write!(f, "Storage I/O failure during {operation}: {source_error}")
            }
            PersistError::Serialize { details } => {
                write!(f, "Failed to serialize state envelope: {details}")
            }
            PersistError::Malformed { details } => {
                write!(f, "Stored payload is not a valid envelope: {details}")
            }
            PersistError::MissingField { field } => {
                write!(f, "Envelope is missing required field '{field}'")
            }
        }
    }
}

impl std::error::Error for PersistError {}

/// An error raised by the export/import text codec.
#[derive(Debug)]
pub enum CodecError {
    /// The import text is not valid base64.
    BadEncoding {
        /// Detailed decoder error message.
        details: String,
    },
    /// The decoded bytes are not valid UTF-8.
    BadPayload {
        /// Detailed conversion error message.
        details: String,
    },
    /// There is no persisted payload to export.
    NothingToExport,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::BadEncoding { details } => {
                write!(f, "Import text is not valid base64: {details}")
            }
            CodecError::BadPayload { details } => {
                write!(f, "Decoded import payload is not valid UTF-8: {details}")
            }
            CodecError::NothingToExport => {
                write!(f, "No persisted payload exists to export")
            }
        }
    }
}

impl std::error::Error for CodecError {}
