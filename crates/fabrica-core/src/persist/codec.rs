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

//! Reversible text encoding for out-of-band save transfer.
//!
//! Export wraps the *raw persisted payload* (not a fresh serialization of
//! live state) in base64 so users can copy it anywhere; import reverses
//! the encoding. Validation of the payload itself stays with `load()`.

use crate::error::CodecError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Encodes a raw persisted payload into transferable text.
pub fn encode_save(payload: &str) -> String {
    STANDARD.encode(payload.as_bytes())
}

/// Decodes transferable text back into the raw payload string.
pub fn decode_save(text: &str) -> Result<String, CodecError> {
    let bytes = STANDARD
        .decode(text.trim())
        .map_err(|e| CodecError::BadEncoding {
            details: e.to_string(),
        })?;
    String::from_utf8(bytes).map_err(|e| CodecError::BadPayload {
        details: e.to_string(),
    })
}
