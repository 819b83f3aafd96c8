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

//! Runtime configuration.
//!
//! Intervals control the cadence of the four loop activities. Invalid
//! values found in a config file are logged and replaced with the
//! defaults; a missing file is not an error.

use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_RENDER_INTERVAL_MS: u64 = 16;
const DEFAULT_AUTOSAVE_INTERVAL_MS: u64 = 30_000;
const DEFAULT_HOUSEKEEPING_INTERVAL_MS: u64 = 5_000;

/// Configuration for the simulation runtime.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Minimum time between render passes, in milliseconds.
    pub render_interval_ms: u64,
    /// Time between autosaves, in milliseconds.
    pub autosave_interval_ms: u64,
    /// Time between housekeeping passes, in milliseconds.
    pub housekeeping_interval_ms: u64,
    /// Log level name understood by the `log` crate.
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            render_interval_ms: DEFAULT_RENDER_INTERVAL_MS,
            autosave_interval_ms: DEFAULT_AUTOSAVE_INTERVAL_MS,
            housekeeping_interval_ms: DEFAULT_HOUSEKEEPING_INTERVAL_MS,
            log_level: "info".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Loads configuration from a JSON file, falling back to defaults
    /// when the file is absent, unreadable or partially invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No config file at {}, using defaults", path.display());
                return Self::default();
            }
            Err(e) => {
                log::warn!("Failed to read config {}: {}", path.display(), e);
                return Self::default();
            }
        };
        match serde_json::from_str::<RuntimeConfig>(&contents) {
            Ok(config) => config.validated(),
            Err(e) => {
                log::warn!("Malformed config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Replaces out-of-range or unknown values with the defaults,
    /// logging each substitution.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.render_interval_ms == 0 {
            log::warn!(
                "render_interval_ms must be non-zero, using {}",
                defaults.render_interval_ms
            );
            self.render_interval_ms = defaults.render_interval_ms;
        }
        if self.autosave_interval_ms == 0 {
            log::warn!(
                "autosave_interval_ms must be non-zero, using {}",
                defaults.autosave_interval_ms
            );
            self.autosave_interval_ms = defaults.autosave_interval_ms;
        }
        if self.housekeeping_interval_ms == 0 {
            log::warn!(
                "housekeeping_interval_ms must be non-zero, using {}",
                defaults.housekeeping_interval_ms
            );
            self.housekeeping_interval_ms = defaults.housekeeping_interval_ms;
        }
        if log::LevelFilter::from_str(&self.log_level).is_err() {
            log::warn!(
                "Unknown log level '{}', using '{}'",
                self.log_level,
                defaults.log_level
            );
            self.log_level = defaults.log_level;
        }
        self
    }

    /// The configured log level as a `log::LevelFilter`.
    pub fn log_level_filter(&self) -> log::LevelFilter {
        log::LevelFilter::from_str(&self.log_level).unwrap_or(log::LevelFilter::Info)
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_millis(self.autosave_interval_ms)
    }

    pub fn housekeeping_interval(&self) -> Duration {
        Duration::from_millis(self.housekeeping_interval_ms)
    }
}
