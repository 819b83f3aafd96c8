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

//! The fixed default shape of the state tree.
//!
//! Constructed once at process start and again on `reset()`. The
//! top-level categories are fixed; domain modules may add leaves under
//! them at runtime but never add new categories via persistence.

use serde_json::{json, Value};

/// Builds the default state tree.
pub fn default_tree() -> Value {
    json!({
        "resources": {
            "clips": 0.0,
            "wire": 1000.0,
            "funds": 0.0,
            "unsold_clips": 0.0,
        },
        "production": {
            "clipmaker_level": 0.0,
            "clipper_cost": 5.0,
            "wire_per_spool": 1000.0,
        },
        "market": {
            "clip_price": 0.25,
            "demand": 1.0,
            "marketing_level": 1.0,
        },
        "projects": {
            "unlocked": [],
            "completed": [],
        },
        "combat": {
            "honor": 0.0,
            "probes_lost": 0.0,
            "drifters_lost": 0.0,
        },
        "flags": {
            "automation": false,
            "space": false,
            "combat": false,
        },
        "meta": {
            "ticks": 0.0,
            "play_time_ms": 0.0,
        },
    })
}
