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

//! Declarative state → surface bindings.
//!
//! A binding set is the canonical render callback: once per render
//! activity it reads bound paths from the store and enqueues the
//! corresponding mutations into the batcher. Bindings never write to the
//! store.

use crate::batcher::MutationBatcher;
use fabrica_core::StateStore;
use serde_json::Value;

type FormatFn = Box<dyn Fn(&Value) -> String + Send + Sync>;

struct TextBinding {
    path: String,
    target: String,
    format: FormatFn,
}

struct VisibilityBinding {
    path: String,
    target: String,
}

/// A set of path→target bindings driven by the render pass.
#[derive(Default)]
pub struct StateBindings {
    text: Vec<TextBinding>,
    visibility: Vec<VisibilityBinding>,
}

impl StateBindings {
    /// Creates an empty binding set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a path's value to a target's text content, using the
    /// default value formatting.
    pub fn bind_text(&mut self, path: impl Into<String>, target: impl Into<String>) {
        self.bind_text_with(path, target, format_value);
    }

    /// Binds a path's value to a target's text content with a custom
    /// formatter.
    pub fn bind_text_with(
        &mut self,
        path: impl Into<String>,
        target: impl Into<String>,
        format: impl Fn(&Value) -> String + Send + Sync + 'static,
    ) {
        self.text.push(TextBinding {
            path: path.into(),
            target: target.into(),
            format: Box::new(format),
        });
    }

    /// Binds a boolean path to a target's visibility.
    pub fn bind_visibility(&mut self, path: impl Into<String>, target: impl Into<String>) {
        self.visibility.push(VisibilityBinding {
            path: path.into(),
            target: target.into(),
        });
    }

    /// Number of registered bindings.
    pub fn len(&self) -> usize {
        self.text.len() + self.visibility.len()
    }

    /// Whether no bindings are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads every bound path and enqueues the corresponding mutation.
    /// Paths that resolve to nothing are skipped.
    pub fn render_pass(&self, store: &StateStore, batcher: &MutationBatcher) {
        for binding in &self.visibility {
            if let Some(value) = store.get(&binding.path) {
                let visible = value.as_bool().unwrap_or(false);
                batcher.update_visibility(&binding.target, visible);
            }
        }
        for binding in &self.text {
            if let Some(value) = store.get(&binding.path) {
                batcher.update_text(&binding.target, (binding.format)(&value));
            }
        }
    }
}

/// Default display formatting: whole numbers render without a fraction,
/// other numbers with two decimals, strings verbatim.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 => format!("{}", f as i64),
            Some(f) => format!("{f:.2}"),
            None => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{HeadlessSurface, Surface};
    use fabrica_core::persist::MemoryStorageBackend;
    use serde_json::json;
    use std::sync::Arc;

    fn setup() -> (StateStore, Arc<HeadlessSurface>, MutationBatcher) {
        let store = StateStore::new(Arc::new(MemoryStorageBackend::new()));
        let surface = Arc::new(HeadlessSurface::new());
        let batcher = MutationBatcher::new(surface.clone() as Arc<dyn Surface>);
        (store, surface, batcher)
    }

    #[test]
    fn text_binding_renders_store_value() {
        let (store, surface, batcher) = setup();
        surface.add_target("clips-display");
        store.set("resources.clips", 1234.0);

        let mut bindings = StateBindings::new();
        bindings.bind_text("resources.clips", "clips-display");
        bindings.render_pass(&store, &batcher);
        batcher.flush();

        assert_eq!(surface.node("clips-display").unwrap().text, "1234");
    }

    #[test]
    fn visibility_binding_tracks_a_flag() {
        let (store, surface, batcher) = setup();
        surface.add_target("space-panel");

        let mut bindings = StateBindings::new();
        bindings.bind_visibility("flags.space", "space-panel");

        bindings.render_pass(&store, &batcher);
        batcher.flush();
        assert!(!surface.node("space-panel").unwrap().visible);

        store.set("flags.space", true);
        bindings.render_pass(&store, &batcher);
        batcher.flush();
        assert!(surface.node("space-panel").unwrap().visible);
    }

    #[test]
    fn custom_formatter_is_used() {
        let (store, surface, batcher) = setup();
        surface.add_target("funds-display");
        store.set("resources.funds", 12.5);

        let mut bindings = StateBindings::new();
        bindings.bind_text_with("resources.funds", "funds-display", |v| {
            format!("$ {:.2}", v.as_f64().unwrap_or(0.0))
        });
        bindings.render_pass(&store, &batcher);
        batcher.flush();

        assert_eq!(surface.node("funds-display").unwrap().text, "$ 12.50");
    }

    #[test]
    fn absent_paths_are_skipped() {
        let (store, surface, batcher) = setup();
        surface.add_target("ghost");

        let mut bindings = StateBindings::new();
        bindings.bind_text("no.such.path", "ghost");
        bindings.render_pass(&store, &batcher);
        batcher.flush();

        assert_eq!(surface.node("ghost").unwrap().text, "");
    }

    #[test]
    fn default_formatting_rules() {
        assert_eq!(format_value(&json!(42.0)), "42");
        assert_eq!(format_value(&json!(0.25)), "0.25");
        assert_eq!(format_value(&json!("wire")), "wire");
        assert_eq!(format_value(&json!(true)), "true");
    }
}
