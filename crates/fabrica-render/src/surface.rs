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

//! The render-target contract and an in-memory surface implementation.
//!
//! A surface maps stable string identities to live handles and applies
//! the four mutation categories. Only two capabilities are required of a
//! real backend: resolving an identity and answering "is this handle
//! still attached"; everything else is plain application of mutations.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Mutex;

/// Ordered style property map (deterministic iteration for tests and
/// stable surface application).
pub type StyleMap = BTreeMap<String, String>;

/// A class-list mutation: classes to add and classes to remove.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassChange {
    /// Class names to add.
    pub add: Vec<String>,
    /// Class names to remove.
    pub remove: Vec<String>,
}

impl ClassChange {
    /// A change that only adds classes.
    pub fn add_only(classes: &[&str]) -> Self {
        Self {
            add: classes.iter().map(|c| c.to_string()).collect(),
            remove: Vec::new(),
        }
    }

    /// A change that only removes classes.
    pub fn remove_only(classes: &[&str]) -> Self {
        Self {
            add: Vec::new(),
            remove: classes.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// An opaque handle to a live render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetHandle(pub(crate) u64);

/// An error applying a mutation to the surface.
#[derive(Debug)]
pub enum SurfaceError {
    /// No target exists for the given identity.
    UnknownTarget {
        /// The identity that failed to resolve.
        id: String,
    },
    /// The handle refers to a target no longer attached to the surface.
    Detached {
        /// The stale handle.
        handle: TargetHandle,
    },
    /// The surface backend failed to apply the mutation.
    Backend {
        /// Detailed error message from the backend.
        details: String,
    },
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceError::UnknownTarget { id } => {
                write!(f, "Unknown render target '{id}'")
            }
            SurfaceError::Detached { handle } => {
                write!(f, "Render target handle {handle:?} is detached")
            }
            SurfaceError::Backend { details } => {
                write!(f, "Surface backend failure: {details}")
            }
        }
    }
}

impl std::error::Error for SurfaceError {}

/// The capabilities the batcher requires from a visual surface.
pub trait Surface: Send + Sync + fmt::Debug {
    /// Resolves a stable string identity to a live handle, if the target
    /// currently exists.
    fn resolve(&self, id: &str) -> Option<TargetHandle>;

    /// Whether the handle still refers to an attached target.
    fn is_attached(&self, handle: TargetHandle) -> bool;

    /// Shows or hides a target.
    fn apply_visibility(&self, handle: TargetHandle, visible: bool) -> Result<(), SurfaceError>;

    /// Applies inline style properties.
    fn apply_styles(&self, handle: TargetHandle, styles: &StyleMap) -> Result<(), SurfaceError>;

    /// Applies a class-list change.
    fn apply_classes(&self, handle: TargetHandle, change: &ClassChange)
        -> Result<(), SurfaceError>;

    /// Replaces a target's text content.
    fn apply_text(&self, handle: TargetHandle, text: &str) -> Result<(), SurfaceError>;

    /// Reads a property of a target (geometry, scroll metrics, ...).
    /// `None` when the target or property does not exist.
    fn read_property(&self, handle: TargetHandle, property: &str) -> Option<Value>;
}

// ----------------------------------------------------------------------
// In-memory surface
// ----------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct Node {
    id: String,
    attached: bool,
    visible: bool,
    text: String,
    styles: StyleMap,
    classes: BTreeSet<String>,
    properties: HashMap<String, Value>,
}

/// A snapshot of one surface node's state, for assertions and demos.
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    /// Whether the node is currently shown.
    pub visible: bool,
    /// Current text content.
    pub text: String,
    /// Current inline styles.
    pub styles: StyleMap,
    /// Current class list.
    pub classes: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct HeadlessInner {
    nodes: HashMap<u64, Node>,
    ids: HashMap<String, u64>,
    next_handle: u64,
    op_log: Vec<String>,
}

/// An in-memory surface implementation.
///
/// Serves as the test double for the pipeline and as a real backend for
/// headless runs; it records every applied operation in order, which is
/// how the flush-ordering guarantees are asserted.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    inner: Mutex<HeadlessInner>,
}

impl HeadlessSurface {
    /// Creates an empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attached, visible, empty target under the given identity.
    pub fn add_target(&self, id: &str) -> TargetHandle {
        let mut inner = self.inner.lock().unwrap();
        let handle = inner.next_handle;
        inner.next_handle += 1;
        inner.nodes.insert(
            handle,
            Node {
                id: id.to_string(),
                attached: true,
                visible: true,
                ..Node::default()
            },
        );
        inner.ids.insert(id.to_string(), handle);
        TargetHandle(handle)
    }

    /// Detaches a target: its handle stops answering `is_attached`, and
    /// a later `resolve` of the same identity yields a fresh handle only
    /// after `reattach`.
    pub fn detach(&self, id: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(handle) = inner.ids.get(id).copied() {
            if let Some(node) = inner.nodes.get_mut(&handle) {
                node.attached = false;
            }
            inner.ids.remove(id);
        }
    }

    /// Re-adds a previously detached identity as a fresh target.
    pub fn reattach(&self, id: &str) -> TargetHandle {
        self.add_target(id)
    }

    /// Sets a readable property on a target (e.g. `offsetWidth`).
    pub fn set_property(&self, id: &str, property: &str, value: Value) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(handle) = inner.ids.get(id).copied() {
            if let Some(node) = inner.nodes.get_mut(&handle) {
                node.properties.insert(property.to_string(), value);
            }
        }
    }

    /// Snapshot of a target's current state.
    pub fn node(&self, id: &str) -> Option<NodeSnapshot> {
        let inner = self.inner.lock().unwrap();
        let handle = inner.ids.get(id)?;
        let node = inner.nodes.get(handle)?;
        Some(NodeSnapshot {
            visible: node.visible,
            text: node.text.clone(),
            styles: node.styles.clone(),
            classes: node.classes.clone(),
        })
    }

    /// The ordered log of every operation applied so far.
    pub fn op_log(&self) -> Vec<String> {
        self.inner.lock().unwrap().op_log.clone()
    }

    /// Clears the operation log.
    pub fn clear_op_log(&self) {
        self.inner.lock().unwrap().op_log.clear();
    }

    fn with_attached_node<R>(
        &self,
        handle: TargetHandle,
        op: impl FnOnce(&mut Node, &mut Vec<String>) -> R,
    ) -> Result<R, SurfaceError> {
        let mut inner = self.inner.lock().unwrap();
        let inner = &mut *inner;
        match inner.nodes.get_mut(&handle.0) {
            Some(node) if node.attached => Ok(op(node, &mut inner.op_log)),
            Some(_) => Err(SurfaceError::Detached { handle }),
            None => Err(SurfaceError::Detached { handle }),
        }
    }
}

impl Surface for HeadlessSurface {
    fn resolve(&self, id: &str) -> Option<TargetHandle> {
        self.inner.lock().unwrap().ids.get(id).copied().map(TargetHandle)
    }

    fn is_attached(&self, handle: TargetHandle) -> bool {
        self.inner
            .lock()
            .unwrap()
            .nodes
            .get(&handle.0)
            .map(|n| n.attached)
            .unwrap_or(false)
    }

    fn apply_visibility(&self, handle: TargetHandle, visible: bool) -> Result<(), SurfaceError> {
        self.with_attached_node(handle, |node, log| {
            node.visible = visible;
            log.push(format!("visibility {}={visible}", node.id));
        })
    }

    fn apply_styles(&self, handle: TargetHandle, styles: &StyleMap) -> Result<(), SurfaceError> {
        self.with_attached_node(handle, |node, log| {
            for (key, value) in styles {
                node.styles.insert(key.clone(), value.clone());
            }
            log.push(format!("styles {}={styles:?}", node.id));
        })
    }

    fn apply_classes(
        &self,
        handle: TargetHandle,
        change: &ClassChange,
    ) -> Result<(), SurfaceError> {
        self.with_attached_node(handle, |node, log| {
            for class in &change.add {
                node.classes.insert(class.clone());
            }
            for class in &change.remove {
                node.classes.remove(class);
            }
            log.push(format!("classes {}+{:?}-{:?}", node.id, change.add, change.remove));
        })
    }

    fn apply_text(&self, handle: TargetHandle, text: &str) -> Result<(), SurfaceError> {
        self.with_attached_node(handle, |node, log| {
            node.text = text.to_string();
            log.push(format!("text {}={text}", node.id));
        })
    }

    fn read_property(&self, handle: TargetHandle, property: &str) -> Option<Value> {
        let inner = self.inner.lock().unwrap();
        inner.nodes.get(&handle.0)?.properties.get(property).cloned()
    }
}
