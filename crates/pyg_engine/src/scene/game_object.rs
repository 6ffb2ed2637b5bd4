//! GameObject nodes
//!
//! A GameObject is a named node in the scene hierarchy. It owns its children
//! and components through the [`super::Scene`] arenas; its parent link is a
//! plain key and never keeps the parent alive.

use std::fmt;

use serde::{Serialize, Deserialize};

use crate::foundation::collections::{ComponentKey, ObjectKey};

/// Public handle of a GameObject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

/// Hierarchy node stored in the scene
///
/// Read access is public through [`super::Scene::object`]; every mutation
/// goes through the scene so that parent and child links stay in sync.
#[derive(Debug, Clone)]
pub struct GameObject {
    pub(crate) id: ObjectId,
    pub(crate) name: String,
    pub(crate) enabled: bool,
    pub(crate) parent: Option<ObjectKey>,
    pub(crate) children: Vec<ObjectKey>,
    pub(crate) components: Vec<ComponentKey>,
}

impl GameObject {
    pub(crate) fn new(id: ObjectId, name: String) -> Self {
        Self {
            id,
            name,
            enabled: true,
            parent: None,
            children: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Unique id
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Display name; not required to be unique
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Local enabled flag
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the node has a parent
    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    /// Number of direct children
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Number of attached components
    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}
