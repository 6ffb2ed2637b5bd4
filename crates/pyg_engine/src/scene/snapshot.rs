//! Serializable scene snapshots
//!
//! Read-only copies of a subtree for inspectors, debug dumps and tests.

use serde::{Serialize, Deserialize};

use super::component::ComponentId;
use super::game_object::ObjectId;
use super::properties::PropertyBag;
use super::scene_graph::{Scene, SceneError};

/// Snapshot of one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSnapshot {
    /// Component id
    pub id: ComponentId,
    /// Name given at attach time
    pub name: String,
    /// Reported type name
    pub type_name: String,
    /// Local enabled flag
    pub enabled: bool,
    /// Property values at capture time
    pub properties: PropertyBag,
}

/// Snapshot of a GameObject and its subtree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    /// Object id
    pub id: ObjectId,
    /// Display name
    pub name: String,
    /// Local enabled flag
    pub enabled: bool,
    /// Components in attach order
    pub components: Vec<ComponentSnapshot>,
    /// Children in traversal order
    pub children: Vec<ObjectSnapshot>,
}

impl ObjectSnapshot {
    /// Capture `id` and everything below it
    pub fn capture(scene: &Scene, id: ObjectId) -> Result<Self, SceneError> {
        let components = scene
            .components(id)?
            .into_iter()
            .map(|component| {
                Ok(ComponentSnapshot {
                    id: component,
                    name: scene.component_name(component)?.to_string(),
                    type_name: scene.component_type_name(component)?.to_string(),
                    enabled: scene.is_component_enabled(component)?,
                    properties: scene.properties(component)?.clone(),
                })
            })
            .collect::<Result<Vec<_>, SceneError>>()?;

        let children = scene
            .children(id)?
            .into_iter()
            .map(|child| Self::capture(scene, child))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id,
            name: scene.name(id)?.to_string(),
            enabled: scene.is_enabled(id)?,
            components,
            children,
        })
    }

    /// Number of objects in the snapshot, this one included
    pub fn object_count(&self) -> usize {
        1 + self.children.iter().map(Self::object_count).sum::<usize>()
    }

    /// Pretty RON rendering
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}

impl Scene {
    /// Snapshot of one subtree
    pub fn snapshot(&self, id: ObjectId) -> Result<ObjectSnapshot, SceneError> {
        ObjectSnapshot::capture(self, id)
    }

    /// Snapshots of every root in order
    pub fn snapshot_roots(&self) -> Result<Vec<ObjectSnapshot>, SceneError> {
        self.roots().into_iter().map(|root| self.snapshot(root)).collect()
    }
}
