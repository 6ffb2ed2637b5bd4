//! Scene graph
//!
//! [`Scene`] owns every GameObject and component in generational arenas and
//! keeps the hierarchy consistent: a child is listed in its parent's
//! `children` exactly when its parent link points back, and an object with a
//! parent is never a root.
//!
//! Objects created with [`Scene::spawn`] start detached. Only roots and their
//! descendants take part in the update passes.

use std::collections::HashSet;

use log::{debug, trace, warn};
use serde::{Serialize, Deserialize};

use super::commands::{SceneCommand, SceneCommands};
use super::component::{Component, ComponentContext, ComponentId, ComponentSlot};
use super::game_object::{GameObject, ObjectId};
use super::identity::{IdError, IdStrategy, IdentityRegistry};
use super::properties::{PropertyBag, PropertyError, PropertyValue};
use crate::foundation::collections::{ComponentArena, ComponentKey, ObjectArena, ObjectKey};
use crate::foundation::time::FrameTime;
use crate::input::InputSnapshot;

/// How update passes treat the subtree of a disabled GameObject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TraversalPolicy {
    /// A disabled object hides its whole subtree
    #[default]
    SkipDisabledSubtrees,
    /// A disabled object only silences its own components
    VisitChildrenOfDisabled,
}

/// Scene errors
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// The id belonged to an object or component that was destroyed
    #[error("id {0} has been destroyed")]
    Destroyed(u64),

    /// No GameObject has this id
    #[error("unknown {0}")]
    UnknownObject(ObjectId),

    /// No component has this id
    #[error("unknown {0}")]
    UnknownComponent(ComponentId),

    /// The object was destroyed before
    #[error("id {0} destroyed twice")]
    DoubleDestroy(u64),

    /// The child already has a different parent
    #[error("{child} already has parent {parent}")]
    AlreadyParented {
        /// Child being attached
        child: ObjectId,
        /// Its current parent
        parent: ObjectId,
    },

    /// The link would make an object its own ancestor
    #[error("attaching {child} to {parent} would create a cycle")]
    HierarchyCycle {
        /// Child being attached
        child: ObjectId,
        /// Requested parent
        parent: ObjectId,
    },

    /// Identity registry error
    #[error("identity error: {0}")]
    Id(#[from] IdError),

    /// Property error
    #[error("property error: {0}")]
    Property(#[from] PropertyError),
}

impl SceneError {
    /// Whether the error must stop the scheduler
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DoubleDestroy(_) | Self::Id(IdError::Exhausted))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Object(ObjectKey),
    Component(ComponentKey),
}

/// Owner of the GameObject hierarchy and its components
pub struct Scene {
    objects: ObjectArena<GameObject>,
    components: ComponentArena<ComponentSlot>,
    registry: IdentityRegistry<Entry>,
    roots: Vec<ObjectKey>,
    traversal: TraversalPolicy,
    time: FrameTime,
    input: InputSnapshot,
    commands: SceneCommands,
    destroyed_since_apply: HashSet<ObjectId>,
    applying: bool,
    version: u64,
    stop_requested: bool,
    pass_order: Vec<ComponentKey>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(TraversalPolicy::default(), IdStrategy::default())
    }
}

impl Scene {
    /// Create an empty scene
    pub fn new(traversal: TraversalPolicy, id_strategy: IdStrategy) -> Self {
        Self {
            objects: ObjectArena::with_key(),
            components: ComponentArena::with_key(),
            registry: IdentityRegistry::new(id_strategy),
            roots: Vec::new(),
            traversal,
            time: FrameTime::default(),
            input: InputSnapshot::default(),
            commands: SceneCommands::new(),
            destroyed_since_apply: HashSet::new(),
            applying: false,
            version: 0,
            stop_requested: false,
            pass_order: Vec::new(),
        }
    }

    /// Active traversal policy
    pub fn traversal(&self) -> TraversalPolicy {
        self.traversal
    }

    /// Change the traversal policy
    pub fn set_traversal(&mut self, traversal: TraversalPolicy) {
        self.mark_dirty();
        self.traversal = traversal;
    }

    // ------------------------------------------------------------------
    // Id resolution
    // ------------------------------------------------------------------

    fn object_key(&self, id: ObjectId) -> Result<ObjectKey, SceneError> {
        match self.registry.lookup(id.0) {
            Some(Entry::Object(key)) => Ok(key),
            Some(Entry::Component(_)) => Err(SceneError::UnknownObject(id)),
            None if self.registry.is_retired(id.0) => Err(SceneError::Destroyed(id.0)),
            None => Err(SceneError::UnknownObject(id)),
        }
    }

    fn component_key(&self, id: ComponentId) -> Result<ComponentKey, SceneError> {
        match self.registry.lookup(id.0) {
            Some(Entry::Component(key)) => Ok(key),
            Some(Entry::Object(_)) => Err(SceneError::UnknownComponent(id)),
            None if self.registry.is_retired(id.0) => Err(SceneError::Destroyed(id.0)),
            None => Err(SceneError::UnknownComponent(id)),
        }
    }

    fn node(&self, id: ObjectId) -> Result<&GameObject, SceneError> {
        let key = self.object_key(id)?;
        self.objects.get(key).ok_or(SceneError::UnknownObject(id))
    }

    fn node_mut(&mut self, id: ObjectId) -> Result<&mut GameObject, SceneError> {
        let key = self.object_key(id)?;
        self.mark_dirty();
        self.objects.get_mut(key).ok_or(SceneError::UnknownObject(id))
    }

    fn slot(&self, id: ComponentId) -> Result<&ComponentSlot, SceneError> {
        let key = self.component_key(id)?;
        self.components.get(key).ok_or(SceneError::UnknownComponent(id))
    }

    fn slot_mut(&mut self, id: ComponentId) -> Result<&mut ComponentSlot, SceneError> {
        let key = self.component_key(id)?;
        self.mark_dirty();
        self.components.get_mut(key).ok_or(SceneError::UnknownComponent(id))
    }

    fn id_of(&self, key: ObjectKey) -> Option<ObjectId> {
        self.objects.get(key).map(GameObject::id)
    }

    fn ids_of(&self, keys: &[ObjectKey]) -> Vec<ObjectId> {
        keys.iter().filter_map(|key| self.id_of(*key)).collect()
    }

    /// Change counter for hosts that cache work per scene state
    ///
    /// Bumped by every structural or state mutation made through the scene.
    /// Components editing their own properties inside a hook do not bump it;
    /// call [`Self::mark_dirty`] for changes the counter should see. Wraps on
    /// overflow.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Record a change the scene cannot observe by itself
    pub fn mark_dirty(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    // ------------------------------------------------------------------
    // Creation and roots
    // ------------------------------------------------------------------

    /// Create a detached GameObject
    pub fn spawn(&mut self, name: impl Into<String>) -> Result<ObjectId, SceneError> {
        let id = ObjectId(self.registry.generate_id()?);
        let key = self.objects.insert(GameObject::new(id, name.into()));
        if let Err(err) = self.registry.register(id.0, Entry::Object(key)) {
            self.registry.release(id.0);
            self.objects.remove(key);
            return Err(err.into());
        }
        self.mark_dirty();
        trace!("Spawned {}", id);
        Ok(id)
    }

    /// Create a GameObject and append it to the root list
    pub fn spawn_root(&mut self, name: impl Into<String>) -> Result<ObjectId, SceneError> {
        let id = self.spawn(name)?;
        self.add_root(id)?;
        Ok(id)
    }

    /// Append a parentless GameObject to the root list
    ///
    /// Adding an existing root again is a no-op.
    pub fn add_root(&mut self, id: ObjectId) -> Result<(), SceneError> {
        let key = self.object_key(id)?;
        if let Some(parent) = self.objects.get(key).and_then(|node| node.parent) {
            let parent = self.id_of(parent).ok_or(SceneError::UnknownObject(id))?;
            return Err(SceneError::AlreadyParented { child: id, parent });
        }
        if !self.roots.contains(&key) {
            self.roots.push(key);
            self.mark_dirty();
        }
        Ok(())
    }

    /// Remove a GameObject from the root list without destroying it
    pub fn remove_root(&mut self, id: ObjectId) -> Result<bool, SceneError> {
        let key = self.object_key(id)?;
        let before = self.roots.len();
        self.roots.retain(|root| *root != key);
        let removed = self.roots.len() != before;
        if removed {
            self.mark_dirty();
        }
        Ok(removed)
    }

    /// Whether the GameObject is in the root list
    pub fn is_root(&self, id: ObjectId) -> Result<bool, SceneError> {
        let key = self.object_key(id)?;
        Ok(self.roots.contains(&key))
    }

    /// Root objects in traversal order
    pub fn roots(&self) -> Vec<ObjectId> {
        self.ids_of(&self.roots)
    }

    /// First root with the given name
    pub fn find_root_by_name(&self, name: &str) -> Option<ObjectId> {
        self.roots
            .iter()
            .filter_map(|key| self.objects.get(*key))
            .find(|node| node.name == name)
            .map(GameObject::id)
    }

    // ------------------------------------------------------------------
    // Hierarchy
    // ------------------------------------------------------------------

    /// Whether `ancestor` is `key` or one of its ancestors
    fn is_ancestor_or_self(&self, ancestor: ObjectKey, key: ObjectKey) -> bool {
        let mut current = Some(key);
        while let Some(node_key) = current {
            if node_key == ancestor {
                return true;
            }
            current = self.objects.get(node_key).and_then(|node| node.parent);
        }
        false
    }

    fn link(&mut self, parent: ObjectKey, child: ObjectKey) {
        self.mark_dirty();
        self.roots.retain(|root| *root != child);
        if let Some(node) = self.objects.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.objects.get_mut(parent) {
            node.children.push(child);
        }
    }

    /// Break the parent link of `child`; root membership is untouched
    fn unlink_parent(&mut self, child: ObjectKey) -> Option<ObjectKey> {
        let parent = self.objects.get_mut(child)?.parent.take()?;
        self.mark_dirty();
        if let Some(node) = self.objects.get_mut(parent) {
            node.children.retain(|key| *key != child);
        }
        Some(parent)
    }

    /// Attach `child` under `parent`
    ///
    /// Attaching to the current parent is a no-op. A root child leaves the
    /// root list.
    pub fn add_child(&mut self, parent: ObjectId, child: ObjectId) -> Result<(), SceneError> {
        let parent_key = self.object_key(parent)?;
        let child_key = self.object_key(child)?;

        if let Some(current) = self.objects.get(child_key).and_then(|node| node.parent) {
            if current == parent_key {
                return Ok(());
            }
            let current = self.id_of(current).ok_or(SceneError::UnknownObject(child))?;
            return Err(SceneError::AlreadyParented { child, parent: current });
        }
        if self.is_ancestor_or_self(child_key, parent_key) {
            return Err(SceneError::HierarchyCycle { child, parent });
        }

        self.link(parent_key, child_key);
        trace!("Attached {} under {}", child, parent);
        Ok(())
    }

    /// Move `child` under `parent`, or detach it from its parent with `None`
    pub fn set_parent(&mut self, child: ObjectId, parent: Option<ObjectId>) -> Result<(), SceneError> {
        let child_key = self.object_key(child)?;
        let Some(parent) = parent else {
            self.unlink_parent(child_key);
            return Ok(());
        };

        let parent_key = self.object_key(parent)?;
        let current = self.objects.get(child_key).and_then(|node| node.parent);
        if current == Some(parent_key) {
            return Ok(());
        }
        if self.is_ancestor_or_self(child_key, parent_key) {
            return Err(SceneError::HierarchyCycle { child, parent });
        }

        self.unlink_parent(child_key);
        self.link(parent_key, child_key);
        Ok(())
    }

    /// Detach `child` from `parent` without destroying it
    ///
    /// Returns `None` when `child` is not a direct child of `parent`.
    pub fn remove_child(&mut self, parent: ObjectId, child: ObjectId) -> Result<Option<ObjectId>, SceneError> {
        let parent_key = self.object_key(parent)?;
        let child_key = self.object_key(child)?;
        if self.objects.get(child_key).and_then(|node| node.parent) != Some(parent_key) {
            return Ok(None);
        }
        self.unlink_parent(child_key);
        Ok(Some(child))
    }

    /// Detach the first direct child named `name`
    pub fn remove_child_by_name(&mut self, parent: ObjectId, name: &str) -> Result<Option<ObjectId>, SceneError> {
        let found = self
            .node(parent)?
            .children
            .iter()
            .copied()
            .find(|key| self.objects.get(*key).is_some_and(|node| node.name == name));

        Ok(found.and_then(|key| {
            self.unlink_parent(key);
            self.id_of(key)
        }))
    }

    fn find_descendant(&self, key: ObjectKey, matches: &dyn Fn(&GameObject) -> bool, recursive: bool) -> Option<ObjectId> {
        let node = self.objects.get(key)?;
        for child_key in &node.children {
            let Some(child) = self.objects.get(*child_key) else { continue };
            if matches(child) {
                return Some(child.id);
            }
            if recursive {
                if let Some(found) = self.find_descendant(*child_key, matches, true) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Pre-order search for a descendant named `name`
    pub fn find_child_by_name(&self, parent: ObjectId, name: &str, recursive: bool) -> Result<Option<ObjectId>, SceneError> {
        let key = self.object_key(parent)?;
        Ok(self.find_descendant(key, &|node: &GameObject| node.name == name, recursive))
    }

    /// Pre-order search for a descendant with id `id`
    pub fn find_child_by_id(&self, parent: ObjectId, id: ObjectId, recursive: bool) -> Result<Option<ObjectId>, SceneError> {
        let key = self.object_key(parent)?;
        Ok(self.find_descendant(key, &|node: &GameObject| node.id == id, recursive))
    }

    /// Parent of a GameObject
    pub fn parent(&self, id: ObjectId) -> Result<Option<ObjectId>, SceneError> {
        Ok(self.node(id)?.parent.and_then(|key| self.id_of(key)))
    }

    /// Direct children in insertion order
    pub fn children(&self, id: ObjectId) -> Result<Vec<ObjectId>, SceneError> {
        Ok(self.ids_of(&self.node(id)?.children))
    }

    // ------------------------------------------------------------------
    // Object state
    // ------------------------------------------------------------------

    /// Read view of a live GameObject
    pub fn object(&self, id: ObjectId) -> Option<&GameObject> {
        self.node(id).ok()
    }

    /// Whether the id names a live GameObject
    pub fn contains(&self, id: ObjectId) -> bool {
        self.object_key(id).is_ok()
    }

    /// Name of a GameObject
    pub fn name(&self, id: ObjectId) -> Result<&str, SceneError> {
        Ok(&self.node(id)?.name)
    }

    /// Rename a GameObject
    pub fn set_name(&mut self, id: ObjectId, name: impl Into<String>) -> Result<(), SceneError> {
        self.node_mut(id)?.name = name.into();
        Ok(())
    }

    /// Local enabled flag
    pub fn is_enabled(&self, id: ObjectId) -> Result<bool, SceneError> {
        Ok(self.node(id)?.enabled)
    }

    /// Set the local enabled flag; descendants keep their own flags
    pub fn set_enabled(&mut self, id: ObjectId, enabled: bool) -> Result<(), SceneError> {
        self.node_mut(id)?.enabled = enabled;
        Ok(())
    }

    /// Whether the object and all of its ancestors are enabled
    pub fn is_active_in_hierarchy(&self, id: ObjectId) -> Result<bool, SceneError> {
        let mut current = Some(self.object_key(id)?);
        while let Some(key) = current {
            let Some(node) = self.objects.get(key) else { break };
            if !node.enabled {
                return Ok(false);
            }
            current = node.parent;
        }
        Ok(true)
    }

    /// Number of live GameObjects, detached ones included
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of live components
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    // ------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------

    fn insert_component(
        &mut self,
        owner_key: ObjectKey,
        owner: ObjectId,
        name: String,
        enabled: bool,
        properties: PropertyBag,
        behaviour: Box<dyn Component>,
    ) -> Result<ComponentId, SceneError> {
        let id = ComponentId(self.registry.generate_id()?);
        let key = self.components.insert(ComponentSlot { id, name, enabled, owner, properties, behaviour });
        if let Err(err) = self.registry.register(id.0, Entry::Component(key)) {
            self.registry.release(id.0);
            self.components.remove(key);
            return Err(err.into());
        }
        if let Some(node) = self.objects.get_mut(owner_key) {
            node.components.push(key);
        }
        self.mark_dirty();

        if let Some(slot) = self.components.get_mut(key) {
            trace!("Starting {} '{}' on {}", id, slot.name, owner);
            slot.invoke(&self.time, &self.input, &mut self.commands, |component, ctx| component.start(ctx));
        }
        Ok(id)
    }

    /// Attach a component and call its `start` hook
    pub fn add_component(
        &mut self,
        owner: ObjectId,
        name: impl Into<String>,
        component: Box<dyn Component>,
    ) -> Result<ComponentId, SceneError> {
        let owner_key = self.object_key(owner)?;
        let mut properties = PropertyBag::new();
        component.declare_properties(&mut properties);
        self.insert_component(owner_key, owner, name.into(), true, properties, component)
    }

    /// Typed form of [`Self::add_component`]
    pub fn attach<C: Component>(&mut self, owner: ObjectId, name: impl Into<String>, component: C) -> Result<ComponentId, SceneError> {
        self.add_component(owner, name, Box::new(component))
    }

    /// First component on `owner` with the given name
    pub fn get_component(&self, owner: ObjectId, name: &str) -> Result<Option<ComponentId>, SceneError> {
        Ok(self
            .node(owner)?
            .components
            .iter()
            .filter_map(|key| self.components.get(*key))
            .find(|slot| slot.name == name)
            .map(|slot| slot.id))
    }

    /// `id` if it is attached to `owner`
    pub fn get_component_by_id(&self, owner: ObjectId, id: ComponentId) -> Result<Option<ComponentId>, SceneError> {
        self.node(owner)?;
        Ok(self.slot(id).ok().filter(|slot| slot.owner == owner).map(|slot| slot.id))
    }

    /// First component on `owner` of concrete type `T`
    pub fn find_component<T: Component>(&self, owner: ObjectId) -> Result<Option<ComponentId>, SceneError> {
        Ok(self
            .node(owner)?
            .components
            .iter()
            .filter_map(|key| self.components.get(*key))
            .find(|slot| slot.behaviour.as_any().is::<T>())
            .map(|slot| slot.id))
    }

    /// Components of `owner` in attach order
    pub fn components(&self, owner: ObjectId) -> Result<Vec<ComponentId>, SceneError> {
        Ok(self
            .node(owner)?
            .components
            .iter()
            .filter_map(|key| self.components.get(*key))
            .map(|slot| slot.id)
            .collect())
    }

    /// Downcast a component to `T`; `None` when it has another type
    pub fn component<T: Component>(&self, id: ComponentId) -> Result<Option<&T>, SceneError> {
        Ok(self.slot(id)?.behaviour.as_any().downcast_ref::<T>())
    }

    /// Mutable downcast of a component to `T`
    pub fn component_mut<T: Component>(&mut self, id: ComponentId) -> Result<Option<&mut T>, SceneError> {
        Ok(self.slot_mut(id)?.behaviour.as_any_mut().downcast_mut::<T>())
    }

    /// Name given when the component was attached
    pub fn component_name(&self, id: ComponentId) -> Result<&str, SceneError> {
        Ok(&self.slot(id)?.name)
    }

    /// Type name reported by the component
    pub fn component_type_name(&self, id: ComponentId) -> Result<&'static str, SceneError> {
        Ok(self.slot(id)?.behaviour.type_name())
    }

    /// GameObject a component is attached to
    pub fn component_owner(&self, id: ComponentId) -> Result<ObjectId, SceneError> {
        Ok(self.slot(id)?.owner)
    }

    /// Local enabled flag of a component
    pub fn is_component_enabled(&self, id: ComponentId) -> Result<bool, SceneError> {
        Ok(self.slot(id)?.enabled)
    }

    /// Enable or disable a single component
    pub fn set_component_enabled(&mut self, id: ComponentId, enabled: bool) -> Result<(), SceneError> {
        self.slot_mut(id)?.enabled = enabled;
        Ok(())
    }

    /// Property bag of a component
    pub fn properties(&self, id: ComponentId) -> Result<&PropertyBag, SceneError> {
        Ok(&self.slot(id)?.properties)
    }

    /// Mutable property bag of a component
    pub fn properties_mut(&mut self, id: ComponentId) -> Result<&mut PropertyBag, SceneError> {
        Ok(&mut self.slot_mut(id)?.properties)
    }

    /// Read one property
    pub fn get_property(&self, id: ComponentId, name: &str) -> Result<&PropertyValue, SceneError> {
        self.properties(id)?
            .get(name)
            .ok_or_else(|| PropertyError::Unknown(name.to_string()).into())
    }

    /// Write one property; the value must match the declared type
    pub fn set_property(&mut self, id: ComponentId, name: &str, value: impl Into<PropertyValue>) -> Result<(), SceneError> {
        self.properties_mut(id)?.set(name, value)?;
        Ok(())
    }

    fn destroy_component(&mut self, key: ComponentKey) {
        let Some(mut slot) = self.components.remove(key) else { return };
        self.registry.unregister(slot.id.0);
        self.mark_dirty();
        trace!("Destroying {} '{}'", slot.id, slot.name);
        slot.invoke(&self.time, &self.input, &mut self.commands, |component, ctx| component.on_destroy(ctx));
    }

    /// Detach a component, call its `on_destroy` hook and release it
    pub fn remove_component(&mut self, id: ComponentId) -> Result<(), SceneError> {
        let key = self.component_key(id)?;
        let owner = self.slot(id)?.owner;
        if let Ok(node) = self.node_mut(owner) {
            node.components.retain(|component| *component != key);
        }
        self.destroy_component(key);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Destruction and cloning
    // ------------------------------------------------------------------

    /// Teardown: the node's components, then its children, then the node
    fn destroy_subtree(&mut self, key: ObjectKey) {
        let Some(node) = self.objects.get_mut(key) else { return };
        let children = std::mem::take(&mut node.children);
        let components = std::mem::take(&mut node.components);

        for component in components {
            self.destroy_component(component);
        }
        for child in children {
            self.destroy_subtree(child);
        }
        if let Some(node) = self.objects.remove(key) {
            self.registry.unregister(node.id.0);
            self.mark_dirty();
            if self.applying {
                self.destroyed_since_apply.insert(node.id);
            }
        }
    }

    /// Destroy a GameObject with its components and descendants
    ///
    /// Every component in the subtree receives `on_destroy` exactly once. An
    /// object's own components go before its children's.
    /// Destroying the same id again is [`SceneError::DoubleDestroy`].
    pub fn destroy(&mut self, id: ObjectId) -> Result<(), SceneError> {
        if self.registry.is_retired(id.0) {
            return Err(SceneError::DoubleDestroy(id.0));
        }
        let key = self.object_key(id)?;
        let parent = self.objects.get(key).and_then(|node| node.parent);

        let before = self.objects.len();
        self.destroy_subtree(key);

        match parent {
            Some(parent) => {
                if let Some(node) = self.objects.get_mut(parent) {
                    node.children.retain(|child| *child != key);
                }
            }
            None => self.roots.retain(|root| *root != key),
        }
        debug!("Destroyed {} ({} objects)", id, before - self.objects.len());
        Ok(())
    }

    /// Destroy every root and every detached object
    pub fn clear(&mut self) {
        let roots = std::mem::take(&mut self.roots);
        let detached: Vec<ObjectKey> = self
            .objects
            .iter()
            .filter(|(key, node)| node.parent.is_none() && !roots.contains(key))
            .map(|(key, _)| key)
            .collect();
        for key in roots.into_iter().chain(detached) {
            self.destroy_subtree(key);
        }
        debug!("Scene cleared");
    }

    fn clone_subtree(
        &mut self,
        source: ObjectKey,
        parent: Option<ObjectKey>,
        copy_root: &mut Option<ObjectKey>,
    ) -> Result<ObjectId, SceneError> {
        let Some(node) = self.objects.get(source) else {
            return Err(SceneError::UnknownObject(ObjectId(0)));
        };
        let name = node.name.clone();
        let enabled = node.enabled;
        let children = node.children.clone();
        let components = node.components.clone();

        let id = self.spawn(name)?;
        let key = self.object_key(id)?;
        copy_root.get_or_insert(key);
        if let Some(node) = self.objects.get_mut(key) {
            node.enabled = enabled;
        }
        if let Some(parent) = parent {
            self.link(parent, key);
        }

        for component in components {
            let Some(slot) = self.components.get(component) else { continue };
            let name = slot.name.clone();
            let enabled = slot.enabled;
            let properties = slot.properties.clone();
            let behaviour = slot.behaviour.clone_boxed();
            self.insert_component(key, id, name, enabled, properties, behaviour)?;
        }
        for child in children {
            self.clone_subtree(child, Some(key), copy_root)?;
        }
        Ok(id)
    }

    /// Deep copy a GameObject with fresh ids throughout
    ///
    /// The copy is detached. Cloned components receive `start`. If the copy
    /// cannot be completed, the part already built is destroyed again.
    pub fn clone_object(&mut self, id: ObjectId) -> Result<ObjectId, SceneError> {
        let key = self.object_key(id)?;
        let mut copy_root = None;
        match self.clone_subtree(key, None, &mut copy_root) {
            Ok(copy) => {
                debug!("Cloned {} into {}", id, copy);
                Ok(copy)
            }
            Err(err) => {
                if let Some(partial) = copy_root {
                    warn!("Cloning {} failed, discarding the partial copy: {}", id, err);
                    self.destroy_subtree(partial);
                }
                Err(err)
            }
        }
    }

    // ------------------------------------------------------------------
    // Passes
    // ------------------------------------------------------------------

    /// Install the timing and input seen by hooks this frame
    pub fn begin_frame(&mut self, time: FrameTime, input: InputSnapshot) {
        self.time = time;
        self.input = input;
    }

    /// Replace the timing seen by hooks, e.g. between fixed steps
    pub fn set_time(&mut self, time: FrameTime) {
        self.time = time;
    }

    /// Timing of the current frame
    pub fn time(&self) -> &FrameTime {
        &self.time
    }

    /// Input of the current frame
    pub fn input(&self) -> &InputSnapshot {
        &self.input
    }

    /// Components that run this pass, in pre-order
    fn collect_active(&self, out: &mut Vec<ComponentKey>) {
        let mut stack: Vec<ObjectKey> = self.roots.iter().rev().copied().collect();
        while let Some(key) = stack.pop() {
            let Some(node) = self.objects.get(key) else { continue };
            if node.enabled {
                out.extend(
                    node.components
                        .iter()
                        .copied()
                        .filter(|component| self.components.get(*component).is_some_and(|slot| slot.enabled)),
                );
            } else if self.traversal == TraversalPolicy::SkipDisabledSubtrees {
                continue;
            }
            stack.extend(node.children.iter().rev().copied());
        }
    }

    fn run_pass<F>(&mut self, mut hook: F)
    where
        F: FnMut(&mut dyn Component, &mut ComponentContext<'_>),
    {
        let mut order = std::mem::take(&mut self.pass_order);
        order.clear();
        self.collect_active(&mut order);

        for key in &order {
            if let Some(slot) = self.components.get_mut(*key) {
                slot.invoke(&self.time, &self.input, &mut self.commands, &mut hook);
            }
        }
        self.pass_order = order;
    }

    /// Variable-rate pass, then apply queued commands
    pub fn update(&mut self, dt: f64) -> Result<(), SceneError> {
        self.run_pass(|component, ctx| component.update(ctx, dt));
        self.apply_commands()
    }

    /// One fixed step, then apply queued commands
    pub fn fixed_update(&mut self, step: f64) -> Result<(), SceneError> {
        self.run_pass(|component, ctx| component.fixed_update(ctx, step));
        self.apply_commands()
    }

    /// Direct access to the command buffer for code outside a pass
    pub fn commands(&mut self) -> &mut SceneCommands {
        &mut self.commands
    }

    /// Apply every queued command, including commands queued while applying
    ///
    /// Repeated destroys of an object already destroyed since the previous
    /// call are dropped. A destroy of an object retired earlier than that is
    /// [`SceneError::DoubleDestroy`]. Other rejected commands are logged and
    /// skipped.
    pub fn apply_commands(&mut self) -> Result<(), SceneError> {
        self.applying = true;
        let result = self.drain_commands();
        self.applying = false;
        self.destroyed_since_apply.clear();
        result
    }

    fn drain_commands(&mut self) -> Result<(), SceneError> {
        loop {
            let batch = self.commands.take();
            if batch.is_empty() {
                return Ok(());
            }
            for command in batch {
                let result = match command {
                    SceneCommand::Destroy(id) if self.destroyed_since_apply.contains(&id) => {
                        trace!("Dropping repeated destroy of {}", id);
                        Ok(())
                    }
                    SceneCommand::Destroy(id) => self.destroy(id),
                    SceneCommand::SetObjectEnabled(id, enabled) => self.set_enabled(id, enabled),
                    SceneCommand::SetComponentEnabled(id, enabled) => self.set_component_enabled(id, enabled),
                    SceneCommand::Detach(id) => self.detach(id),
                    SceneCommand::RemoveComponent(id) => self.remove_component(id),
                    SceneCommand::RequestStop => {
                        self.stop_requested = true;
                        Ok(())
                    }
                };
                match result {
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => warn!("Rejected scene command {:?}: {}", command, err),
                    Ok(()) => {}
                }
            }
        }
    }

    /// Remove a GameObject from its parent or from the root list
    pub fn detach(&mut self, id: ObjectId) -> Result<(), SceneError> {
        let key = self.object_key(id)?;
        if self.unlink_parent(key).is_none() {
            self.roots.retain(|root| *root != key);
            self.mark_dirty();
        }
        Ok(())
    }

    /// Consume a stop request queued by a component
    pub fn take_stop_request(&mut self) -> bool {
        std::mem::take(&mut self.stop_requested)
    }
}
