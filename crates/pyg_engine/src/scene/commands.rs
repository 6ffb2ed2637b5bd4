//! Deferred scene mutations
//!
//! Components run while the scene is being traversed, so they cannot change
//! the hierarchy directly. They queue [`SceneCommand`]s instead, and the scene
//! applies the queue once the current pass has finished.

use super::component::ComponentId;
use super::game_object::ObjectId;

/// A queued change to the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    /// Destroy a GameObject and its subtree
    Destroy(ObjectId),
    /// Enable or disable a GameObject
    SetObjectEnabled(ObjectId, bool),
    /// Enable or disable a component
    SetComponentEnabled(ComponentId, bool),
    /// Detach a GameObject from its parent or the root list
    Detach(ObjectId),
    /// Detach and destroy a single component
    RemoveComponent(ComponentId),
    /// Ask the scheduler to stop after this frame
    RequestStop,
}

/// Command buffer filled by components during a pass
#[derive(Debug, Default)]
pub struct SceneCommands {
    queue: Vec<SceneCommand>,
}

impl SceneCommands {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue destruction of `object`
    pub fn destroy(&mut self, object: ObjectId) {
        self.queue.push(SceneCommand::Destroy(object));
    }

    /// Queue an enabled-flag change for `object`
    pub fn set_enabled(&mut self, object: ObjectId, enabled: bool) {
        self.queue.push(SceneCommand::SetObjectEnabled(object, enabled));
    }

    /// Queue an enabled-flag change for `component`
    pub fn set_component_enabled(&mut self, component: ComponentId, enabled: bool) {
        self.queue.push(SceneCommand::SetComponentEnabled(component, enabled));
    }

    /// Queue detaching `object` from its parent
    pub fn detach(&mut self, object: ObjectId) {
        self.queue.push(SceneCommand::Detach(object));
    }

    /// Queue removal of `component`
    pub fn remove_component(&mut self, component: ComponentId) {
        self.queue.push(SceneCommand::RemoveComponent(component));
    }

    /// Ask the scheduler to stop
    pub fn request_stop(&mut self) {
        self.queue.push(SceneCommand::RequestStop);
    }

    /// Queued commands in submission order
    pub fn pending(&self) -> &[SceneCommand] {
        &self.queue
    }

    /// Number of queued commands
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn take(&mut self) -> Vec<SceneCommand> {
        std::mem::take(&mut self.queue)
    }
}
