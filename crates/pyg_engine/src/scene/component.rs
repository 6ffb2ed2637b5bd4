//! Component lifecycle contract
//!
//! A component is behaviour attached to exactly one GameObject. The scene
//! calls its hooks in a fixed order:
//!
//! 1. [`Component::declare_properties`] and [`Component::start`] once, when attached
//! 2. [`Component::update`] once per frame while it and its owner are enabled
//! 3. [`Component::fixed_update`] once per fixed simulation step, same condition
//! 4. [`Component::on_destroy`] once, when removed or when its owner is destroyed
//!
//! Every hook receives a [`ComponentContext`] instead of reaching for global
//! state.
//!
//! ```rust
//! use pyg_engine::prelude::*;
//!
//! #[derive(Clone, Default)]
//! struct Lifetime {
//!     remaining: f64,
//! }
//!
//! impl Component for Lifetime {
//!     fn declare_properties(&self, properties: &mut PropertyBag) {
//!         properties.declare("seconds", 2.0f32, true);
//!     }
//!
//!     fn start(&mut self, ctx: &mut ComponentContext<'_>) {
//!         self.remaining = f64::from(ctx.properties().get_as::<f32>("seconds").unwrap_or(0.0));
//!     }
//!
//!     fn update(&mut self, ctx: &mut ComponentContext<'_>, dt: f64) {
//!         self.remaining -= dt;
//!         if self.remaining <= 0.0 {
//!             ctx.destroy_owner();
//!         }
//!     }
//! }
//! ```

use std::any::Any;
use std::fmt;

use serde::{Serialize, Deserialize};

use super::commands::SceneCommands;
use super::game_object::ObjectId;
use super::properties::PropertyBag;
use crate::foundation::time::FrameTime;
use crate::input::InputSnapshot;

/// Public handle of an attached component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub u64);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// Behaviour attached to a GameObject
///
/// All hooks default to doing nothing. Implementors must be `Clone` so that
/// [`crate::scene::Scene::clone_object`] can deep-copy them.
pub trait Component: ComponentClone + 'static {
    /// Declare the component's properties before it starts
    ///
    /// Not called for clones; they inherit the source's current values.
    fn declare_properties(&self, _properties: &mut PropertyBag) {}

    /// Called once when attached
    fn start(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Called once per frame with the scaled variable delta
    fn update(&mut self, _ctx: &mut ComponentContext<'_>, _dt: f64) {}

    /// Called once per fixed step with the fixed step length
    fn fixed_update(&mut self, _ctx: &mut ComponentContext<'_>, _dt: f64) {}

    /// Called once when the component is destroyed
    fn on_destroy(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Human readable type name used in logs and snapshots
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Object-safe cloning and downcasting, implemented for every `Component + Clone`
pub trait ComponentClone {
    /// Deep copy behind a fresh box
    fn clone_boxed(&self) -> Box<dyn Component>;

    /// Upcast for downcasting by reference
    fn as_any(&self) -> &dyn Any;

    /// Upcast for downcasting by mutable reference
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component + Clone> ComponentClone for T {
    fn clone_boxed(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Clone for Box<dyn Component> {
    fn clone(&self) -> Self {
        self.clone_boxed()
    }
}

/// Everything a component hook may touch
pub struct ComponentContext<'a> {
    pub(crate) owner: ObjectId,
    pub(crate) id: ComponentId,
    pub(crate) name: &'a str,
    pub(crate) time: &'a FrameTime,
    pub(crate) input: &'a InputSnapshot,
    pub(crate) properties: &'a mut PropertyBag,
    pub(crate) commands: &'a mut SceneCommands,
}

impl ComponentContext<'_> {
    /// GameObject the component is attached to
    pub fn owner(&self) -> ObjectId {
        self.owner
    }

    /// Id of the component itself
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Name given at attach time
    pub fn name(&self) -> &str {
        self.name
    }

    /// Timing of the current frame or fixed step
    pub fn time(&self) -> &FrameTime {
        self.time
    }

    /// Input captured at the start of the frame
    pub fn input(&self) -> &InputSnapshot {
        self.input
    }

    /// The component's property bag
    pub fn properties(&self) -> &PropertyBag {
        self.properties
    }

    /// The component's property bag, mutably
    pub fn properties_mut(&mut self) -> &mut PropertyBag {
        self.properties
    }

    /// Deferred scene commands
    pub fn commands(&mut self) -> &mut SceneCommands {
        self.commands
    }

    /// Queue destruction of the owning GameObject
    pub fn destroy_owner(&mut self) {
        self.commands.destroy(self.owner);
    }

    /// Queue a scheduler stop
    pub fn request_stop(&mut self) {
        self.commands.request_stop();
    }
}

/// Arena storage for an attached component
pub(crate) struct ComponentSlot {
    pub id: ComponentId,
    pub name: String,
    pub enabled: bool,
    pub owner: ObjectId,
    pub properties: PropertyBag,
    pub behaviour: Box<dyn Component>,
}

impl ComponentSlot {
    /// Run one hook with a context borrowed from the scene's frame state
    pub fn invoke<F>(&mut self, time: &FrameTime, input: &InputSnapshot, commands: &mut SceneCommands, hook: F)
    where
        F: FnOnce(&mut dyn Component, &mut ComponentContext<'_>),
    {
        let Self { id, name, owner, properties, behaviour, .. } = self;
        let mut ctx = ComponentContext {
            owner: *owner,
            id: *id,
            name: name.as_str(),
            time,
            input,
            properties,
            commands,
        };
        hook(behaviour.as_mut(), &mut ctx);
    }
}

impl fmt::Debug for ComponentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSlot")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("type", &self.behaviour.type_name())
            .field("enabled", &self.enabled)
            .field("owner", &self.owner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Counter {
        updates: u32,
    }

    impl Component for Counter {
        fn update(&mut self, ctx: &mut ComponentContext<'_>, _dt: f64) {
            self.updates += 1;
            if self.updates == 2 {
                ctx.request_stop();
            }
        }
    }

    fn slot(behaviour: Box<dyn Component>) -> ComponentSlot {
        ComponentSlot {
            id: ComponentId(7),
            name: "counter".to_string(),
            enabled: true,
            owner: ObjectId(1),
            properties: PropertyBag::new(),
            behaviour,
        }
    }

    #[test]
    fn test_invoke_builds_context() {
        let time = FrameTime::default();
        let input = InputSnapshot::empty();
        let mut commands = SceneCommands::new();
        let mut slot = slot(Box::new(Counter::default()));

        for _ in 0..2 {
            slot.invoke(&time, &input, &mut commands, |component, ctx| {
                assert_eq!(ctx.owner(), ObjectId(1));
                assert_eq!(ctx.id(), ComponentId(7));
                assert_eq!(ctx.name(), "counter");
                component.update(ctx, 0.1);
            });
        }

        assert_eq!(commands.len(), 1);
        let counter = slot.behaviour.as_any().downcast_ref::<Counter>().unwrap();
        assert_eq!(counter.updates, 2);
    }

    #[test]
    fn test_boxed_clone_is_independent() {
        let mut original: Box<dyn Component> = Box::new(Counter { updates: 5 });
        let copy = original.clone();

        original.as_any_mut().downcast_mut::<Counter>().unwrap().updates = 9;

        assert_eq!(copy.as_any().downcast_ref::<Counter>().unwrap().updates, 5);
        assert!(copy.type_name().ends_with("Counter"));
    }
}
