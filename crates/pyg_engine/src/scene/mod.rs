//! Scene management
//!
//! The GameObject hierarchy, the component contract and everything the
//! scene needs to run them.
//!
//! ## Architecture
//!
//! ```text
//! Scene
//!  ├── IdentityRegistry  (u64 id → arena key, shared by objects and components)
//!  ├── ObjectArena       (GameObject nodes: name, enabled, parent, children)
//!  ├── ComponentArena    (ComponentSlot: behaviour + PropertyBag)
//!  └── SceneCommands     (mutations queued by components during a pass)
//! ```

mod commands;
mod component;
mod game_object;
mod identity;
mod properties;
mod scene_graph;
mod snapshot;

pub use commands::{SceneCommand, SceneCommands};
pub use component::{Component, ComponentClone, ComponentContext, ComponentId};
pub use game_object::{GameObject, ObjectId};
pub use identity::{IdError, IdStrategy, IdentityRegistry, RETIRED_WINDOW};
pub use properties::{Property, PropertyBag, PropertyError, PropertyType, PropertyValue, TextureHandle};
pub use scene_graph::{Scene, SceneError, TraversalPolicy};
pub use snapshot::{ComponentSnapshot, ObjectSnapshot};
