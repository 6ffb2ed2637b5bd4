//! # Pyg Engine
//!
//! Runtime core of a small real-time simulation and game engine.
//!
//! ## Features
//!
//! - **Scene Hierarchy**: GameObjects owned by a scene arena, with parent and
//!   child links that always agree
//! - **Component Lifecycle**: `start`, `update`, `fixed_update` and
//!   `on_destroy` hooks with an explicit context and typed properties
//! - **Fixed Timestep**: a deterministic accumulator under variable frame
//!   deltas, time scaling and pause
//! - **Headless Mode**: run simulations without a renderer, optionally faster
//!   than real time
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pyg_engine::prelude::*;
//!
//! #[derive(Clone)]
//! struct Spinner {
//!     angle: f64,
//! }
//!
//! impl Component for Spinner {
//!     fn fixed_update(&mut self, _ctx: &mut ComponentContext<'_>, dt: f64) {
//!         self.angle += 90.0 * dt;
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::new().with_headless(true).with_max_frames(600);
//!     let mut engine = Engine::new(config)?;
//!
//!     let root = engine.scene_mut().spawn_root("spinner")?;
//!     engine.scene_mut().attach(root, "spin", Spinner { angle: 0.0 })?;
//!
//!     engine.start()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;
pub mod config;

pub mod foundation;
pub mod scene;
pub mod render;
pub mod input;
pub mod events;

mod engine;

#[cfg(test)]
mod engine_tests;

pub use engine::{Engine, EngineError, EngineState, FrameReport};
pub use core::config::{EngineConfig, WindowConfig};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        Engine, EngineConfig, EngineError, EngineState, FrameReport, WindowConfig,
        config::Config,
        events::{EngineCommand, EngineHandle},
        foundation::{
            math::{Color, Vec2, Vec2i, Vec3, Vec3i, Vec4},
            time::{Clock, FrameTime, ManualClock, SystemClock},
        },
        scene::{
            Component, ComponentContext, ComponentId, IdStrategy, ObjectId, PropertyBag, PropertyValue,
            Scene, SceneError, TraversalPolicy,
        },
        render::{Renderer, RendererError},
        input::{InputSnapshot, KeyCode, MouseButton},
    };
}
