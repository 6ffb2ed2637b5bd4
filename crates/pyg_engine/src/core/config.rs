//! # Engine Configuration
//!
//! Serializable settings the frame scheduler is built from. A host (CLI,
//! embedding application, test) constructs an [`EngineConfig`], usually via
//! the builder methods or [`Config::load_from_file`], and hands it to
//! [`crate::Engine::new`].
//!
//! ## Example
//!
//! ```toml
//! tick_rate = 50
//! time_scale = 10.0
//! headless = true
//! max_frames = 5000
//! traversal = "SkipDisabledSubtrees"
//!
//! [window]
//! title = "Snake"
//! width = 800
//! height = 600
//! ```

use serde::{Serialize, Deserialize};

use crate::config::{Config, ConfigError};
use crate::foundation::logging;
use crate::scene::{IdStrategy, TraversalPolicy};

/// # Window Configuration
///
/// Pass-through settings applied to the renderer when it is acquired.
/// The core never reads them back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Client area width in pixels
    pub width: u32,
    /// Client area height in pixels
    pub height: u32,
    /// Initial top-left position, or platform default
    pub position: Option<(i32, i32)>,
    /// Vertical sync
    pub vsync: bool,
    /// Renderer-side frame limit, independent of the scheduler's pacing
    pub framerate_limit: Option<u32>,
    /// Whether the mouse cursor is visible
    pub cursor_visible: bool,
    /// Whether the mouse cursor is confined to the window
    pub cursor_grabbed: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "pyg engine".to_string(),
            width: 1280,
            height: 720,
            position: None,
            vsync: false,
            framerate_limit: None,
            cursor_visible: true,
            cursor_grabbed: false,
        }
    }
}

impl WindowConfig {
    /// Set the window title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the client area size
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Enable or disable vertical sync
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }
}

/// # Engine Configuration
///
/// Core scheduler behaviour: tick rate, time scale, headless mode, pacing
/// and traversal rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed simulation ticks per second; the fixed step is `1 / tick_rate`
    pub tick_rate: u32,
    /// Initial multiplier applied to real elapsed time
    pub time_scale: f64,
    /// Skip renderer acquisition and presentation entirely
    pub headless: bool,
    /// Upper bound on frames per second; `None` runs uncapped
    pub frame_rate_cap: Option<u32>,
    /// Upper bound on fixed steps per frame; excess steps stay queued
    pub max_fixed_steps_per_frame: Option<u32>,
    /// Clamp applied to a single frame's real delta, in seconds
    pub max_frame_delta: Option<f64>,
    /// Stop after this many frames; `None` runs until stopped
    pub max_frames: Option<u64>,
    /// Whether disabled GameObjects hide their subtrees from traversal
    pub traversal: TraversalPolicy,
    /// How object and component ids are produced
    pub id_strategy: IdStrategy,
    /// Default log level used by [`logging::init_with_level`]
    pub log_level: String,
    /// Window settings used when not headless
    pub window: WindowConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            time_scale: 1.0,
            headless: false,
            frame_rate_cap: None,
            max_fixed_steps_per_frame: None,
            max_frame_delta: Some(0.25),
            max_frames: None,
            traversal: TraversalPolicy::default(),
            id_strategy: IdStrategy::default(),
            log_level: "info".to_string(),
            window: WindowConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fixed tick rate
    pub fn with_tick_rate(mut self, tick_rate: u32) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Set the initial time scale
    pub fn with_time_scale(mut self, time_scale: f64) -> Self {
        self.time_scale = time_scale;
        self
    }

    /// Enable or disable headless mode
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Cap the frame rate
    pub fn with_frame_rate_cap(mut self, fps: u32) -> Self {
        self.frame_rate_cap = Some(fps);
        self
    }

    /// Bound the number of fixed steps run in one frame
    pub fn with_max_fixed_steps(mut self, steps: u32) -> Self {
        self.max_fixed_steps_per_frame = Some(steps);
        self
    }

    /// Set or clear the per-frame real delta clamp
    pub fn with_max_frame_delta(mut self, seconds: Option<f64>) -> Self {
        self.max_frame_delta = seconds;
        self
    }

    /// Stop automatically after `frames` frames
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    /// Set the traversal policy for disabled GameObjects
    pub fn with_traversal(mut self, traversal: TraversalPolicy) -> Self {
        self.traversal = traversal;
        self
    }

    /// Set the id generation strategy
    pub fn with_id_strategy(mut self, id_strategy: IdStrategy) -> Self {
        self.id_strategy = id_strategy;
        self
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set window configuration
    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    /// Fixed simulation step in seconds
    pub fn fixed_step(&self) -> f64 {
        1.0 / f64::from(self.tick_rate.max(1))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 {
            return Err(ConfigError::Invalid("tick_rate must be at least 1".to_string()));
        }
        if !(self.time_scale.is_finite() && self.time_scale > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "time_scale must be a positive number, got {}",
                self.time_scale
            )));
        }
        if self.frame_rate_cap == Some(0) {
            return Err(ConfigError::Invalid("frame_rate_cap must be at least 1".to_string()));
        }
        if self.max_fixed_steps_per_frame == Some(0) {
            return Err(ConfigError::Invalid("max_fixed_steps_per_frame must be at least 1".to_string()));
        }
        if let Some(clamp) = self.max_frame_delta {
            if !(clamp.is_finite() && clamp > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "max_frame_delta must be a positive number, got {clamp}"
                )));
            }
        }
        if logging::parse_level(&self.log_level).is_none() {
            return Err(ConfigError::Invalid(format!("unknown log level '{}'", self.log_level)));
        }
        Ok(())
    }
}

impl Config for EngineConfig {}
