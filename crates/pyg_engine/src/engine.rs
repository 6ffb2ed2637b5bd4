//! Frame scheduler
//!
//! [`Engine`] owns the [`Scene`] and drives it: once per frame it polls
//! input, runs the variable-rate update pass, runs as many fixed steps as the
//! accumulated simulation time allows, and presents through the external
//! renderer unless headless.
//!
//! ```text
//!            start()/boot()          pause()
//!  Stopped ─────────────────▶ Running ───────▶ Paused
//!     ▲                         │  ▲            │
//!     │          stop()         │  └────────────┘
//!     └─────────────────────────┘     resume()
//! ```
//!
//! The loop can be driven three ways: [`Engine::start`] blocks until the
//! engine stops, [`Engine::tick`] runs one frame from the clock, and
//! [`Engine::advance`] runs one frame with an explicit delta.

use std::fmt;
use std::time::Duration;

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::config::ConfigError;
use crate::core::config::EngineConfig;
use crate::events::{EngineCommand, EngineHandle, EngineMailbox};
use crate::foundation::logging;
use crate::foundation::time::{Clock, FrameTime, FrameTimer, SystemClock};
use crate::input::InputSnapshot;
use crate::render::{Renderer, RendererError};
use crate::scene::{Scene, SceneError};

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Not started, or stopped
    Stopped,
    /// Advancing simulation time
    Running,
    /// Rendering, but discarding elapsed time
    Paused,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Scene failure; fatal ones stop the engine
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Renderer failure
    #[error("Renderer error: {0}")]
    Renderer(#[from] RendererError),

    /// The operation is not allowed in the current state
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        /// State at the time of the call
        state: EngineState,
        /// Rejected operation
        action: &'static str,
    },

    /// Not headless, but no renderer was attached
    #[error("No renderer attached and headless mode is off")]
    NoRenderer,

    /// Headless mode changed after the first start
    #[error("Headless mode can only change before the engine first starts")]
    HeadlessLocked,

    /// Non-positive or non-finite time scale
    #[error("Time scale must be positive and finite, got {0}")]
    InvalidTimeScale(f64),
}

/// What happened during one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Frame index, starting at 1
    pub frame: u64,
    /// Measured real delta after clamping
    pub real_dt: f64,
    /// Simulation delta handed to `update`; zero while paused
    pub scaled_dt: f64,
    /// Fixed steps run this frame
    pub fixed_steps: u32,
    /// Simulation time left in the accumulator
    pub accumulator: f64,
    /// State after the frame
    pub state: EngineState,
}

/// Main engine struct
///
/// Owns the scene, the clock, the optional renderer and the fixed-step
/// accumulator.
pub struct Engine {
    scene: Scene,
    config: EngineConfig,
    renderer: Option<Box<dyn Renderer>>,
    clock: Box<dyn Clock>,
    timer: FrameTimer,
    mailbox: EngineMailbox,
    state: EngineState,
    started_once: bool,
    headless: bool,
    time_scale: f64,
    fixed_step: f64,
    accumulator: f64,
    time: FrameTime,
}

impl Engine {
    /// Create a stopped engine from a validated configuration
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let scene = Scene::new(config.traversal, config.id_strategy);
        let fixed_step = config.fixed_step();
        let mut time = FrameTime::new(fixed_step);
        time.time_scale = config.time_scale;

        info!(
            "Engine created: {} Hz fixed step, time scale {}, headless {}",
            config.tick_rate, config.time_scale, config.headless
        );

        Ok(Self {
            scene,
            headless: config.headless,
            time_scale: config.time_scale,
            config,
            renderer: None,
            clock: Box::new(SystemClock::new()),
            timer: FrameTimer::new(),
            mailbox: EngineMailbox::new(),
            state: EngineState::Stopped,
            started_once: false,
            fixed_step,
            accumulator: 0.0,
            time,
        })
    }

    /// Replace the wall clock
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Attach the renderer the engine will open on start
    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The scene
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The scene, mutably
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Configuration the engine was built from
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Whether the engine is running or paused
    pub fn is_active(&self) -> bool {
        self.state != EngineState::Stopped
    }

    /// Whether the engine is paused
    pub fn is_paused(&self) -> bool {
        self.state == EngineState::Paused
    }

    /// Whether rendering is skipped
    pub fn is_headless(&self) -> bool {
        self.headless
    }

    /// Current time scale
    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Fixed simulation step in seconds
    pub fn fixed_step(&self) -> f64 {
        self.fixed_step
    }

    /// Simulation time not yet consumed by fixed steps
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Timing statistics of the last frame
    pub fn frame_time(&self) -> &FrameTime {
        &self.time
    }

    /// Average frames per second since creation
    pub fn average_fps(&self) -> f64 {
        self.timer.average_fps()
    }

    /// Cross-thread control handle
    pub fn handle(&self) -> EngineHandle {
        self.mailbox.handle()
    }

    /// Attached renderer
    pub fn renderer(&self) -> Option<&dyn Renderer> {
        self.renderer.as_deref()
    }

    /// Attached renderer, mutably, for window property pass-through
    pub fn renderer_mut(&mut self) -> Option<&mut (dyn Renderer + 'static)> {
        self.renderer.as_deref_mut()
    }

    // ------------------------------------------------------------------
    // State machine
    // ------------------------------------------------------------------

    fn reject(&self, action: &'static str) -> EngineError {
        EngineError::InvalidTransition { state: self.state, action }
    }

    /// Transition `Stopped → Running` without entering the loop
    ///
    /// Opens the renderer unless headless.
    pub fn boot(&mut self) -> Result<(), EngineError> {
        if self.state != EngineState::Stopped {
            return Err(self.reject("start"));
        }
        if !self.headless {
            let renderer = self.renderer.as_mut().ok_or(EngineError::NoRenderer)?;
            renderer.open(&self.config.window)?;
            if let Some(limit) = self.config.window.framerate_limit {
                renderer.set_framerate_limit(Some(limit));
            }
        }

        self.started_once = true;
        self.state = EngineState::Running;
        self.accumulator = 0.0;
        self.timer.reset(self.clock.now());
        info!("Engine started ({})", if self.headless { "headless" } else { "windowed" });
        Ok(())
    }

    /// Start and run the loop until the engine stops
    ///
    /// Renderer failures and fatal scene errors shut the engine down before
    /// they are returned.
    pub fn start(&mut self) -> Result<(), EngineError> {
        self.boot()?;
        while self.state != EngineState::Stopped {
            self.tick()?;
        }
        Ok(())
    }

    /// Stop advancing simulation time
    pub fn pause(&mut self) -> Result<(), EngineError> {
        if self.state != EngineState::Running {
            return Err(self.reject("pause"));
        }
        self.state = EngineState::Paused;
        info!("Engine paused");
        Ok(())
    }

    /// Resume advancing simulation time
    pub fn resume(&mut self) -> Result<(), EngineError> {
        if self.state != EngineState::Paused {
            return Err(self.reject("resume"));
        }
        self.state = EngineState::Running;
        info!("Engine resumed");
        Ok(())
    }

    /// Destroy the scene, close the renderer and flush logs
    pub fn stop(&mut self) -> Result<(), EngineError> {
        if self.state == EngineState::Stopped {
            return Err(self.reject("stop"));
        }
        self.shutdown();
        Ok(())
    }

    fn shutdown(&mut self) {
        self.scene.clear();
        if let Err(err) = self.scene.apply_commands() {
            warn!("Dropped commands queued during teardown: {}", err);
        }
        self.scene.take_stop_request();

        if let Some(renderer) = self.renderer.as_mut() {
            renderer.close();
        }
        self.state = EngineState::Stopped;
        info!(
            "Engine stopped after {} frames ({:.3}s simulated, {:.1} fps average)",
            self.time.frame,
            self.time.sim_time,
            self.timer.average_fps()
        );
        logging::flush();
    }

    /// Change the time scale
    pub fn set_time_scale(&mut self, scale: f64) -> Result<(), EngineError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(EngineError::InvalidTimeScale(scale));
        }
        self.time_scale = scale;
        self.time.time_scale = scale;
        debug!("Time scale set to {}", scale);
        Ok(())
    }

    /// Toggle headless mode; only allowed before the first start
    pub fn set_headless(&mut self, headless: bool) -> Result<(), EngineError> {
        if self.started_once {
            return Err(EngineError::HeadlessLocked);
        }
        self.headless = headless;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Frames
    // ------------------------------------------------------------------

    /// Run one frame, measuring the delta with the clock and pacing afterwards
    pub fn tick(&mut self) -> Result<FrameReport, EngineError> {
        let frame_start = self.clock.now();
        let real_dt = self.timer.tick(frame_start);
        let report = self.run_frame(real_dt)?;
        self.pace(frame_start);
        Ok(report)
    }

    /// Run one frame with an explicit real delta in seconds
    pub fn advance(&mut self, real_dt: f64) -> Result<FrameReport, EngineError> {
        self.run_frame(real_dt)
    }

    fn report(&self, real_dt: f64, scaled_dt: f64, fixed_steps: u32) -> FrameReport {
        FrameReport {
            frame: self.time.frame,
            real_dt,
            scaled_dt,
            fixed_steps,
            accumulator: self.accumulator,
            state: self.state,
        }
    }

    fn drain_mailbox(&mut self) {
        for command in self.mailbox.drain() {
            debug!("Engine command {:?}", command);
            let result = match command {
                EngineCommand::Stop => self.stop(),
                EngineCommand::Pause => self.pause(),
                EngineCommand::Resume => self.resume(),
                EngineCommand::SetTimeScale(scale) => self.set_time_scale(scale),
            };
            if let Err(err) = result {
                warn!("Rejected engine command {:?}: {}", command, err);
            }
            if self.state == EngineState::Stopped {
                break;
            }
        }
    }

    fn poll_input(&mut self) -> InputSnapshot {
        if self.headless {
            return InputSnapshot::empty();
        }
        self.renderer.as_mut().map(|renderer| renderer.poll_events()).unwrap_or_default()
    }

    fn window_closed(&self, input: &InputSnapshot) -> bool {
        if self.headless {
            return false;
        }
        input.close_requested || self.renderer.as_ref().map_or(true, |renderer| !renderer.is_open())
    }

    fn render(&mut self) -> Result<(), RendererError> {
        if self.headless {
            return Ok(());
        }
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.clear()?;
            renderer.present()?;
        }
        Ok(())
    }

    /// Tear down after an error that ends the run, then hand the error back
    fn fail(&mut self, err: impl Into<EngineError>) -> EngineError {
        let err = err.into();
        error!("Fatal error, stopping: {}", err);
        self.shutdown();
        err
    }

    fn run_frame(&mut self, real_dt: f64) -> Result<FrameReport, EngineError> {
        if self.state == EngineState::Stopped {
            return Err(self.reject("advance"));
        }

        self.drain_mailbox();
        if self.state == EngineState::Stopped {
            return Ok(self.report(0.0, 0.0, 0));
        }

        let input = self.poll_input();
        if self.window_closed(&input) {
            info!("Window closed");
            self.shutdown();
            return Ok(self.report(0.0, 0.0, 0));
        }

        let mut real_dt = real_dt.max(0.0);
        if let Some(clamp) = self.config.max_frame_delta {
            real_dt = real_dt.min(clamp);
        }
        self.time.frame += 1;
        self.time.real_delta = real_dt;

        if self.state == EngineState::Paused {
            self.time.delta = 0.0;
            if let Err(err) = self.render() {
                return Err(self.fail(err));
            }
            return Ok(self.finish_frame(real_dt, 0.0, 0));
        }

        let scaled_dt = real_dt * self.time_scale;
        self.time.delta = scaled_dt;
        self.time.real_time += real_dt;
        self.time.sim_time += scaled_dt;
        self.scene.begin_frame(self.time, input);

        if let Err(err) = self.scene.update(scaled_dt) {
            return Err(self.fail(err));
        }

        self.accumulator += scaled_dt;
        let mut steps = 0u32;
        while self.accumulator >= self.fixed_step {
            if self.config.max_fixed_steps_per_frame.is_some_and(|max| steps >= max) {
                warn!(
                    "Fixed step cap of {} reached, {:.4}s carried to the next frame",
                    steps, self.accumulator
                );
                break;
            }
            self.time.fixed_tick += 1;
            self.scene.set_time(self.time);
            if let Err(err) = self.scene.fixed_update(self.fixed_step) {
                return Err(self.fail(err));
            }
            self.accumulator -= self.fixed_step;
            steps += 1;
        }
        self.time.alpha = self.accumulator / self.fixed_step;

        if let Err(err) = self.render() {
            return Err(self.fail(err));
        }
        Ok(self.finish_frame(real_dt, scaled_dt, steps))
    }

    fn finish_frame(&mut self, real_dt: f64, scaled_dt: f64, steps: u32) -> FrameReport {
        if self.scene.take_stop_request() {
            info!("Stop requested by a component");
            self.shutdown();
        } else if self.config.max_frames.is_some_and(|max| self.time.frame >= max) {
            info!("Reached frame limit of {}", self.time.frame);
            self.shutdown();
        }
        self.report(real_dt, scaled_dt, steps)
    }

    fn pace(&self, frame_start: f64) {
        if self.state == EngineState::Stopped {
            return;
        }
        let Some(cap) = self.config.frame_rate_cap else { return };
        if self.headless && self.time_scale > 1.0 {
            return;
        }
        let budget = 1.0 / f64::from(cap);
        let elapsed = self.clock.now() - frame_start;
        if elapsed < budget {
            self.clock.sleep(Duration::from_secs_f64(budget - elapsed));
        }
    }
}
