//! Time management utilities
//!
//! The scheduler reads wall-clock time through the [`Clock`] trait so that the
//! loop can be driven by the real system clock in production and by a
//! [`ManualClock`] in tests and offline tools.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time source used by the frame scheduler
pub trait Clock {
    /// Seconds elapsed since the clock was created
    fn now(&self) -> f64;

    /// Suspend the calling thread for `duration`
    ///
    /// Only used for frame pacing when a frame-rate cap is active.
    fn sleep(&self, duration: Duration);
}

/// Clock backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is now
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Hand-driven clock
///
/// Clones share the same underlying time, so a test can keep one clone and
/// advance it while the scheduler owns another. Sleeping advances the clock
/// instead of blocking.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    seconds: Rc<Cell<f64>>,
}

impl ManualClock {
    /// Create a clock at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward
    pub fn advance(&self, seconds: f64) {
        self.seconds.set(self.seconds.get() + seconds.max(0.0));
    }

    /// Jump to an absolute time; never moves backwards
    pub fn set(&self, seconds: f64) {
        if seconds > self.seconds.get() {
            self.seconds.set(seconds);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.seconds.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration.as_secs_f64());
    }
}

/// Frame timer measuring real time between successive ticks
#[derive(Debug, Clone)]
pub struct FrameTimer {
    last_frame: Option<f64>,
    delta_time: f64,
    total_time: f64,
    frame_count: u64,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: None,
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Restart measurement from `now` without producing a delta
    pub fn reset(&mut self, now: f64) {
        self.last_frame = Some(now);
        self.delta_time = 0.0;
    }

    /// Record a frame boundary at `now` and return the real delta in seconds
    ///
    /// The first tick after creation returns zero.
    pub fn tick(&mut self, now: f64) -> f64 {
        self.delta_time = self.last_frame.map_or(0.0, |last| (now - last).max(0.0));
        self.total_time += self.delta_time;
        self.last_frame = Some(now);
        self.frame_count += 1;
        self.delta_time
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f64 {
        self.delta_time
    }

    /// Get the total measured time
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the average FPS since timer creation
    #[allow(clippy::cast_precision_loss)]
    pub fn average_fps(&self) -> f64 {
        if self.total_time > 0.0 {
            self.frame_count as f64 / self.total_time
        } else {
            0.0
        }
    }

    /// Get the current FPS (based on last frame time)
    pub fn current_fps(&self) -> f64 {
        if self.delta_time > 0.0 {
            1.0 / self.delta_time
        } else {
            0.0
        }
    }
}

/// Per-frame timing values handed to components
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Scaled variable-rate delta of the current frame
    pub delta: f64,
    /// Unscaled wall-clock delta of the current frame
    pub real_delta: f64,
    /// Fixed simulation step
    pub fixed_step: f64,
    /// Current time scale
    pub time_scale: f64,
    /// Accumulated scaled simulation time
    pub sim_time: f64,
    /// Accumulated unscaled running time (paused time excluded)
    pub real_time: f64,
    /// Index of the current frame, starting at 1 for the first frame
    pub frame: u64,
    /// Number of fixed steps executed so far
    pub fixed_tick: u64,
    /// Leftover accumulator expressed as a fraction of the fixed step
    pub alpha: f64,
}

impl FrameTime {
    /// Initial timing for a scheduler ticking at `fixed_step`
    pub fn new(fixed_step: f64) -> Self {
        Self {
            delta: 0.0,
            real_delta: 0.0,
            fixed_step,
            time_scale: 1.0,
            sim_time: 0.0,
            real_time: 0.0,
            frame: 0,
            fixed_tick: 0,
            alpha: 0.0,
        }
    }
}

impl Default for FrameTime {
    fn default() -> Self {
        Self::new(1.0 / 60.0)
    }
}
