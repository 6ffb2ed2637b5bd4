//! Renderer contract
//!
//! The core never draws. It talks to an external renderer through the
//! [`Renderer`] trait: open a window, poll its events once per frame, clear
//! and present, and forward window properties. Backends live outside this
//! crate.

use std::any::Any;

use crate::core::config::WindowConfig;
use crate::input::InputSnapshot;

/// Renderer errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RendererError {
    /// The backend could not create its window or context
    #[error("failed to open window: {0}")]
    OpenFailed(String),

    /// An operation needed an open window
    #[error("renderer is not open")]
    NotOpen,

    /// Backend-specific failure
    #[error("renderer backend error: {0}")]
    Backend(String),
}

/// External rendering backend driven by the frame scheduler
///
/// # Call Order
/// The scheduler calls [`Renderer::open`] once when it starts (never in
/// headless mode), then every frame [`Renderer::poll_events`],
/// [`Renderer::clear`] and [`Renderer::present`], and finally
/// [`Renderer::close`] when it stops.
///
/// # Window Properties
/// The property accessors are pure pass-through. The scheduler does not read
/// them back or depend on their values.
pub trait Renderer {
    /// Create the window described by `config`
    fn open(&mut self, config: &WindowConfig) -> Result<(), RendererError>;

    /// Whether the window is still open
    ///
    /// Returning false after `open` makes the scheduler stop.
    fn is_open(&self) -> bool;

    /// Process pending platform events and summarise this frame's input
    fn poll_events(&mut self) -> InputSnapshot;

    /// Begin a frame
    fn clear(&mut self) -> Result<(), RendererError>;

    /// Finish a frame and show it
    fn present(&mut self) -> Result<(), RendererError>;

    /// Destroy the window; calling it twice is harmless
    fn close(&mut self);

    /// Current window title
    fn title(&self) -> String;

    /// Set the window title
    fn set_title(&mut self, title: &str);

    /// Client area size in pixels
    fn size(&self) -> (u32, u32);

    /// Resize the client area
    fn set_size(&mut self, width: u32, height: u32);

    /// Window position on screen
    fn position(&self) -> (i32, i32);

    /// Move the window
    fn set_position(&mut self, x: i32, y: i32);

    /// Whether vertical sync is on
    fn vsync(&self) -> bool;

    /// Toggle vertical sync
    fn set_vsync(&mut self, vsync: bool);

    /// Backend-side frame limit
    fn framerate_limit(&self) -> Option<u32>;

    /// Set or clear the backend-side frame limit
    fn set_framerate_limit(&mut self, limit: Option<u32>);

    /// Whether the cursor is visible
    fn is_cursor_visible(&self) -> bool;

    /// Show or hide the cursor
    fn set_cursor_visible(&mut self, visible: bool);

    /// Whether the cursor is confined to the window
    fn is_cursor_grabbed(&self) -> bool;

    /// Confine or release the cursor
    fn set_cursor_grabbed(&mut self, grabbed: bool);

    /// Get access to the concrete type for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Get mutable access to the concrete type for downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
