//! Input snapshot handed to components
//!
//! The renderer polls its platform events once per frame and summarises them
//! into an [`InputSnapshot`]. Components only ever see that snapshot, never
//! the device layer. Headless runs use an empty snapshot.

use std::collections::BTreeSet;

use serde::{Serialize, Deserialize};

use crate::foundation::math::Vec2;

/// Key codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyCode {
    /// A key
    A,
    /// B key
    B,
    /// C key
    C,
    /// D key
    D,
    /// E key
    E,
    /// F key
    F,
    /// G key
    G,
    /// H key
    H,
    /// I key
    I,
    /// J key
    J,
    /// K key
    K,
    /// L key
    L,
    /// M key
    M,
    /// N key
    N,
    /// O key
    O,
    /// P key
    P,
    /// Q key
    Q,
    /// R key
    R,
    /// S key
    S,
    /// T key
    T,
    /// U key
    U,
    /// V key
    V,
    /// W key
    W,
    /// X key
    X,
    /// Y key
    Y,
    /// Z key
    Z,
    /// Space key
    Space,
    /// Enter key
    Enter,
    /// Escape key
    Escape,
    /// Up arrow
    Up,
    /// Down arrow
    Down,
    /// Left arrow
    Left,
    /// Right arrow
    Right,
    /// Tab key
    Tab,
    /// Backspace key
    Backspace,
    /// Left shift
    LeftShift,
    /// Left control
    LeftControl,
}

/// Mouse buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    /// Left mouse button
    Left,
    /// Right mouse button
    Right,
    /// Middle mouse button
    Middle,
}

bitflags::bitflags! {
    /// Set of mouse buttons held down
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MouseButtons: u8 {
        /// Left mouse button
        const LEFT = 1 << 0;
        /// Right mouse button
        const RIGHT = 1 << 1;
        /// Middle mouse button
        const MIDDLE = 1 << 2;
    }
}

impl From<MouseButton> for MouseButtons {
    fn from(button: MouseButton) -> Self {
        match button {
            MouseButton::Left => Self::LEFT,
            MouseButton::Right => Self::RIGHT,
            MouseButton::Middle => Self::MIDDLE,
        }
    }
}

/// Input state captured at the start of a frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    /// Keys held down
    pub keys_down: BTreeSet<KeyCode>,
    /// Cursor position in window coordinates
    pub mouse_position: Vec2,
    /// Mouse buttons held down
    pub mouse_buttons: MouseButtons,
    /// The user asked the window to close
    pub close_requested: bool,
}

impl InputSnapshot {
    /// Snapshot with nothing pressed
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether `key` is held
    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Whether `button` is held
    pub fn is_mouse_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons.contains(button.into())
    }

    /// Record a key transition
    pub fn handle_key_input(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.keys_down.insert(key);
        } else {
            self.keys_down.remove(&key);
        }
    }

    /// Record a mouse button transition
    pub fn handle_mouse_button(&mut self, button: MouseButton, pressed: bool) {
        self.mouse_buttons.set(button.into(), pressed);
    }

    /// Record cursor movement
    pub fn handle_mouse_move(&mut self, x: f32, y: f32) {
        self.mouse_position = Vec2::new(x, y);
    }
}
