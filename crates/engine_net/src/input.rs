//! Input events forwarded from clients to the server.
//!
//! Only the window and keyboard events the engine reacts to are modelled;
//! clients forward their key presses and releases so the server can replay
//! them for the right player.

use serde::{Deserialize, Serialize};

/// A keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Space,
    Enter,
    Escape,
    F11,
    /// Letter keys, upper case.
    Char(char),
    /// Any other key, by platform code.
    Other(i32),
}

/// A key press or release with its modifier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub code: Key,
    pub alt: bool,
    pub control: bool,
    pub shift: bool,
    pub system: bool,
}

impl KeyEvent {
    /// A key event without modifiers.
    #[must_use]
    pub fn plain(code: Key) -> Self {
        Self {
            code,
            alt: false,
            control: false,
            shift: false,
            system: false,
        }
    }
}

/// A window or keyboard event fed into the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputEvent {
    /// The window was closed.
    Closed,
    /// The window was resized.
    Resized { width: u32, height: u32 },
    KeyPressed(KeyEvent),
    KeyReleased(KeyEvent),
}

impl InputEvent {
    /// Whether a client forwards this event to the server.
    #[must_use]
    pub fn is_key(&self) -> bool {
        matches!(self, Self::KeyPressed(_) | Self::KeyReleased(_))
    }
}
