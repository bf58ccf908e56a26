//! Pointer events forwarded by the host bar back to a block.

use serde::{Deserialize, Serialize};

/// X11 button id as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    ScrollUp,
    ScrollDown,
    Other(u8),
}

impl From<u8> for MouseButton {
    fn from(id: u8) -> Self {
        match id {
            1 => MouseButton::Left,
            2 => MouseButton::Middle,
            3 => MouseButton::Right,
            4 => MouseButton::ScrollUp,
            5 => MouseButton::ScrollDown,
            other => MouseButton::Other(other),
        }
    }
}

impl From<MouseButton> for u8 {
    fn from(button: MouseButton) -> Self {
        match button {
            MouseButton::Left => 1,
            MouseButton::Middle => 2,
            MouseButton::Right => 3,
            MouseButton::ScrollUp => 4,
            MouseButton::ScrollDown => 5,
            MouseButton::Other(id) => id,
        }
    }
}

/// Broad category of a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Click,
    Scroll,
}

/// A click event record from the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    /// Identity of the block that was clicked
    pub name: String,
    #[serde(default)]
    pub instance: Option<String>,
    pub button: MouseButton,
    /// Root window coordinates of the click
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    /// Coordinates relative to the top left corner of the block
    #[serde(default)]
    pub relative_x: i32,
    #[serde(default)]
    pub relative_y: i32,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
    /// Active modifiers, in no particular order
    #[serde(default)]
    pub modifiers: Vec<String>,
}

impl ClickEvent {
    /// Minimal event for a button press on the named block
    pub fn new(name: impl Into<String>, button: MouseButton) -> Self {
        Self {
            name: name.into(),
            instance: None,
            button,
            x: 0,
            y: 0,
            relative_x: 0,
            relative_y: 0,
            width: 0,
            height: 0,
            modifiers: Vec::new(),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self.button {
            MouseButton::ScrollUp | MouseButton::ScrollDown => EventKind::Scroll,
            _ => EventKind::Click,
        }
    }
}
