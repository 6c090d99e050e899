//! Raw input events.
//!
//! [`RawInputEvent`] is what an [`EventSource`](crate::systems::input::EventSource)
//! produces, possibly from another thread. The
//! [`InputState`](crate::resources::input::InputState) turns the raw stream into
//! per-frame edge queries.

use crate::components::geometry::Vec2;

/// Platform key code.
///
/// The numeric values follow the GLFW/raylib key table so backends can pass codes
/// through unchanged. Letters and digits use their ASCII value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyCode(pub i32);

impl KeyCode {
    pub const SPACE: KeyCode = KeyCode(32);
    pub const A: KeyCode = KeyCode(65);
    pub const D: KeyCode = KeyCode(68);
    pub const M: KeyCode = KeyCode(77);
    pub const S: KeyCode = KeyCode(83);
    pub const W: KeyCode = KeyCode(87);
    pub const ESCAPE: KeyCode = KeyCode(256);
    pub const ENTER: KeyCode = KeyCode(257);
    pub const RIGHT: KeyCode = KeyCode(262);
    pub const LEFT: KeyCode = KeyCode(263);
    pub const DOWN: KeyCode = KeyCode(264);
    pub const UP: KeyCode = KeyCode(265);
    pub const F1: KeyCode = KeyCode(290);
    pub const LEFT_ALT: KeyCode = KeyCode(342);
    pub const RIGHT_ALT: KeyCode = KeyCode(346);

    pub fn is_alt(self) -> bool {
        self == KeyCode::LEFT_ALT || self == KeyCode::RIGHT_ALT
    }

    /// Key code of an ASCII letter or digit (case-insensitive).
    pub fn from_char(c: char) -> Option<KeyCode> {
        let c = c.to_ascii_uppercase();
        (c.is_ascii_uppercase() || c.is_ascii_digit()).then_some(KeyCode(c as i32))
    }
}

/// Mouse buttons the engine tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Map a button index (0 = left, 1 = right, 2 = middle).
    pub fn from_index(index: u32) -> Option<MouseButton> {
        match index {
            0 => Some(MouseButton::Left),
            1 => Some(MouseButton::Right),
            2 => Some(MouseButton::Middle),
            _ => None,
        }
    }

    pub fn index(self) -> u32 {
        match self {
            MouseButton::Left => 0,
            MouseButton::Right => 1,
            MouseButton::Middle => 2,
        }
    }
}

/// A single raw callback from the platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawInputEvent {
    KeyDown(KeyCode),
    KeyUp(KeyCode),
    MouseDown(MouseButton),
    MouseUp(MouseButton),
    MouseMove(Vec2),
}
