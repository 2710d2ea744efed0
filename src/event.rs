//! Recorded macro events and their JSON representation.
//!
//! A macro is an ordered list of [`MacroEvent`]s. Each event carries a
//! timestamp in seconds relative to the start of recording and a tagged
//! payload:
//!
//! ```json
//! [
//!   {"time": 0.0, "type": "move", "pos": [640, 480]},
//!   {"time": 0.31, "type": "click", "pos": [640, 480], "button": "Button.left", "pressed": true},
//!   {"time": 0.9, "type": "key_tap", "key": "a"},
//!   {"time": 1.2, "type": "key_press", "key": "shift"}
//! ]
//! ```

use crate::error::{MacroError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A key without a printable character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Alt,
    AltGr,
    Backspace,
    CapsLock,
    Cmd,
    CmdRight,
    Ctrl,
    CtrlRight,
    Delete,
    Down,
    End,
    Enter,
    Esc,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Home,
    Insert,
    Left,
    NumLock,
    PageDown,
    PageUp,
    Pause,
    PrintScreen,
    Right,
    ScrollLock,
    Shift,
    ShiftRight,
    Space,
    Tab,
    Up,
}

const NAMED_KEYS: &[(NamedKey, &str)] = &[
    (NamedKey::Alt, "alt"),
    (NamedKey::AltGr, "alt_gr"),
    (NamedKey::Backspace, "backspace"),
    (NamedKey::CapsLock, "caps_lock"),
    (NamedKey::Cmd, "cmd"),
    (NamedKey::CmdRight, "cmd_r"),
    (NamedKey::Ctrl, "ctrl"),
    (NamedKey::CtrlRight, "ctrl_r"),
    (NamedKey::Delete, "delete"),
    (NamedKey::Down, "down"),
    (NamedKey::End, "end"),
    (NamedKey::Enter, "enter"),
    (NamedKey::Esc, "esc"),
    (NamedKey::F1, "f1"),
    (NamedKey::F2, "f2"),
    (NamedKey::F3, "f3"),
    (NamedKey::F4, "f4"),
    (NamedKey::F5, "f5"),
    (NamedKey::F6, "f6"),
    (NamedKey::F7, "f7"),
    (NamedKey::F8, "f8"),
    (NamedKey::F9, "f9"),
    (NamedKey::F10, "f10"),
    (NamedKey::F11, "f11"),
    (NamedKey::F12, "f12"),
    (NamedKey::Home, "home"),
    (NamedKey::Insert, "insert"),
    (NamedKey::Left, "left"),
    (NamedKey::NumLock, "num_lock"),
    (NamedKey::PageDown, "page_down"),
    (NamedKey::PageUp, "page_up"),
    (NamedKey::Pause, "pause"),
    (NamedKey::PrintScreen, "print_screen"),
    (NamedKey::Right, "right"),
    (NamedKey::ScrollLock, "scroll_lock"),
    (NamedKey::Shift, "shift"),
    (NamedKey::ShiftRight, "shift_r"),
    (NamedKey::Space, "space"),
    (NamedKey::Tab, "tab"),
    (NamedKey::Up, "up"),
];

impl NamedKey {
    /// Canonical lowercase name used in macro and settings files.
    pub fn name(self) -> &'static str {
        NAMED_KEYS
            .iter()
            .find(|(key, _)| *key == self)
            .map(|(_, name)| *name)
            .unwrap_or("unknown")
    }

    /// Looks up a key by its canonical name or a common alias.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        let canonical = match name.as_str() {
            "ctrl_l" | "control" | "lctrl" => "ctrl",
            "rctrl" => "ctrl_r",
            "shift_l" | "lshift" => "shift",
            "rshift" => "shift_r",
            "alt_l" | "option" => "alt",
            "alt_r" | "altgr" => "alt_gr",
            "cmd_l" | "meta" | "super" | "win" => "cmd",
            "return" => "enter",
            "escape" => "esc",
            "pageup" => "page_up",
            "pagedown" => "page_down",
            "capslock" => "caps_lock",
            "numlock" => "num_lock",
            "scrolllock" => "scroll_lock",
            "printscreen" | "print" => "print_screen",
            "arrowup" => "up",
            "arrowdown" => "down",
            "arrowleft" => "left",
            "arrowright" => "right",
            other => other,
        };
        NAMED_KEYS
            .iter()
            .find(|(_, key_name)| *key_name == canonical)
            .map(|(key, _)| *key)
    }

    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            NamedKey::Alt
                | NamedKey::AltGr
                | NamedKey::Cmd
                | NamedKey::CmdRight
                | NamedKey::Ctrl
                | NamedKey::CtrlRight
                | NamedKey::Shift
                | NamedKey::ShiftRight
        )
    }
}

/// Identifies a keyboard key.
///
/// Keys flatten to strings in JSON: named keys use their lowercase name,
/// printable keys the character itself, and keys the hook could not
/// identify their raw code in angle brackets (`"<187>"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Key {
    Named(NamedKey),
    Char(char),
    Code(u32),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Named(named) => f.write_str(named.name()),
            Key::Char(c) => write!(f, "{}", c),
            Key::Code(code) => write!(f, "<{}>", code),
        }
    }
}

impl FromStr for Key {
    type Err = MacroError;

    fn from_str(s: &str) -> Result<Self> {
        // Older macro files wrote special keys as "Key.space".
        let raw = s.strip_prefix("Key.").unwrap_or(s);

        let mut chars = raw.chars();
        if let (Some(c), None) = (chars.next(), chars.clone().next()) {
            return Ok(match c {
                ' ' => Key::Named(NamedKey::Space),
                '\t' => Key::Named(NamedKey::Tab),
                '\n' | '\r' => Key::Named(NamedKey::Enter),
                c => Key::Char(c),
            });
        }

        if let Some(code) = raw.strip_prefix('<').and_then(|r| r.strip_suffix('>')) {
            return code
                .parse::<u32>()
                .map(Key::Code)
                .map_err(|_| MacroError::invalid_key(s, "malformed key code"));
        }

        NamedKey::from_name(raw)
            .map(Key::Named)
            .ok_or_else(|| MacroError::invalid_key(s, "unknown key name"))
    }
}

impl TryFrom<String> for Key {
    type Error = MacroError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}

/// A mouse button, flattened to `"Button.left"` style strings in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Unknown(u8),
}

impl MouseButton {
    /// Button name without the `Button.` prefix.
    pub fn short_name(&self) -> String {
        match self {
            MouseButton::Left => "left".to_string(),
            MouseButton::Right => "right".to_string(),
            MouseButton::Middle => "middle".to_string(),
            MouseButton::Unknown(code) => format!("unknown{}", code),
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Button.{}", self.short_name())
    }
}

impl FromStr for MouseButton {
    type Err = MacroError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.strip_prefix("Button.").unwrap_or(s).to_lowercase();
        match name.as_str() {
            "left" => Ok(MouseButton::Left),
            "right" => Ok(MouseButton::Right),
            "middle" => Ok(MouseButton::Middle),
            other => other
                .strip_prefix("unknown")
                .and_then(|code| code.parse::<u8>().ok())
                .map(MouseButton::Unknown)
                .ok_or_else(|| MacroError::InvalidButton(s.to_string())),
        }
    }
}

impl TryFrom<String> for MouseButton {
    type Error = MacroError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<MouseButton> for String {
    fn from(button: MouseButton) -> Self {
        button.to_string()
    }
}

/// Screen position in pixels, serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position(pub i32, pub i32);

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

/// Type-specific payload of a recorded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    KeyTap {
        key: Key,
    },
    KeyPress {
        key: Key,
    },
    KeyRelease {
        key: Key,
    },
    Move {
        pos: Position,
    },
    Click {
        pos: Position,
        button: MouseButton,
        pressed: bool,
    },
    Scroll {
        pos: Position,
        /// `(dx, dy)`; positive `dy` scrolls up.
        scroll: (i64, i64),
    },
}

impl EventKind {
    /// The `type` tag written to JSON.
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::KeyTap { .. } => "key_tap",
            EventKind::KeyPress { .. } => "key_press",
            EventKind::KeyRelease { .. } => "key_release",
            EventKind::Move { .. } => "move",
            EventKind::Click { .. } => "click",
            EventKind::Scroll { .. } => "scroll",
        }
    }

    pub fn is_keyboard(&self) -> bool {
        matches!(
            self,
            EventKind::KeyTap { .. } | EventKind::KeyPress { .. } | EventKind::KeyRelease { .. }
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::KeyTap { key } => write!(f, "tapped key {}", key),
            EventKind::KeyPress { key } => write!(f, "pressed key {}", key),
            EventKind::KeyRelease { key } => write!(f, "released key {}", key),
            EventKind::Move { pos } => write!(f, "mouse move {}", pos),
            EventKind::Click {
                button, pressed, ..
            } => {
                let action = if *pressed { "pressed" } else { "released" };
                write!(f, "mouse {} {}", action, button)
            }
            EventKind::Scroll {
                scroll: (dx, dy), ..
            } => write!(f, "mouse scroll ({}, {})", dx, dy),
        }
    }
}

/// A single recorded input event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroEvent {
    /// Seconds since the start of recording.
    pub time: f64,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl MacroEvent {
    pub fn new(time: f64, kind: EventKind) -> Self {
        Self { time, kind }
    }

    /// Line shown while recording, e.g. `[1.25s] tapped key a`.
    pub fn display_line(&self) -> String {
        format!("[{:.2}s] {}", self.time, self.kind)
    }
}

/// Sorts events chronologically, keeping the relative order of ties.
pub fn sort_by_time(events: &mut [MacroEvent]) {
    events.sort_by(|a, b| a.time.total_cmp(&b.time));
}
