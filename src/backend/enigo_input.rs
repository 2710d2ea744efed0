use super::InputBackend;
use crate::error::{MacroError, Result};
use crate::event::{EventKind, Key, MouseButton, NamedKey};
use enigo::{Axis, Button, Coordinate, Direction, Enigo, Keyboard, Mouse, Settings};

/// Replays events through enigo's keyboard and mouse controllers.
pub struct EnigoBackend {
    enigo: Enigo,
}

impl EnigoBackend {
    pub fn new() -> Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| MacroError::injection("enigo", "connection", e.to_string()))?;
        Ok(Self { enigo })
    }

    fn key(&mut self, key: Key, direction: Direction) -> Result<()> {
        let mapped = to_enigo_key(key)?;
        self.enigo
            .key(mapped, direction)
            .map_err(|e| MacroError::injection("enigo", format!("key {}", key), e.to_string()))
    }

    fn move_to(&mut self, x: i32, y: i32) -> Result<()> {
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| MacroError::injection("enigo", "mouse move", e.to_string()))
    }
}

pub(crate) fn to_enigo_key(key: Key) -> Result<enigo::Key> {
    use enigo::Key as K;

    let mapped = match key {
        Key::Char(c) => K::Unicode(c),
        Key::Code(code) => K::Other(code),
        Key::Named(named) => match named {
            NamedKey::Alt => K::Alt,
            NamedKey::Backspace => K::Backspace,
            NamedKey::CapsLock => K::CapsLock,
            NamedKey::Cmd | NamedKey::CmdRight => K::Meta,
            NamedKey::Ctrl | NamedKey::CtrlRight => K::Control,
            NamedKey::Delete => K::Delete,
            NamedKey::Down => K::DownArrow,
            NamedKey::End => K::End,
            NamedKey::Enter => K::Return,
            NamedKey::Esc => K::Escape,
            NamedKey::F1 => K::F1,
            NamedKey::F2 => K::F2,
            NamedKey::F3 => K::F3,
            NamedKey::F4 => K::F4,
            NamedKey::F5 => K::F5,
            NamedKey::F6 => K::F6,
            NamedKey::F7 => K::F7,
            NamedKey::F8 => K::F8,
            NamedKey::F9 => K::F9,
            NamedKey::F10 => K::F10,
            NamedKey::F11 => K::F11,
            NamedKey::F12 => K::F12,
            NamedKey::Home => K::Home,
            NamedKey::Left => K::LeftArrow,
            NamedKey::PageDown => K::PageDown,
            NamedKey::PageUp => K::PageUp,
            NamedKey::Right => K::RightArrow,
            NamedKey::Shift | NamedKey::ShiftRight => K::Shift,
            NamedKey::Space => K::Space,
            NamedKey::Tab => K::Tab,
            NamedKey::Up => K::UpArrow,
            NamedKey::AltGr
            | NamedKey::Insert
            | NamedKey::NumLock
            | NamedKey::Pause
            | NamedKey::PrintScreen
            | NamedKey::ScrollLock => {
                return Err(MacroError::invalid_key(
                    named.name(),
                    "not supported by the enigo engine, use rdev",
                ))
            }
        },
    };
    Ok(mapped)
}

fn to_enigo_button(button: MouseButton) -> Result<Button> {
    match button {
        MouseButton::Left => Ok(Button::Left),
        MouseButton::Right => Ok(Button::Right),
        MouseButton::Middle => Ok(Button::Middle),
        MouseButton::Unknown(_) => Err(MacroError::InvalidButton(button.to_string())),
    }
}

impl InputBackend for EnigoBackend {
    fn name(&self) -> &'static str {
        "enigo"
    }

    fn execute(&mut self, event: &EventKind) -> Result<()> {
        match *event {
            EventKind::KeyTap { key } => self.key(key, Direction::Click),
            EventKind::KeyPress { key } => self.key(key, Direction::Press),
            EventKind::KeyRelease { key } => self.key(key, Direction::Release),
            EventKind::Move { pos } => self.move_to(pos.0, pos.1),
            EventKind::Click {
                pos,
                button,
                pressed,
            } => {
                let button = to_enigo_button(button)?;
                self.move_to(pos.0, pos.1)?;
                let direction = if pressed {
                    Direction::Press
                } else {
                    Direction::Release
                };
                self.enigo
                    .button(button, direction)
                    .map_err(|e| MacroError::injection("enigo", "mouse button", e.to_string()))
            }
            EventKind::Scroll {
                pos,
                scroll: (dx, dy),
            } => {
                self.move_to(pos.0, pos.1)?;
                // enigo scrolls down for positive lengths; events store up as positive.
                if dy != 0 {
                    self.enigo
                        .scroll(-(dy as i32), Axis::Vertical)
                        .map_err(|e| MacroError::injection("enigo", "scroll", e.to_string()))?;
                }
                if dx != 0 {
                    self.enigo
                        .scroll(dx as i32, Axis::Horizontal)
                        .map_err(|e| MacroError::injection("enigo", "scroll", e.to_string()))?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        assert_eq!(to_enigo_key(Key::Char('x')).unwrap(), enigo::Key::Unicode('x'));
        assert_eq!(
            to_enigo_key(Key::Named(NamedKey::CtrlRight)).unwrap(),
            enigo::Key::Control
        );
        assert!(to_enigo_key(Key::Named(NamedKey::PrintScreen)).is_err());
    }

    #[test]
    fn test_unknown_button_rejected() {
        assert!(to_enigo_button(MouseButton::Unknown(9)).is_err());
        assert_eq!(to_enigo_button(MouseButton::Right).unwrap(), Button::Right);
    }
}
