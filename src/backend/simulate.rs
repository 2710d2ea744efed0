use super::InputBackend;
use crate::error::{MacroError, Result};
use crate::event::{EventKind, Key, MouseButton, Position};
use crate::keymap;
use rdev::{Button, EventType};
use std::time::Duration;

/// Delay between the two pointer moves that precede a click. Some
/// applications miss a click that lands in the same instant as the move.
const CLICK_SETTLE: Duration = Duration::from_millis(10);

/// Replays events with `rdev::simulate`.
#[derive(Debug, Default, Clone)]
pub struct RdevBackend;

impl RdevBackend {
    pub fn new() -> Self {
        Self
    }

    fn send(&self, event_type: &EventType) -> Result<()> {
        rdev::simulate(event_type).map_err(|e| {
            MacroError::injection(self.name(), format!("{:?}", event_type), format!("{:?}", e))
        })
    }

    /// Sends the press and/or release of `key`, holding Shift around the
    /// press when the character needs it.
    fn key(&self, key: Key, press: bool, release: bool) -> Result<()> {
        let (raw, shift) = keymap::to_rdev_stroke(key)
            .ok_or_else(|| MacroError::invalid_key(key.to_string(), "no physical key for rdev"))?;
        for event_type in key_events(raw, shift, press, release) {
            self.send(&event_type)?;
        }
        Ok(())
    }

    fn move_to(&self, pos: Position) -> Result<()> {
        self.send(&EventType::MouseMove {
            x: f64::from(pos.0),
            y: f64::from(pos.1),
        })
    }
}

fn key_events(raw: rdev::Key, shift: bool, press: bool, release: bool) -> Vec<EventType> {
    let mut events = Vec::with_capacity(4);
    if shift && press {
        events.push(EventType::KeyPress(rdev::Key::ShiftLeft));
    }
    if press {
        events.push(EventType::KeyPress(raw));
    }
    if release {
        events.push(EventType::KeyRelease(raw));
    }
    if shift && press {
        events.push(EventType::KeyRelease(rdev::Key::ShiftLeft));
    }
    events
}

fn button(button: MouseButton) -> Button {
    match button {
        MouseButton::Left => Button::Left,
        MouseButton::Right => Button::Right,
        MouseButton::Middle => Button::Middle,
        MouseButton::Unknown(code) => Button::Unknown(code),
    }
}

impl InputBackend for RdevBackend {
    fn name(&self) -> &'static str {
        "rdev"
    }

    fn execute(&mut self, event: &EventKind) -> Result<()> {
        match *event {
            EventKind::KeyTap { key } => self.key(key, true, true),
            EventKind::KeyPress { key } => self.key(key, true, false),
            EventKind::KeyRelease { key } => self.key(key, false, true),
            EventKind::Move { pos } => self.move_to(pos),
            EventKind::Click {
                pos,
                button: b,
                pressed,
            } => {
                self.move_to(pos)?;
                std::thread::sleep(CLICK_SETTLE);
                self.move_to(pos)?;
                if pressed {
                    self.send(&EventType::ButtonPress(button(b)))
                } else {
                    self.send(&EventType::ButtonRelease(button(b)))
                }
            }
            EventKind::Scroll {
                pos,
                scroll: (dx, dy),
            } => {
                self.move_to(pos)?;
                self.send(&EventType::Wheel {
                    delta_x: dx,
                    delta_y: dy,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmappable_key_is_rejected_before_injecting() {
        let mut backend = RdevBackend::new();
        let err = backend
            .execute(&EventKind::KeyTap { key: Key::Char('ß') })
            .unwrap_err();
        assert!(matches!(err, MacroError::InvalidKey { .. }));
    }

    #[test]
    fn test_uppercase_tap_holds_shift() {
        let (raw, shift) = keymap::to_rdev_stroke(Key::Char('A')).unwrap();
        assert_eq!(
            key_events(raw, shift, true, true),
            vec![
                EventType::KeyPress(rdev::Key::ShiftLeft),
                EventType::KeyPress(rdev::Key::KeyA),
                EventType::KeyRelease(rdev::Key::KeyA),
                EventType::KeyRelease(rdev::Key::ShiftLeft),
            ]
        );
    }

    #[test]
    fn test_shifted_press_and_release_split() {
        let (raw, shift) = keymap::to_rdev_stroke(Key::Char('?')).unwrap();
        assert_eq!(
            key_events(raw, shift, true, false),
            vec![
                EventType::KeyPress(rdev::Key::ShiftLeft),
                EventType::KeyPress(rdev::Key::Slash),
                EventType::KeyRelease(rdev::Key::ShiftLeft),
            ]
        );
        assert_eq!(
            key_events(raw, shift, false, true),
            vec![EventType::KeyRelease(rdev::Key::Slash)]
        );
    }

    #[test]
    fn test_plain_key_has_no_shift() {
        let (raw, shift) = keymap::to_rdev_stroke(Key::Char('h')).unwrap();
        assert_eq!(
            key_events(raw, shift, true, true),
            vec![
                EventType::KeyPress(rdev::Key::KeyH),
                EventType::KeyRelease(rdev::Key::KeyH),
            ]
        );
    }

    #[test]
    fn test_buttons_map() {
        assert_eq!(button(MouseButton::Middle), Button::Middle);
        assert_eq!(button(MouseButton::Unknown(4)), Button::Unknown(4));
    }
}
