//! Scan-code injection through `SendInput`.
//!
//! Games that read DirectInput/raw input ignore virtual-key events, so
//! this backend sends hardware scan codes and absolute pointer moves. Each
//! action is followed by a fixed pause, which some games need to register
//! consecutive inputs.

use super::InputBackend;
use crate::error::{MacroError, Result};
use crate::event::EventKind;
use std::time::Duration;

pub struct DirectInputBackend {
    pause: Duration,
}

impl DirectInputBackend {
    /// Creates the backend with the pause applied after every action.
    #[cfg(windows)]
    pub fn new(pause: Duration) -> Result<Self> {
        Ok(Self { pause })
    }

    #[cfg(not(windows))]
    pub fn new(_pause: Duration) -> Result<Self> {
        Err(MacroError::unsupported_platform(
            "the direct_input engine requires Windows",
        ))
    }

    pub fn pause(&self) -> Duration {
        self.pause
    }
}

impl InputBackend for DirectInputBackend {
    fn name(&self) -> &'static str {
        "direct_input"
    }

    #[cfg(windows)]
    fn execute(&mut self, event: &EventKind) -> Result<()> {
        win::execute(event)?;
        std::thread::sleep(self.pause);
        Ok(())
    }

    #[cfg(not(windows))]
    fn execute(&mut self, event: &EventKind) -> Result<()> {
        Err(MacroError::injection(
            self.name(),
            event.tag(),
            "not available on this platform",
        ))
    }
}

/// One keyboard transition sent for a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(not(windows), allow(dead_code))]
enum Transition {
    ShiftDown,
    KeyDown,
    KeyUp,
    ShiftUp,
}

/// Transitions for pressing and/or releasing a key, with Shift held
/// around the press when the character needs it.
#[cfg_attr(not(windows), allow(dead_code))]
fn transitions(shift: bool, press: bool, release: bool) -> Vec<Transition> {
    let mut steps = Vec::with_capacity(4);
    if shift && press {
        steps.push(Transition::ShiftDown);
    }
    if press {
        steps.push(Transition::KeyDown);
    }
    if release {
        steps.push(Transition::KeyUp);
    }
    if shift && press {
        steps.push(Transition::ShiftUp);
    }
    steps
}

/// Whether a `VkKeyScanW` result requires Shift (bit 0 of the high byte).
#[cfg_attr(not(windows), allow(dead_code))]
fn vk_scan_needs_shift(vk_scan: i16) -> bool {
    (vk_scan >> 8) & 1 != 0
}

#[cfg(windows)]
mod win {
    use super::*;
    use crate::event::{Key, MouseButton, NamedKey, Position};
    use winapi::um::winuser::{
        GetSystemMetrics, MapVirtualKeyW, SendInput, VkKeyScanW, INPUT, INPUT_KEYBOARD,
        INPUT_MOUSE, KEYBDINPUT, KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, KEYEVENTF_SCANCODE,
        MAPVK_VK_TO_VSC, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_HWHEEL, MOUSEEVENTF_LEFTDOWN,
        MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP, MOUSEEVENTF_MOVE,
        MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEEVENTF_WHEEL, MOUSEINPUT, SM_CXSCREEN,
        SM_CYSCREEN,
    };
    use winapi::um::winuser::{
        VK_BACK, VK_CAPITAL, VK_DELETE, VK_DOWN, VK_END, VK_ESCAPE, VK_F1, VK_F10, VK_F11,
        VK_F12, VK_F2, VK_F3, VK_F4, VK_F5, VK_F6, VK_F7, VK_F8, VK_F9, VK_HOME, VK_INSERT,
        VK_LCONTROL, VK_LEFT, VK_LMENU, VK_LSHIFT, VK_LWIN, VK_NEXT, VK_NUMLOCK, VK_PAUSE,
        VK_PRIOR, VK_RCONTROL, VK_RETURN, VK_RIGHT, VK_RMENU, VK_RSHIFT, VK_RWIN, VK_SCROLL,
        VK_SNAPSHOT, VK_SPACE, VK_TAB, VK_UP,
    };

    const WHEEL_STEP: i32 = 120;

    /// Virtual key, extended flag and whether Shift is needed.
    fn virtual_key(key: Key) -> Result<(u32, bool, bool)> {
        let vk = match key {
            Key::Code(code) => return Ok((code, false, false)),
            Key::Char(c) => {
                let mut buf = [0u16; 2];
                let encoded = c.encode_utf16(&mut buf);
                if encoded.len() != 1 {
                    return Err(MacroError::invalid_key(c.to_string(), "not on the keyboard layout"));
                }
                // SAFETY: pure lookup in the active keyboard layout.
                let scan = unsafe { VkKeyScanW(encoded[0]) };
                if scan == -1 {
                    return Err(MacroError::invalid_key(c.to_string(), "not on the keyboard layout"));
                }
                return Ok(((scan as u16 & 0xff) as u32, false, vk_scan_needs_shift(scan)));
            }
            Key::Named(named) => match named {
                NamedKey::Alt => VK_LMENU,
                NamedKey::AltGr => VK_RMENU,
                NamedKey::Backspace => VK_BACK,
                NamedKey::CapsLock => VK_CAPITAL,
                NamedKey::Cmd => VK_LWIN,
                NamedKey::CmdRight => VK_RWIN,
                NamedKey::Ctrl => VK_LCONTROL,
                NamedKey::CtrlRight => VK_RCONTROL,
                NamedKey::Delete => VK_DELETE,
                NamedKey::Down => VK_DOWN,
                NamedKey::End => VK_END,
                NamedKey::Enter => VK_RETURN,
                NamedKey::Esc => VK_ESCAPE,
                NamedKey::F1 => VK_F1,
                NamedKey::F2 => VK_F2,
                NamedKey::F3 => VK_F3,
                NamedKey::F4 => VK_F4,
                NamedKey::F5 => VK_F5,
                NamedKey::F6 => VK_F6,
                NamedKey::F7 => VK_F7,
                NamedKey::F8 => VK_F8,
                NamedKey::F9 => VK_F9,
                NamedKey::F10 => VK_F10,
                NamedKey::F11 => VK_F11,
                NamedKey::F12 => VK_F12,
                NamedKey::Home => VK_HOME,
                NamedKey::Insert => VK_INSERT,
                NamedKey::Left => VK_LEFT,
                NamedKey::NumLock => VK_NUMLOCK,
                NamedKey::PageDown => VK_NEXT,
                NamedKey::PageUp => VK_PRIOR,
                NamedKey::Pause => VK_PAUSE,
                NamedKey::PrintScreen => VK_SNAPSHOT,
                NamedKey::Right => VK_RIGHT,
                NamedKey::ScrollLock => VK_SCROLL,
                NamedKey::Shift => VK_LSHIFT,
                NamedKey::ShiftRight => VK_RSHIFT,
                NamedKey::Space => VK_SPACE,
                NamedKey::Tab => VK_TAB,
                NamedKey::Up => VK_UP,
            },
        };

        let extended = matches!(
            vk,
            VK_DELETE
                | VK_DOWN
                | VK_END
                | VK_HOME
                | VK_INSERT
                | VK_LEFT
                | VK_NEXT
                | VK_PRIOR
                | VK_RIGHT
                | VK_UP
                | VK_RCONTROL
                | VK_RMENU
                | VK_LWIN
                | VK_RWIN
                | VK_SNAPSHOT
        );
        Ok((vk as u32, extended, false))
    }

    fn send(input: &mut INPUT, what: &str) -> Result<()> {
        // SAFETY: `input` is a fully initialised INPUT structure.
        let sent = unsafe { SendInput(1, input, std::mem::size_of::<INPUT>() as i32) };
        if sent != 1 {
            return Err(MacroError::injection(
                "direct_input",
                what,
                std::io::Error::last_os_error().to_string(),
            ));
        }
        Ok(())
    }

    fn key(key: Key, press: bool, release: bool) -> Result<()> {
        let (vk, extended, shift) = virtual_key(key)?;
        let label = key.to_string();
        for step in transitions(shift, press, release) {
            match step {
                Transition::ShiftDown => scan_key(VK_LSHIFT as u32, false, true, "shift")?,
                Transition::KeyDown => scan_key(vk, extended, true, &label)?,
                Transition::KeyUp => scan_key(vk, extended, false, &label)?,
                Transition::ShiftUp => scan_key(VK_LSHIFT as u32, false, false, "shift")?,
            }
        }
        Ok(())
    }

    fn scan_key(vk: u32, extended: bool, down: bool, label: &str) -> Result<()> {
        // SAFETY: pure lookup in the active keyboard layout.
        let scan = unsafe { MapVirtualKeyW(vk, MAPVK_VK_TO_VSC) };
        if scan == 0 {
            return Err(MacroError::invalid_key(label, "no scan code"));
        }

        let mut flags = KEYEVENTF_SCANCODE;
        if extended {
            flags |= KEYEVENTF_EXTENDEDKEY;
        }
        if !down {
            flags |= KEYEVENTF_KEYUP;
        }

        // SAFETY: INPUT is plain data; the keyboard variant is written below.
        let mut input: INPUT = unsafe { std::mem::zeroed() };
        input.type_ = INPUT_KEYBOARD;
        unsafe {
            *input.u.ki_mut() = KEYBDINPUT {
                wVk: 0,
                wScan: scan as u16,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            };
        }
        send(&mut input, &format!("key {}", label))
    }

    fn mouse(dx: i32, dy: i32, data: i32, flags: u32, what: &str) -> Result<()> {
        // SAFETY: INPUT is plain data; the mouse variant is written below.
        let mut input: INPUT = unsafe { std::mem::zeroed() };
        input.type_ = INPUT_MOUSE;
        unsafe {
            *input.u.mi_mut() = MOUSEINPUT {
                dx,
                dy,
                mouseData: data as u32,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            };
        }
        send(&mut input, what)
    }

    fn move_to(pos: Position) -> Result<()> {
        // SAFETY: no preconditions.
        let (width, height) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        let normalize = |v: i32, extent: i32| (v.clamp(0, extent.max(2) - 1) * 65535) / (extent.max(2) - 1);
        mouse(
            normalize(pos.0, width),
            normalize(pos.1, height),
            0,
            MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE,
            "mouse move",
        )
    }

    pub fn execute(event: &EventKind) -> Result<()> {
        match *event {
            EventKind::KeyTap { key: k } => key(k, true, true),
            EventKind::KeyPress { key: k } => key(k, true, false),
            EventKind::KeyRelease { key: k } => key(k, false, true),
            EventKind::Move { pos } => move_to(pos),
            EventKind::Click {
                pos,
                button,
                pressed,
            } => {
                move_to(pos)?;
                let flags = match (button, pressed) {
                    (MouseButton::Left, true) => MOUSEEVENTF_LEFTDOWN,
                    (MouseButton::Left, false) => MOUSEEVENTF_LEFTUP,
                    (MouseButton::Right, true) => MOUSEEVENTF_RIGHTDOWN,
                    (MouseButton::Right, false) => MOUSEEVENTF_RIGHTUP,
                    (MouseButton::Middle, true) => MOUSEEVENTF_MIDDLEDOWN,
                    (MouseButton::Middle, false) => MOUSEEVENTF_MIDDLEUP,
                    (MouseButton::Unknown(_), _) => {
                        return Err(MacroError::InvalidButton(button.to_string()))
                    }
                };
                mouse(0, 0, 0, flags, "mouse button")
            }
            EventKind::Scroll {
                pos,
                scroll: (dx, dy),
            } => {
                move_to(pos)?;
                if dy != 0 {
                    mouse(0, 0, dy as i32 * WHEEL_STEP, MOUSEEVENTF_WHEEL, "scroll")?;
                }
                if dx != 0 {
                    mouse(0, 0, dx as i32 * WHEEL_STEP, MOUSEEVENTF_HWHEEL, "scroll")?;
                }
                Ok(())
            }
        }
    }
}
