use crate::config::Hotkeys;
use crate::error::{MacroError, Result};
use crate::event::Key;
use global_hotkey::hotkey::HotKey;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What a registered hotkey asks the application to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    ToggleRecording,
    TogglePlayback,
}

pub struct HotkeyManager {
    manager: GlobalHotKeyManager,
    bindings: Vec<(HotKey, HotkeyAction)>,
    shutdown: Arc<AtomicBool>,
}

impl HotkeyManager {
    pub fn new() -> Result<Self> {
        let manager = GlobalHotKeyManager::new().map_err(|e| {
            MacroError::hotkey(format!("failed to create GlobalHotKeyManager: {}", e))
        })?;

        Ok(Self {
            manager,
            bindings: Vec::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Registers every bound hotkey in `hotkeys`, replacing earlier bindings.
    pub fn register_all(&mut self, hotkeys: &Hotkeys) -> Result<()> {
        self.unregister_all();

        if let Some(binding) = &hotkeys.record {
            self.register(binding, HotkeyAction::ToggleRecording)?;
        }
        if let Some(binding) = &hotkeys.playback {
            self.register(binding, HotkeyAction::TogglePlayback)?;
        }
        Ok(())
    }

    pub fn register(&mut self, hotkey_str: &str, action: HotkeyAction) -> Result<()> {
        let hotkey = parse_hotkey(hotkey_str)?;

        self.manager.register(hotkey).map_err(|e| {
            MacroError::hotkey(format!("failed to register hotkey '{}': {}", hotkey_str, e))
        })?;

        info!("Global hotkey '{}' registered for {:?}", hotkey_str, action);
        self.bindings.push((hotkey, action));
        Ok(())
    }

    pub fn unregister_all(&mut self) {
        for (hotkey, action) in self.bindings.drain(..) {
            if let Err(e) = self.manager.unregister(hotkey) {
                warn!("Failed to unregister hotkey for {:?}: {}", action, e);
            }
        }
    }

    pub fn has_bindings(&self) -> bool {
        !self.bindings.is_empty()
    }

    /// Polls hotkey events on a blocking task and forwards presses as
    /// [`HotkeyAction`]s until the manager is dropped.
    pub fn start_listener(&self) -> mpsc::UnboundedReceiver<HotkeyAction> {
        let (tx, rx) = mpsc::unbounded_channel();
        let receiver = GlobalHotKeyEvent::receiver();
        let bindings: Vec<(u32, HotkeyAction)> = self
            .bindings
            .iter()
            .map(|(hotkey, action)| (hotkey.id(), *action))
            .collect();
        let shutdown = self.shutdown.clone();

        tokio::task::spawn_blocking(move || {
            while !shutdown.load(Ordering::Relaxed) {
                if let Ok(event) = receiver.try_recv() {
                    if event.state == HotKeyState::Pressed {
                        let action = bindings
                            .iter()
                            .find(|(id, _)| *id == event.id)
                            .map(|(_, action)| *action);

                        if let Some(action) = action {
                            debug!("Hotkey pressed: {:?}", action);
                            if tx.send(action).is_err() {
                                break;
                            }
                        }
                    }
                }

                // Small sleep to prevent busy waiting
                std::thread::sleep(std::time::Duration::from_millis(10));
            }
        });

        rx
    }
}

impl Drop for HotkeyManager {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        self.unregister_all();
    }
}

/// Keys the recorder should leave out of the macro.
///
/// Only single-key bindings such as `f9` qualify. The parts of a combo
/// like `ctrl+p` are ordinary keys the user still needs to record.
pub fn ignored_keys(hotkeys: &Hotkeys) -> Vec<Key> {
    [&hotkeys.record, &hotkeys.playback]
        .into_iter()
        .flatten()
        .filter(|binding| !binding.contains('+'))
        .filter_map(|binding| binding.trim().parse::<Key>().ok())
        .collect()
}

pub fn parse_hotkey(hotkey_str: &str) -> Result<HotKey> {
    use global_hotkey::hotkey::Modifiers;

    let binding = hotkey_str.to_lowercase();
    let parts: Vec<&str> = binding
        .split('+')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    if parts.is_empty() {
        return Err(MacroError::invalid_hotkey(hotkey_str, "empty hotkey string"));
    }

    let mut modifiers = Modifiers::empty();
    let mut key_code = None;

    for part in &parts {
        match *part {
            "ctrl" | "control" => modifiers |= Modifiers::CONTROL,
            "alt" => modifiers |= Modifiers::ALT,
            "shift" => modifiers |= Modifiers::SHIFT,
            "meta" | "cmd" | "super" => modifiers |= Modifiers::SUPER,
            key => {
                if key_code.is_some() {
                    return Err(MacroError::invalid_hotkey(
                        hotkey_str,
                        "multiple keys specified",
                    ));
                }
                key_code = Some(parse_key_code(key).ok_or_else(|| {
                    MacroError::invalid_hotkey(hotkey_str, format!("unsupported key '{}'", key))
                })?);
            }
        }
    }

    let code =
        key_code.ok_or_else(|| MacroError::invalid_hotkey(hotkey_str, "no key specified"))?;

    let modifiers = (!modifiers.is_empty()).then_some(modifiers);
    Ok(HotKey::new(modifiers, code))
}

fn parse_key_code(key: &str) -> Option<global_hotkey::hotkey::Code> {
    use global_hotkey::hotkey::Code;

    let code = match key {
        // Letters
        "a" => Code::KeyA,
        "b" => Code::KeyB,
        "c" => Code::KeyC,
        "d" => Code::KeyD,
        "e" => Code::KeyE,
        "f" => Code::KeyF,
        "g" => Code::KeyG,
        "h" => Code::KeyH,
        "i" => Code::KeyI,
        "j" => Code::KeyJ,
        "k" => Code::KeyK,
        "l" => Code::KeyL,
        "m" => Code::KeyM,
        "n" => Code::KeyN,
        "o" => Code::KeyO,
        "p" => Code::KeyP,
        "q" => Code::KeyQ,
        "r" => Code::KeyR,
        "s" => Code::KeyS,
        "t" => Code::KeyT,
        "u" => Code::KeyU,
        "v" => Code::KeyV,
        "w" => Code::KeyW,
        "x" => Code::KeyX,
        "y" => Code::KeyY,
        "z" => Code::KeyZ,

        // Numbers
        "0" => Code::Digit0,
        "1" => Code::Digit1,
        "2" => Code::Digit2,
        "3" => Code::Digit3,
        "4" => Code::Digit4,
        "5" => Code::Digit5,
        "6" => Code::Digit6,
        "7" => Code::Digit7,
        "8" => Code::Digit8,
        "9" => Code::Digit9,

        // Function keys
        "f1" => Code::F1,
        "f2" => Code::F2,
        "f3" => Code::F3,
        "f4" => Code::F4,
        "f5" => Code::F5,
        "f6" => Code::F6,
        "f7" => Code::F7,
        "f8" => Code::F8,
        "f9" => Code::F9,
        "f10" => Code::F10,
        "f11" => Code::F11,
        "f12" => Code::F12,

        // Special keys
        "space" => Code::Space,
        "enter" | "return" => Code::Enter,
        "tab" => Code::Tab,
        "escape" | "esc" => Code::Escape,
        "backspace" => Code::Backspace,
        "delete" => Code::Delete,
        "insert" => Code::Insert,
        "home" => Code::Home,
        "end" => Code::End,
        "pageup" | "page_up" => Code::PageUp,
        "pagedown" | "page_down" => Code::PageDown,
        "pause" => Code::Pause,
        "scroll_lock" | "scrolllock" => Code::ScrollLock,

        // Arrow keys
        "up" | "arrowup" => Code::ArrowUp,
        "down" | "arrowdown" => Code::ArrowDown,
        "left" | "arrowleft" => Code::ArrowLeft,
        "right" | "arrowright" => Code::ArrowRight,

        _ => return None,
    };

    Some(code)
}
