//! Global keyboard and mouse capture.
//!
//! rdev's listener blocks its thread for the lifetime of the process and
//! offers no way to stop it, so a single listener is started on first use
//! and recordings attach to and detach from it.

use crate::config::RecordMode;
use crate::error::{MacroError, Result};
use crate::event::{Key, MacroEvent, MouseButton, Position};
use crate::keymap;
use crate::recorder::{ActionCallback, InputEvent, MacroRecorder};
use rdev::{Button, EventType};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// How long to wait for the listener to report a startup failure.
const STARTUP_GRACE: Duration = Duration::from_millis(150);

static HOOK: OnceLock<Arc<Hook>> = OnceLock::new();

#[derive(Default)]
struct Hook {
    target: Mutex<Option<Arc<Mutex<MacroRecorder>>>>,
    state: Mutex<HookState>,
    failure: Mutex<Option<String>>,
}

/// Input state tracked whether or not a recording is attached.
#[derive(Debug, Default)]
pub struct HookState {
    pointer: Position,
    /// Key recorded for each physical key currently down.
    pressed: Vec<(rdev::Key, Key)>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Hook {
    /// Fails once the listener has reported that it cannot run.
    fn check(&self) -> Result<()> {
        match lock(&self.failure).clone() {
            Some(reason) => Err(MacroError::capture(reason)),
            None => Ok(()),
        }
    }

    fn dispatch(&self, event: rdev::Event) {
        let at = Instant::now();
        let input = lock(&self.state).apply(&event);

        let Some(recorder) = lock(&self.target).clone() else {
            return;
        };
        lock(&recorder).handle(input, at);
    }
}

impl HookState {
    /// Converts a hook event into recorder input, updating the pointer
    /// position and held keys.
    ///
    /// Button events carry no coordinates and take the last seen pointer
    /// position. Release events carry no text, so they reuse the key
    /// chosen when the same physical key went down.
    pub fn apply(&mut self, event: &rdev::Event) -> InputEvent {
        match event.event_type {
            EventType::KeyPress(raw) => {
                let key = keymap::from_rdev(raw, event.name.as_deref());
                match self.pressed.iter_mut().find(|(k, _)| *k == raw) {
                    Some(entry) => entry.1 = key,
                    None => self.pressed.push((raw, key)),
                }
                InputEvent::KeyDown(key)
            }
            EventType::KeyRelease(raw) => {
                let key = match self.pressed.iter().position(|(k, _)| *k == raw) {
                    Some(index) => self.pressed.swap_remove(index).1,
                    None => keymap::from_rdev(raw, None),
                };
                InputEvent::KeyUp(key)
            }
            EventType::MouseMove { x, y } => {
                self.pointer = Position(x.round() as i32, y.round() as i32);
                InputEvent::Move(self.pointer)
            }
            event_type => to_mouse_input(event_type, self.pointer),
        }
    }
}

fn to_mouse_input(event_type: EventType, pointer: Position) -> InputEvent {
    match event_type {
        EventType::ButtonPress(button) => InputEvent::Click {
            pos: pointer,
            button: to_button(button),
            pressed: true,
        },
        EventType::ButtonRelease(button) => InputEvent::Click {
            pos: pointer,
            button: to_button(button),
            pressed: false,
        },
        EventType::Wheel { delta_x, delta_y } => InputEvent::Scroll {
            pos: pointer,
            dx: delta_x,
            dy: delta_y,
        },
        EventType::MouseMove { x, y } => {
            InputEvent::Move(Position(x.round() as i32, y.round() as i32))
        }
        // Key events are resolved by `HookState::apply`.
        EventType::KeyPress(raw) => InputEvent::KeyDown(keymap::from_rdev(raw, None)),
        EventType::KeyRelease(raw) => InputEvent::KeyUp(keymap::from_rdev(raw, None)),
    }
}

fn to_button(button: Button) -> MouseButton {
    match button {
        Button::Left => MouseButton::Left,
        Button::Right => MouseButton::Right,
        Button::Middle => MouseButton::Middle,
        Button::Unknown(code) => MouseButton::Unknown(code),
    }
}

fn hook() -> Result<Arc<Hook>> {
    let mut spawned = false;
    let hook = HOOK
        .get_or_init(|| {
            spawned = true;
            let hook = Arc::new(Hook::default());
            let listener_hook = hook.clone();

            let spawned_thread = std::thread::Builder::new()
                .name("input-hook".to_string())
                .spawn(move || {
                    let callback_hook = listener_hook.clone();
                    if let Err(e) = rdev::listen(move |event| callback_hook.dispatch(event)) {
                        error!("Input hook stopped: {:?}", e);
                        hook_failed(&listener_hook, format!("{:?}", e));
                    }
                });

            match spawned_thread {
                Ok(_) => info!("Global input hook started"),
                Err(e) => {
                    error!("Failed to spawn input hook thread: {}", e);
                    hook_failed(&hook, format!("failed to spawn input hook thread: {}", e));
                }
            }
            hook
        })
        .clone();

    if spawned {
        std::thread::sleep(STARTUP_GRACE);
    }

    hook.check()?;
    Ok(hook)
}

fn hook_failed(hook: &Hook, reason: String) {
    *lock(&hook.failure) = Some(reason);
}

/// A recording attached to the global input hook.
pub struct CaptureSession {
    hook: Arc<Hook>,
    recorder: Arc<Mutex<MacroRecorder>>,
}

impl CaptureSession {
    /// Starts recording global input with the given mode.
    ///
    /// `ignore_keys` are never recorded (typically the configured hotkeys).
    /// `on_action` receives a display line for each recorded event.
    pub fn begin(
        mode: RecordMode,
        ignore_keys: Vec<Key>,
        on_action: Option<ActionCallback>,
    ) -> Result<Self> {
        let hook = hook()?;

        let mut recorder = MacroRecorder::new(mode);
        recorder.start(Instant::now(), ignore_keys, on_action);
        let recorder = Arc::new(Mutex::new(recorder));

        let mut target = lock(&hook.target);
        if target.is_some() {
            return Err(MacroError::capture("a recording is already in progress"));
        }
        *target = Some(recorder.clone());
        drop(target);

        debug!(%mode, "Capture session attached");
        Ok(Self { hook, recorder })
    }

    /// Number of events recorded so far.
    pub fn event_count(&self) -> usize {
        lock(&self.recorder).events().len()
    }

    /// Detaches from the hook and returns the recorded, time-ordered events.
    pub fn finish(self) -> Vec<MacroEvent> {
        self.detach();
        let mut recorder = lock(&self.recorder);
        recorder.stop(Instant::now());
        recorder.take_events()
    }

    fn detach(&self) {
        let mut target = lock(&self.hook.target);
        if target
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &self.recorder))
        {
            *target = None;
            debug!("Capture session detached");
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.detach();
    }
}
