//! Turns raw input notifications into a timestamped macro.
//!
//! [`MacroRecorder`] is independent of any input hook: the capture layer
//! (or a test) feeds it [`InputEvent`]s together with the instant they
//! happened. Keys held for less than [`TAP_THRESHOLD`] collapse into a
//! single `key_tap`; longer holds are kept as a `key_press` and a
//! `key_release` so the hold duration survives replay.

use crate::config::RecordMode;
use crate::event::{sort_by_time, EventKind, Key, MacroEvent, MouseButton, Position};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Holds shorter than this are recorded as taps.
pub const TAP_THRESHOLD: Duration = Duration::from_millis(200);

/// Callback receiving a display line for every recorded event.
pub type ActionCallback = Box<dyn FnMut(&str) + Send>;

/// Raw input as reported by a global hook.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyDown(Key),
    KeyUp(Key),
    Move(Position),
    Click {
        pos: Position,
        button: MouseButton,
        pressed: bool,
    },
    Scroll {
        pos: Position,
        dx: i64,
        dy: i64,
    },
}

impl InputEvent {
    fn is_keyboard(&self) -> bool {
        matches!(self, InputEvent::KeyDown(_) | InputEvent::KeyUp(_))
    }
}

pub struct MacroRecorder {
    mode: RecordMode,
    events: Vec<MacroEvent>,
    recording: bool,
    start: Instant,
    held: HashMap<Key, Instant>,
    ignored: HashSet<Key>,
    on_action: Option<ActionCallback>,
}

impl Default for MacroRecorder {
    fn default() -> Self {
        Self::new(RecordMode::default())
    }
}

impl MacroRecorder {
    pub fn new(mode: RecordMode) -> Self {
        Self {
            mode,
            events: Vec::new(),
            recording: false,
            start: Instant::now(),
            held: HashMap::new(),
            ignored: HashSet::new(),
            on_action: None,
        }
    }

    pub fn set_record_mode(&mut self, mode: RecordMode) {
        self.mode = mode;
    }

    pub fn record_mode(&self) -> RecordMode {
        self.mode
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Starts a new recording at `at`, discarding previously recorded events.
    ///
    /// Does nothing if a recording is already in progress.
    pub fn start(
        &mut self,
        at: Instant,
        ignore_keys: impl IntoIterator<Item = Key>,
        on_action: Option<ActionCallback>,
    ) {
        if self.recording {
            return;
        }

        self.events.clear();
        self.held.clear();
        self.ignored = ignore_keys.into_iter().collect();
        self.on_action = on_action;
        self.start = at;
        self.recording = true;
        debug!(mode = %self.mode, ignored = self.ignored.len(), "Recording started");
    }

    /// Stops recording. Keys still held are kept as `key_press` events and
    /// the result is put in chronological order.
    pub fn stop(&mut self, _at: Instant) {
        if !self.recording {
            return;
        }

        let mut still_held: Vec<(Key, Instant)> = self.held.drain().collect();
        still_held.sort_by_key(|(_, pressed_at)| *pressed_at);
        for (key, pressed_at) in still_held {
            let t = self.elapsed(pressed_at);
            self.record(t, EventKind::KeyPress { key });
        }

        // Hook threads can deliver events slightly out of order.
        sort_by_time(&mut self.events);

        self.recording = false;
        self.on_action = None;
        self.ignored.clear();
        debug!(events = self.events.len(), "Recording stopped");
    }

    /// Feeds one input notification observed at `at`.
    pub fn handle(&mut self, input: InputEvent, at: Instant) {
        if !self.recording {
            return;
        }
        if input.is_keyboard() && !self.mode.records_keyboard() {
            return;
        }
        if !input.is_keyboard() && !self.mode.records_mouse() {
            return;
        }

        match input {
            InputEvent::KeyDown(key) => self.on_key_down(key, at),
            InputEvent::KeyUp(key) => self.on_key_up(key, at),
            InputEvent::Move(pos) => {
                let t = self.elapsed(at);
                self.record(t, EventKind::Move { pos });
            }
            InputEvent::Click {
                pos,
                button,
                pressed,
            } => {
                let t = self.elapsed(at);
                self.record(
                    t,
                    EventKind::Click {
                        pos,
                        button,
                        pressed,
                    },
                );
            }
            InputEvent::Scroll { pos, dx, dy } => {
                let t = self.elapsed(at);
                self.record(
                    t,
                    EventKind::Scroll {
                        pos,
                        scroll: (dx, dy),
                    },
                );
            }
        }
    }

    pub fn events(&self) -> &[MacroEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<MacroEvent> {
        std::mem::take(&mut self.events)
    }

    fn on_key_down(&mut self, key: Key, at: Instant) {
        // OS auto-repeat sends more key-downs while the key is held.
        if self.held.contains_key(&key) || self.ignored.contains(&key) {
            return;
        }
        trace!(%key, "Key down");
        self.held.insert(key, at);
    }

    fn on_key_up(&mut self, key: Key, at: Instant) {
        let Some(pressed_at) = self.held.remove(&key) else {
            return;
        };

        let held_for = at.saturating_duration_since(pressed_at);
        let t_press = self.elapsed(pressed_at);

        if held_for < TAP_THRESHOLD {
            self.record(t_press, EventKind::KeyTap { key });
        } else {
            self.record(t_press, EventKind::KeyPress { key });
            let t_release = self.elapsed(at);
            self.record(t_release, EventKind::KeyRelease { key });
        }
    }

    fn elapsed(&self, at: Instant) -> f64 {
        at.saturating_duration_since(self.start).as_secs_f64()
    }

    fn record(&mut self, time: f64, kind: EventKind) {
        let event = MacroEvent::new(time, kind);
        if let Some(callback) = self.on_action.as_mut() {
            callback(&event.display_line());
        }
        self.events.push(event);
    }
}
