//! # Macro Recorder
//!
//! A cross-platform tool for recording keyboard and mouse input and
//! replaying it later.
//!
//! ## Features
//!
//! - Global capture of key presses, mouse moves, clicks and scrolls
//! - Short key presses stored as taps, long ones as press/release pairs
//! - Three playback engines: `rdev`, `enigo` and `direct_input` (Windows)
//! - Repeat a macro N times or forever, with a pause between repetitions
//! - Optional gating to a foreground window by title or process name
//! - Global hotkeys to toggle recording and playback
//! - JSON macro files and JSON settings
//!
//! ## Example
//!
//! ```no_run
//! use macro_recorder::{load_events, MacroPlayer, RdevBackend, SystemWindowProbe, WindowTarget};
//! use std::sync::atomic::AtomicBool;
//!
//! let events = load_events("macro.json").unwrap();
//! let mut player = MacroPlayer::new(
//!     RdevBackend::new(),
//!     SystemWindowProbe::new(),
//!     WindowTarget::new("notepad"),
//! );
//! let stop = AtomicBool::new(false);
//! println!("playback {}", player.play(&events, &stop));
//! ```
//!
//! ## Macro format
//!
//! ```json
//! [
//!   {"time": 0.0, "type": "move", "pos": [640, 480]},
//!   {"time": 0.42, "type": "key_tap", "key": "a"},
//!   {"time": 1.1, "type": "click", "pos": [640, 480], "button": "Button.left", "pressed": true}
//! ]
//! ```

pub mod backend;
pub mod capture;
pub mod config;
pub mod display;
pub mod error;
pub mod event;
pub mod global_hotkey;
pub mod keymap;
pub mod macro_file;
pub mod player;
pub mod recorder;
pub mod window;

pub use backend::{create_backend, DirectInputBackend, EnigoBackend, InputBackend, RdevBackend};
pub use capture::CaptureSession;
pub use config::{PlaybackEngine, RecordMode, Settings, Theme};
pub use error::{MacroError, Result};
pub use event::{EventKind, Key, MacroEvent, MouseButton, NamedKey, Position};
pub use global_hotkey::{HotkeyAction, HotkeyManager};
pub use macro_file::{load_events, save_events};
pub use player::{MacroPlayer, PlaybackOptions, PlaybackOutcome, PlaybackSession, Repeat};
pub use recorder::MacroRecorder;
pub use window::{SystemWindowProbe, WindowProbe, WindowTarget};
