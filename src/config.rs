//! Persistent settings and duration parsing.
//!
//! Settings live in a flat JSON file. Any key missing from the file takes
//! its default, and a corrupt file falls back to the defaults entirely so
//! the tool always starts.
//!
//! ```json
//! {
//!   "theme": "dark",
//!   "playback_engine": "rdev",
//!   "record_mode": "keyboard_and_mouse",
//!   "hotkeys": { "record": "f9", "playback": "f10" },
//!   "window_specific_title": "Notepad",
//!   "direct_input_optimized_pause": true
//! }
//! ```

use crate::error::{MacroError, Result};
use crate::global_hotkey::parse_hotkey;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error};

/// Default settings file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Colour palette used for terminal output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl FromStr for Theme {
    type Err = MacroError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(MacroError::config_validation(format!(
                "unknown theme '{}' (expected dark or light)",
                other
            ))),
        }
    }
}

/// Which injection backend replays a macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackEngine {
    /// OS-level event simulation through rdev. Works for most desktop apps.
    #[default]
    #[serde(alias = "Pynput (Padrão)")]
    Rdev,
    /// enigo's keyboard and mouse controllers.
    #[serde(alias = "PyAutoGUI (Apps)")]
    Enigo,
    /// Scan-code `SendInput` for games that ignore virtual key events (Windows).
    #[serde(alias = "PyDirectInput (Jogos)")]
    DirectInput,
}

impl PlaybackEngine {
    pub fn name(self) -> &'static str {
        match self {
            PlaybackEngine::Rdev => "rdev",
            PlaybackEngine::Enigo => "enigo",
            PlaybackEngine::DirectInput => "direct_input",
        }
    }
}

impl fmt::Display for PlaybackEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlaybackEngine {
    type Err = MacroError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "rdev" => Ok(PlaybackEngine::Rdev),
            "enigo" => Ok(PlaybackEngine::Enigo),
            "direct_input" | "directinput" => Ok(PlaybackEngine::DirectInput),
            other => Err(MacroError::config_validation(format!(
                "unknown playback engine '{}' (expected rdev, enigo or direct_input)",
                other
            ))),
        }
    }
}

/// Which input devices are captured while recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordMode {
    #[default]
    #[serde(alias = "Teclado e Mouse")]
    KeyboardAndMouse,
    #[serde(alias = "Somente Teclado")]
    KeyboardOnly,
    #[serde(alias = "Somente Mouse")]
    MouseOnly,
}

impl RecordMode {
    pub fn records_keyboard(self) -> bool {
        self != RecordMode::MouseOnly
    }

    pub fn records_mouse(self) -> bool {
        self != RecordMode::KeyboardOnly
    }
}

impl fmt::Display for RecordMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordMode::KeyboardAndMouse => "keyboard_and_mouse",
            RecordMode::KeyboardOnly => "keyboard_only",
            RecordMode::MouseOnly => "mouse_only",
        })
    }
}

impl FromStr for RecordMode {
    type Err = MacroError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "keyboard_and_mouse" | "all" | "both" => Ok(RecordMode::KeyboardAndMouse),
            "keyboard_only" | "keyboard" => Ok(RecordMode::KeyboardOnly),
            "mouse_only" | "mouse" => Ok(RecordMode::MouseOnly),
            other => Err(MacroError::config_validation(format!(
                "unknown record mode '{}'",
                other
            ))),
        }
    }
}

/// Global hotkey bindings. `None` leaves the action unbound.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Hotkeys {
    pub record: Option<String>,
    pub playback: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub theme: Theme,
    pub playback_engine: PlaybackEngine,
    pub record_mode: RecordMode,
    pub hotkeys: Hotkeys,
    /// Playback only runs while the foreground window contains this text.
    pub window_specific_title: String,
    /// Pause after each `direct_input` action: 10ms when set, 100ms otherwise.
    #[serde(alias = "pydirectinput_optimized_pause")]
    pub direct_input_optimized_pause: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            playback_engine: PlaybackEngine::default(),
            record_mode: RecordMode::default(),
            hotkeys: Hotkeys::default(),
            window_specific_title: String::new(),
            direct_input_optimized_pause: true,
        }
    }
}

impl Settings {
    /// Reads settings from `path`, failing on I/O or parse errors.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| MacroError::config_load(path.display().to_string(), e.to_string()))?;

        serde_json::from_str(&content)
            .map_err(|e| MacroError::config_load(path.display().to_string(), e.to_string()))
    }

    /// Reads settings from `path`, returning defaults when the file is
    /// missing or unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No settings file at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                error!("Error loading settings, using defaults: {}", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .map_err(|e| MacroError::config_save(path.display().to_string(), e.to_string()))?;
        debug!("Settings saved to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for (name, binding) in [
            ("record", &self.hotkeys.record),
            ("playback", &self.hotkeys.playback),
        ] {
            if let Some(binding) = binding {
                parse_hotkey(binding).map_err(|e| {
                    MacroError::config_validation(format!("{} hotkey: {}", name, e))
                })?;
            }
        }

        if let (Some(record), Some(playback)) = (&self.hotkeys.record, &self.hotkeys.playback) {
            if record.eq_ignore_ascii_case(playback) {
                return Err(MacroError::config_validation(
                    "record and playback hotkeys must differ",
                ));
            }
        }

        Ok(())
    }

    /// The target window substring, or `None` when playback is ungated.
    pub fn target_window(&self) -> Option<&str> {
        let title = self.window_specific_title.trim();
        (!title.is_empty()).then_some(title)
    }

    pub fn direct_input_pause(&self) -> Duration {
        if self.direct_input_optimized_pause {
            Duration::from_millis(10)
        } else {
            Duration::from_millis(100)
        }
    }
}

/// Parses durations like `500ms`, `1.5s`, `2m`, or a bare millisecond count.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let trimmed = value.trim().to_lowercase();
    if trimmed.is_empty() {
        return Err(MacroError::invalid_duration(value, "empty duration"));
    }

    let (number, unit) = if let Some(n) = trimmed.strip_suffix("ms") {
        (n, 0.001)
    } else if let Some(n) = trimmed.strip_suffix('s') {
        (n, 1.0)
    } else if let Some(n) = trimmed.strip_suffix('m') {
        (n, 60.0)
    } else {
        (trimmed.as_str(), 0.001)
    };

    let amount: f64 = number
        .trim()
        .parse()
        .map_err(|_| MacroError::invalid_duration(value, "not a number"))?;

    if !amount.is_finite() || amount < 0.0 {
        return Err(MacroError::invalid_duration(
            value,
            "must be a non-negative number",
        ));
    }

    Ok(Duration::from_secs_f64(amount * unit))
}
