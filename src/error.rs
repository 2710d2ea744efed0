//! Error types for recording, playback and file handling.
//!
//! Per-event injection failures are reported as [`MacroError::Injection`]
//! and logged by the player; everything else propagates to the caller.

use std::io;
use thiserror::Error;

/// Main error type for macro-recorder operations.
#[derive(Error, Debug)]
pub enum MacroError {
    /// The specified key is invalid or cannot be injected by a backend.
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// The specified mouse button is invalid.
    #[error("invalid mouse button '{0}'")]
    InvalidButton(String),

    /// Error parsing a hotkey binding.
    #[error("invalid hotkey '{combo}': {reason}")]
    InvalidHotkey { combo: String, reason: String },

    /// Configuration validation error.
    #[error("configuration error: {0}")]
    ConfigValidation(String),

    /// Error reading or parsing the settings file.
    #[error("failed to load config from '{path}': {reason}")]
    ConfigLoad { path: String, reason: String },

    /// Error writing the settings file.
    #[error("failed to save config to '{path}': {reason}")]
    ConfigSave { path: String, reason: String },

    /// Error parsing duration string.
    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    /// Attempted to save a macro without any recorded events.
    #[error("no recorded actions to save")]
    NothingToSave,

    /// Error reading or parsing a macro file.
    #[error("failed to load macro from '{path}': {reason}")]
    MacroLoad { path: String, reason: String },

    /// Error writing a macro file.
    #[error("failed to save macro to '{path}': {reason}")]
    MacroSave { path: String, reason: String },

    /// Platform-specific operation is not supported.
    #[error("operation not supported on this platform: {0}")]
    UnsupportedPlatform(String),

    /// Error registering or handling hotkey.
    #[error("hotkey error: {0}")]
    Hotkey(String),

    /// A backend failed to inject an event.
    #[error("{backend} failed to inject {event}: {reason}")]
    Injection {
        backend: String,
        event: String,
        reason: String,
    },

    /// The global input hook failed.
    #[error("input capture error: {0}")]
    Capture(String),

    /// Error querying the foreground window.
    #[error("window error: {0}")]
    Window(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for macro-recorder operations.
pub type Result<T> = std::result::Result<T, MacroError>;

impl MacroError {
    /// Create a new InvalidKey error.
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a new InvalidHotkey error.
    pub fn invalid_hotkey(combo: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHotkey {
            combo: combo.into(),
            reason: reason.into(),
        }
    }

    /// Create a new ConfigValidation error.
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation(message.into())
    }

    /// Create a new ConfigLoad error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new ConfigSave error.
    pub fn config_save(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigSave {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new InvalidDuration error.
    pub fn invalid_duration(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn macro_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MacroLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn macro_save(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MacroSave {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new UnsupportedPlatform error.
    pub fn unsupported_platform(message: impl Into<String>) -> Self {
        Self::UnsupportedPlatform(message.into())
    }

    /// Create a new Hotkey error.
    pub fn hotkey(message: impl Into<String>) -> Self {
        Self::Hotkey(message.into())
    }

    /// Create a new Injection error.
    pub fn injection(
        backend: impl Into<String>,
        event: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Injection {
            backend: backend.into(),
            event: event.into(),
            reason: reason.into(),
        }
    }

    pub fn capture(message: impl Into<String>) -> Self {
        Self::Capture(message.into())
    }

    /// Create a new Window error.
    pub fn window(message: impl Into<String>) -> Self {
        Self::Window(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MacroError::invalid_key("xyz", "unknown key");
        assert_eq!(err.to_string(), "invalid key 'xyz': unknown key");

        let err = MacroError::config_validation("record hotkey cannot be empty");
        assert_eq!(
            err.to_string(),
            "configuration error: record hotkey cannot be empty"
        );

        let err = MacroError::injection("enigo", "key_tap a", "no display");
        assert_eq!(err.to_string(), "enigo failed to inject key_tap a: no display");

        assert_eq!(
            MacroError::NothingToSave.to_string(),
            "no recorded actions to save"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: MacroError = io_err.into();
        assert!(matches!(err, MacroError::Io(_)));
    }
}
