//! Saving and loading recorded macros as JSON event lists.

use crate::error::{MacroError, Result};
use crate::event::MacroEvent;
use std::path::Path;
use tracing::info;

/// Writes `events` to `path` as a pretty-printed JSON array.
///
/// Refuses to write an empty macro.
pub fn save_events(path: impl AsRef<Path>, events: &[MacroEvent]) -> Result<()> {
    let path = path.as_ref();
    if events.is_empty() {
        return Err(MacroError::NothingToSave);
    }

    let json = serde_json::to_string_pretty(events)?;
    std::fs::write(path, json)
        .map_err(|e| MacroError::macro_save(path.display().to_string(), e.to_string()))?;

    info!("Saved {} actions to {}", events.len(), path.display());
    Ok(())
}

/// Reads a macro previously written by [`save_events`].
pub fn load_events(path: impl AsRef<Path>) -> Result<Vec<MacroEvent>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| MacroError::macro_load(path.display().to_string(), e.to_string()))?;

    let events: Vec<MacroEvent> = serde_json::from_str(&content)
        .map_err(|e| MacroError::macro_load(path.display().to_string(), e.to_string()))?;

    info!("Loaded {} actions from {}", events.len(), path.display());
    Ok(events)
}
