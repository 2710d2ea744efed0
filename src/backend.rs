//! Input-injection backends.
//!
//! Every backend can replay every [`EventKind`]; they differ in how the
//! input reaches the OS. Some applications (games in particular) only
//! react to one of them, which is why the engine is a user setting.

mod direct_input;
mod enigo_input;
mod simulate;

pub use direct_input::DirectInputBackend;
pub use enigo_input::EnigoBackend;
pub use simulate::RdevBackend;

use crate::config::{PlaybackEngine, Settings};
use crate::error::Result;
use crate::event::EventKind;

pub trait InputBackend {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Injects one event.
    fn execute(&mut self, event: &EventKind) -> Result<()>;
}

impl<B: InputBackend + ?Sized> InputBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn execute(&mut self, event: &EventKind) -> Result<()> {
        (**self).execute(event)
    }
}

/// Builds the backend selected in `settings`.
///
/// Some backends hold handles that must stay on the thread that created
/// them, so call this on the thread that will replay the macro.
pub fn create_backend(engine: PlaybackEngine, settings: &Settings) -> Result<Box<dyn InputBackend>> {
    let backend: Box<dyn InputBackend> = match engine {
        PlaybackEngine::Rdev => Box::new(RdevBackend::new()),
        PlaybackEngine::Enigo => Box::new(EnigoBackend::new()?),
        PlaybackEngine::DirectInput => {
            Box::new(DirectInputBackend::new(settings.direct_input_pause())?)
        }
    };
    Ok(backend)
}
