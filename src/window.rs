//! Foreground window discovery and playback gating.
//!
//! Playback can be restricted to a window whose title (or owning process
//! name) contains a given substring. The foreground window is queried
//! through the [`WindowProbe`] trait so the player can be driven by a fake
//! probe in tests.

use crate::error::{MacroError, Result};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, warn};

/// The window that currently has keyboard focus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundWindow {
    pub title: String,
    pub pid: Option<u32>,
    pub process_name: Option<String>,
}

pub trait WindowProbe: Send {
    /// Returns the focused window, or `None` if no window has focus.
    fn foreground(&mut self) -> Result<Option<ForegroundWindow>>;
}

/// Which window playback is allowed to run in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowTarget {
    needle: String,
}

impl WindowTarget {
    pub fn new(title: impl AsRef<str>) -> Self {
        Self {
            needle: title.as_ref().trim().to_lowercase(),
        }
    }

    /// A target that every window satisfies.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn is_any(&self) -> bool {
        self.needle.is_empty()
    }

    pub fn matches(&self, window: &ForegroundWindow) -> bool {
        if self.is_any() {
            return true;
        }
        window.title.to_lowercase().contains(&self.needle)
            || window
                .process_name
                .as_ref()
                .is_some_and(|name| name.to_lowercase().contains(&self.needle))
    }

    /// Asks `probe` for the foreground window and checks it against the
    /// target. Probe failures count as a mismatch.
    pub fn is_active(&self, probe: &mut dyn WindowProbe) -> bool {
        if self.is_any() {
            return true;
        }
        match probe.foreground() {
            Ok(Some(window)) => self.matches(&window),
            Ok(None) => false,
            Err(e) => {
                warn!("Could not get the active window: {}", e);
                false
            }
        }
    }
}

/// Queries the real desktop for the focused window.
///
/// Uses the Win32 API on Windows and `xdotool` on X11 desktops. Process
/// names are resolved from the window's PID with `sysinfo`.
pub struct SystemWindowProbe {
    system: System,
}

impl Clone for SystemWindowProbe {
    fn clone(&self) -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemWindowProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemWindowProbe {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    fn process_name(&mut self, pid: u32) -> Option<String> {
        let pid = Pid::from_u32(pid);
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        self.system
            .process(pid)
            .map(|process| process.name().to_string_lossy().into_owned())
    }
}

impl WindowProbe for SystemWindowProbe {
    fn foreground(&mut self) -> Result<Option<ForegroundWindow>> {
        let Some((title, pid)) = platform::foreground()? else {
            return Ok(None);
        };
        let process_name = pid.and_then(|pid| self.process_name(pid));
        debug!(%title, ?pid, ?process_name, "Foreground window");

        Ok(Some(ForegroundWindow {
            title,
            pid,
            process_name,
        }))
    }
}

#[cfg(windows)]
mod platform {
    use super::*;
    use winapi::um::winuser::{
        GetForegroundWindow, GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId,
    };

    pub fn foreground() -> Result<Option<(String, Option<u32>)>> {
        // SAFETY: plain Win32 queries on the handle returned by the system;
        // the buffer is sized from GetWindowTextLengthW.
        unsafe {
            let hwnd = GetForegroundWindow();
            if hwnd.is_null() {
                return Ok(None);
            }

            let len = GetWindowTextLengthW(hwnd);
            let mut buffer = vec![0u16; len.max(0) as usize + 1];
            let copied = GetWindowTextW(hwnd, buffer.as_mut_ptr(), buffer.len() as i32);
            let title = String::from_utf16_lossy(&buffer[..copied.max(0) as usize]);

            let mut pid = 0u32;
            GetWindowThreadProcessId(hwnd, &mut pid);

            Ok(Some((title, (pid != 0).then_some(pid))))
        }
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
mod platform {
    use super::*;
    use std::process::Command;

    fn xdotool(args: &[&str]) -> Result<Option<String>> {
        let output = Command::new("xdotool").args(args).output().map_err(|e| {
            MacroError::window(format!("failed to run xdotool (is it installed?): {}", e))
        })?;

        if !output.status.success() {
            // xdotool exits non-zero when no window has focus.
            return Ok(None);
        }
        Ok(Some(
            String::from_utf8_lossy(&output.stdout).trim().to_string(),
        ))
    }

    pub fn foreground() -> Result<Option<(String, Option<u32>)>> {
        let Some(title) = xdotool(&["getactivewindow", "getwindowname"])? else {
            return Ok(None);
        };
        let pid = xdotool(&["getactivewindow", "getwindowpid"])?
            .and_then(|pid| pid.parse::<u32>().ok());
        Ok(Some((title, pid)))
    }
}

#[cfg(not(any(windows, all(unix, not(target_os = "macos")))))]
mod platform {
    use super::*;

    pub fn foreground() -> Result<Option<(String, Option<u32>)>> {
        Err(MacroError::unsupported_platform(
            "querying the foreground window",
        ))
    }
}
