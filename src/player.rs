//! Macro playback.
//!
//! [`MacroPlayer`] replays one pass over an event list: it sleeps for the
//! gap between consecutive timestamps and hands each event to an
//! [`InputBackend`]. [`PlaybackSession`] repeats that pass a fixed number
//! of times (or until stopped) with a pause between repetitions.
//!
//! Cancellation is cooperative. The stop flag is checked before every
//! event and every few milliseconds while sleeping, so a stop request
//! takes effect without waiting out a long gap.

use crate::backend::InputBackend;
use crate::error::{MacroError, Result};
use crate::event::MacroEvent;
use crate::window::{WindowProbe, WindowTarget};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Longest uninterrupted sleep between stop-flag checks.
const STOP_POLL: Duration = Duration::from_millis(10);

/// How a playback pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Every event was replayed.
    Completed,
    /// The stop flag was raised.
    Stopped,
    /// The target window was not (or no longer) in the foreground.
    Skipped,
    /// There was nothing to replay.
    Empty,
}

impl fmt::Display for PlaybackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlaybackOutcome::Completed => "finished",
            PlaybackOutcome::Stopped => "stopped",
            PlaybackOutcome::Skipped => "skipped (window inactive)",
            PlaybackOutcome::Empty => "nothing to play",
        })
    }
}

/// Sleeps for `duration` in short slices. Returns `false` if `stop` was
/// raised before the full duration elapsed.
///
/// A duration past the clock's range sleeps until stopped.
pub fn sleep_unless_stopped(duration: Duration, stop: &AtomicBool) -> bool {
    let deadline = Instant::now().checked_add(duration);
    loop {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        let slice = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    return true;
                }
                (deadline - now).min(STOP_POLL)
            }
            None => STOP_POLL,
        };
        std::thread::sleep(slice);
    }
}

pub struct MacroPlayer<B, P> {
    backend: B,
    probe: P,
    target: WindowTarget,
    injection_errors: usize,
}

impl<B: InputBackend, P: WindowProbe> MacroPlayer<B, P> {
    pub fn new(backend: B, probe: P, target: WindowTarget) -> Self {
        Self {
            backend,
            probe,
            target,
            injection_errors: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Injection failures since the player was created.
    pub fn injection_errors(&self) -> usize {
        self.injection_errors
    }

    /// Replays `events` once.
    ///
    /// A failed injection is logged and playback moves on to the next event.
    pub fn play(&mut self, events: &[MacroEvent], stop: &AtomicBool) -> PlaybackOutcome {
        if events.is_empty() {
            return PlaybackOutcome::Empty;
        }

        if !self.target.is_active(&mut self.probe) {
            warn!("Playback skipped: target window is not active");
            return PlaybackOutcome::Skipped;
        }

        debug!(
            events = events.len(),
            backend = self.backend.name(),
            "Playback pass started"
        );

        let mut last_time = 0.0;
        for event in events {
            if stop.load(Ordering::Relaxed) {
                return PlaybackOutcome::Stopped;
            }

            if !self.target.is_any() && !self.target.is_active(&mut self.probe) {
                warn!("Playback interrupted: target window is no longer active");
                return PlaybackOutcome::Skipped;
            }

            let delay = event.time - last_time;
            if delay > 0.0 {
                let Ok(delay) = Duration::try_from_secs_f64(delay) else {
                    error!(time = event.time, "Event timestamp out of range, stopping playback");
                    return PlaybackOutcome::Stopped;
                };
                if !sleep_unless_stopped(delay, stop) {
                    return PlaybackOutcome::Stopped;
                }
            }
            if stop.load(Ordering::Relaxed) {
                return PlaybackOutcome::Stopped;
            }

            if let Err(e) = self.backend.execute(&event.kind) {
                self.injection_errors += 1;
                error!(
                    "Error executing {} with {}: {}",
                    event.display_line(),
                    self.backend.name(),
                    e
                );
            }
            last_time = event.time;
        }

        PlaybackOutcome::Completed
    }
}

/// How many times to replay a macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Times(u32),
    Forever,
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repeat::Times(n) => write!(f, "{}", n),
            Repeat::Forever => f.write_str("∞"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackOptions {
    pub repetitions: Repeat,
    /// Pause between the end of one repetition and the start of the next.
    pub delay_between: Duration,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            repetitions: Repeat::Times(1),
            delay_between: Duration::from_secs(1),
        }
    }
}

impl PlaybackOptions {
    pub fn validate(&self) -> Result<()> {
        if self.repetitions == Repeat::Times(0) {
            return Err(MacroError::config_validation(
                "repetitions must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Result of a whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    /// Repetitions started, including one cut short.
    pub repetitions_run: u32,
    pub outcome: PlaybackOutcome,
}

/// Repeated playback of one macro.
pub struct PlaybackSession<B, P> {
    player: MacroPlayer<B, P>,
    options: PlaybackOptions,
}

impl<B: InputBackend, P: WindowProbe> PlaybackSession<B, P> {
    pub fn new(player: MacroPlayer<B, P>, options: PlaybackOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { player, options })
    }

    pub fn player(&self) -> &MacroPlayer<B, P> {
        &self.player
    }

    /// Runs every repetition. `on_progress(rep, total)` is called before
    /// each repetition starts, with 1-based `rep`.
    pub fn run(
        &mut self,
        events: &[MacroEvent],
        stop: &AtomicBool,
        mut on_progress: impl FnMut(u32, Repeat),
    ) -> SessionReport {
        let total = self.options.repetitions;
        let mut rep = 0u32;
        let mut outcome = PlaybackOutcome::Empty;

        loop {
            if let Repeat::Times(n) = total {
                if rep >= n {
                    break;
                }
            }
            if stop.load(Ordering::Relaxed) {
                outcome = PlaybackOutcome::Stopped;
                break;
            }

            rep = rep.saturating_add(1);
            on_progress(rep, total);
            info!("Repetition {}/{}", rep, total);

            outcome = self.player.play(events, stop);
            // A skipped pass waits for the window to come back.
            let pause = match outcome {
                PlaybackOutcome::Completed => self.options.delay_between,
                PlaybackOutcome::Skipped => self.options.delay_between.max(STOP_POLL),
                PlaybackOutcome::Stopped | PlaybackOutcome::Empty => break,
            };

            let more = match total {
                Repeat::Times(n) => rep < n,
                Repeat::Forever => true,
            };
            if more && !pause.is_zero() && !sleep_unless_stopped(pause, stop) {
                outcome = PlaybackOutcome::Stopped;
                break;
            }
        }

        SessionReport {
            repetitions_run: rep,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventKind, Key, Position};
    use crate::window::ForegroundWindow;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct RecordingBackend {
        executed: Arc<Mutex<Vec<(Instant, EventKind)>>>,
        fail_keys: bool,
    }

    impl InputBackend for RecordingBackend {
        fn name(&self) -> &'static str {
            "test"
        }

        fn execute(&mut self, event: &EventKind) -> Result<()> {
            if self.fail_keys && event.is_keyboard() {
                return Err(MacroError::invalid_key("x", "test failure"));
            }
            self.executed
                .lock()
                .unwrap()
                .push((Instant::now(), event.clone()));
            Ok(())
        }
    }

    /// Returns the titles in order, then repeats the last one.
    struct ScriptedProbe {
        titles: Vec<&'static str>,
        calls: usize,
    }

    impl ScriptedProbe {
        fn new(titles: Vec<&'static str>) -> Self {
            Self { titles, calls: 0 }
        }
    }

    impl WindowProbe for ScriptedProbe {
        fn foreground(&mut self) -> Result<Option<ForegroundWindow>> {
            let index = self.calls.min(self.titles.len() - 1);
            self.calls += 1;
            Ok(Some(ForegroundWindow {
                title: self.titles[index].to_string(),
                pid: None,
                process_name: None,
            }))
        }
    }

    fn moves(times: &[f64]) -> Vec<MacroEvent> {
        times
            .iter()
            .enumerate()
            .map(|(i, t)| MacroEvent::new(*t, EventKind::Move { pos: Position(i as i32, 0) }))
            .collect()
    }

    fn player(backend: RecordingBackend) -> MacroPlayer<RecordingBackend, ScriptedProbe> {
        MacroPlayer::new(backend, ScriptedProbe::new(vec!["any"]), WindowTarget::any())
    }

    #[test]
    fn test_empty_macro() {
        let mut player = player(RecordingBackend::default());
        let stop = AtomicBool::new(false);
        assert_eq!(player.play(&[], &stop), PlaybackOutcome::Empty);
    }

    #[test]
    fn test_replays_in_order_with_delays() {
        let backend = RecordingBackend::default();
        let executed = backend.executed.clone();
        let mut player = player(backend);
        let stop = AtomicBool::new(false);

        let started = Instant::now();
        let outcome = player.play(&moves(&[0.0, 0.03, 0.06]), &stop);

        assert_eq!(outcome, PlaybackOutcome::Completed);
        let executed = executed.lock().unwrap();
        assert_eq!(executed.len(), 3);
        assert!(executed[2].0.duration_since(started) >= Duration::from_millis(60));
        let positions: Vec<i32> = executed
            .iter()
            .map(|(_, kind)| match kind {
                EventKind::Move { pos } => pos.0,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_stop_before_start() {
        let backend = RecordingBackend::default();
        let executed = backend.executed.clone();
        let mut player = player(backend);
        let stop = AtomicBool::new(true);

        assert_eq!(
            player.play(&moves(&[0.0, 0.1]), &stop),
            PlaybackOutcome::Stopped
        );
        assert!(executed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stop_interrupts_long_delay() {
        let backend = RecordingBackend::default();
        let executed = backend.executed.clone();
        let mut player = player(backend);
        let stop = Arc::new(AtomicBool::new(false));

        let stopper = stop.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            stopper.store(true, Ordering::Relaxed);
        });

        let started = Instant::now();
        let outcome = player.play(&moves(&[0.0, 30.0]), &stop);
        handle.join().unwrap();

        assert_eq!(outcome, PlaybackOutcome::Stopped);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(executed.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_inactive_window_skips_before_start() {
        let backend = RecordingBackend::default();
        let executed = backend.executed.clone();
        let mut player = MacroPlayer::new(
            backend,
            ScriptedProbe::new(vec!["Calculator"]),
            WindowTarget::new("notepad"),
        );
        let stop = AtomicBool::new(false);

        assert_eq!(
            player.play(&moves(&[0.0]), &stop),
            PlaybackOutcome::Skipped
        );
        assert!(executed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_window_change_interrupts_playback() {
        let backend = RecordingBackend::default();
        let executed = backend.executed.clone();
        // Initial check and the first event see Notepad; the second event
        // sees another window.
        let mut player = MacroPlayer::new(
            backend,
            ScriptedProbe::new(vec!["Notepad", "Notepad", "Browser"]),
            WindowTarget::new("notepad"),
        );
        let stop = AtomicBool::new(false);

        assert_eq!(
            player.play(&moves(&[0.0, 0.01, 0.02]), &stop),
            PlaybackOutcome::Skipped
        );
        assert_eq!(executed.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_injection_errors_do_not_abort() {
        let backend = RecordingBackend {
            fail_keys: true,
            ..Default::default()
        };
        let executed = backend.executed.clone();
        let mut player = player(backend);
        let stop = AtomicBool::new(false);

        let events = vec![
            MacroEvent::new(0.0, EventKind::KeyTap { key: Key::Char('a') }),
            MacroEvent::new(0.0, EventKind::Move { pos: Position(1, 1) }),
        ];
        assert_eq!(player.play(&events, &stop), PlaybackOutcome::Completed);
        assert_eq!(player.injection_errors(), 1);
        assert_eq!(executed.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_session_runs_requested_repetitions() {
        let backend = RecordingBackend::default();
        let executed = backend.executed.clone();
        let options = PlaybackOptions {
            repetitions: Repeat::Times(3),
            delay_between: Duration::from_millis(5),
        };
        let mut session = PlaybackSession::new(player(backend), options).unwrap();
        let stop = AtomicBool::new(false);

        let mut progress = Vec::new();
        let report = session.run(&moves(&[0.0, 0.001]), &stop, |rep, total| {
            progress.push((rep, total))
        });

        assert_eq!(report.outcome, PlaybackOutcome::Completed);
        assert_eq!(report.repetitions_run, 3);
        assert_eq!(executed.lock().unwrap().len(), 6);
        assert_eq!(
            progress,
            vec![
                (1, Repeat::Times(3)),
                (2, Repeat::Times(3)),
                (3, Repeat::Times(3))
            ]
        );
    }

    #[test]
    fn test_forever_runs_until_stopped() {
        let backend = RecordingBackend::default();
        let options = PlaybackOptions {
            repetitions: Repeat::Forever,
            delay_between: Duration::from_millis(1),
        };
        let mut session = PlaybackSession::new(player(backend), options).unwrap();
        let stop = AtomicBool::new(false);

        let report = session.run(&moves(&[0.0]), &stop, |rep, _| {
            if rep == 4 {
                stop.store(true, Ordering::Relaxed);
            }
        });

        assert_eq!(report.outcome, PlaybackOutcome::Stopped);
        assert_eq!(report.repetitions_run, 4);
    }

    #[test]
    fn test_zero_repetitions_rejected() {
        let options = PlaybackOptions {
            repetitions: Repeat::Times(0),
            delay_between: Duration::ZERO,
        };
        assert!(PlaybackSession::new(player(RecordingBackend::default()), options).is_err());
    }

    #[test]
    fn test_skipped_repetition_does_not_end_session() {
        let backend = RecordingBackend::default();
        let executed = backend.executed.clone();
        let options = PlaybackOptions {
            repetitions: Repeat::Times(3),
            delay_between: Duration::ZERO,
        };
        let player = MacroPlayer::new(
            backend,
            ScriptedProbe::new(vec!["Other", "Notepad"]),
            WindowTarget::new("notepad"),
        );
        let mut session = PlaybackSession::new(player, options).unwrap();
        let stop = AtomicBool::new(false);

        let report = session.run(&moves(&[0.0]), &stop, |_, _| {});
        assert_eq!(report.outcome, PlaybackOutcome::Completed);
        assert_eq!(report.repetitions_run, 3);
        assert_eq!(executed.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_session_reports_skip_of_last_pass() {
        let options = PlaybackOptions {
            repetitions: Repeat::Times(2),
            delay_between: Duration::ZERO,
        };
        let player = MacroPlayer::new(
            RecordingBackend::default(),
            ScriptedProbe::new(vec!["Other"]),
            WindowTarget::new("notepad"),
        );
        let mut session = PlaybackSession::new(player, options).unwrap();
        let stop = AtomicBool::new(false);

        let report = session.run(&moves(&[0.0]), &stop, |_, _| {});
        assert_eq!(report.outcome, PlaybackOutcome::Skipped);
        assert_eq!(report.repetitions_run, 2);
    }

    #[test]
    fn test_out_of_range_timestamp_stops_playback() {
        let backend = RecordingBackend::default();
        let executed = backend.executed.clone();
        let mut player = player(backend);
        let stop = AtomicBool::new(false);

        assert_eq!(player.play(&moves(&[1e20]), &stop), PlaybackOutcome::Stopped);
        assert!(executed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_sleep_unless_stopped() {
        let stop = AtomicBool::new(false);
        assert!(sleep_unless_stopped(Duration::from_millis(5), &stop));
        stop.store(true, Ordering::Relaxed);
        assert!(!sleep_unless_stopped(Duration::from_secs(10), &stop));
    }

    #[test]
    fn test_sleep_past_clock_range_waits_for_stop() {
        let stop = Arc::new(AtomicBool::new(false));
        let stopper = stop.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            stopper.store(true, Ordering::Relaxed);
        });

        assert!(!sleep_unless_stopped(Duration::MAX, &stop));
        handle.join().unwrap();
    }
}
