use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::{ColoredString, Colorize};
use macro_recorder::config::{parse_duration, DEFAULT_CONFIG_FILE};
use macro_recorder::display::{group_actions, render_lines};
use macro_recorder::global_hotkey::ignored_keys;
use macro_recorder::player::SessionReport;
use macro_recorder::{
    create_backend, load_events, save_events, CaptureSession, HotkeyAction, HotkeyManager,
    MacroEvent, MacroPlayer, PlaybackEngine, PlaybackOptions, PlaybackOutcome, PlaybackSession,
    RecordMode, Repeat, Settings, SystemWindowProbe, Theme, WindowProbe, WindowTarget,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mrec", version, about = "Record and replay keyboard and mouse macros")]
struct Cli {
    /// Settings file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record input until Enter, Ctrl+C or the record hotkey
    Record {
        /// Where to save the macro
        #[arg(short, long, default_value = "macro.json")]
        output: PathBuf,

        /// keyboard_and_mouse, keyboard_only or mouse_only (defaults to the setting)
        #[arg(long)]
        mode: Option<RecordMode>,

        /// Seconds to wait before recording starts
        #[arg(long, default_value_t = 2)]
        countdown: u64,

        /// Do not echo actions while recording
        #[arg(short, long)]
        quiet: bool,
    },
    /// Replay a saved macro
    Play {
        file: PathBuf,

        /// Number of repetitions
        #[arg(short = 'n', long, default_value_t = 1, conflicts_with = "infinite")]
        repeat: u32,

        /// Repeat until stopped
        #[arg(long)]
        infinite: bool,

        /// Pause between repetitions (e.g. 500ms, 1.5s)
        #[arg(long, default_value = "1s", value_parser = parse_duration)]
        delay: Duration,

        /// rdev, enigo or direct_input (defaults to the setting)
        #[arg(long)]
        engine: Option<PlaybackEngine>,

        /// Only play while the foreground window title contains this text
        #[arg(long)]
        window: Option<String>,

        /// Seconds to wait before playback starts
        #[arg(long, default_value_t = 2)]
        countdown: u64,
    },
    /// List the actions in a saved macro
    Show { file: PathBuf },
    /// Show or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Print the current foreground window
    Window,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current settings
    Show,
    /// Change one or more settings
    Set {
        #[arg(long)]
        theme: Option<Theme>,
        #[arg(long)]
        engine: Option<PlaybackEngine>,
        #[arg(long)]
        record_mode: Option<RecordMode>,
        #[arg(long)]
        record_hotkey: Option<String>,
        #[arg(long)]
        playback_hotkey: Option<String>,
        /// Target window title; pass an empty string to disable gating
        #[arg(long)]
        window: Option<String>,
        /// 10ms (true) or 100ms (false) pause after each direct_input action
        #[arg(long)]
        optimized_pause: Option<bool>,
    },
    /// Unbind a hotkey
    ClearHotkey { which: HotkeyKind },
}

#[derive(Clone, Copy, ValueEnum)]
enum HotkeyKind {
    Record,
    Playback,
}

/// Terminal colours for the configured theme.
#[derive(Clone, Copy)]
struct Palette(Theme);

impl Palette {
    fn ok(&self, text: &str) -> ColoredString {
        match self.0 {
            Theme::Dark => text.bright_green().bold(),
            Theme::Light => text.green().bold(),
        }
    }

    fn info(&self, text: &str) -> ColoredString {
        match self.0 {
            Theme::Dark => text.bright_cyan(),
            Theme::Light => text.blue(),
        }
    }

    fn warn(&self, text: &str) -> ColoredString {
        match self.0 {
            Theme::Dark => text.bright_yellow(),
            Theme::Light => text.yellow(),
        }
    }

    fn dim(&self, text: &str) -> ColoredString {
        text.dimmed()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    let settings = Settings::load_or_default(&cli.config);
    let palette = Palette(settings.theme);

    match cli.command {
        Command::Record {
            output,
            mode,
            countdown,
            quiet,
        } => {
            let mode = mode.unwrap_or(settings.record_mode);
            record(&settings, palette, &output, mode, countdown, quiet).await
        }
        Command::Play {
            file,
            repeat,
            infinite,
            delay,
            engine,
            window,
            countdown,
        } => {
            let options = PlaybackOptions {
                repetitions: if infinite {
                    Repeat::Forever
                } else {
                    Repeat::Times(repeat)
                },
                delay_between: delay,
            };
            options.validate()?;
            let engine = engine.unwrap_or(settings.playback_engine);
            let target = match window {
                Some(title) => WindowTarget::new(title),
                None => WindowTarget::new(settings.target_window().unwrap_or_default()),
            };
            play(settings, palette, &file, options, engine, target, countdown).await
        }
        Command::Show { file } => show(palette, &file),
        Command::Config { action } => configure(settings, palette, &cli.config, action),
        Command::Window => print_window(palette),
    }
}

type ActiveHotkeys = Option<(HotkeyManager, mpsc::UnboundedReceiver<HotkeyAction>)>;

fn start_hotkeys(settings: &Settings) -> ActiveHotkeys {
    if settings.hotkeys.record.is_none() && settings.hotkeys.playback.is_none() {
        return None;
    }

    let mut manager = match HotkeyManager::new() {
        Ok(manager) => manager,
        Err(e) => {
            warn!("Global hotkeys unavailable: {}", e);
            return None;
        }
    };
    if let Err(e) = manager.register_all(&settings.hotkeys) {
        warn!("Global hotkeys unavailable: {}", e);
        return None;
    }

    let rx = manager.start_listener();
    Some((manager, rx))
}

/// Waits for the next hotkey press; never resolves when hotkeys are off.
async fn next_hotkey(hotkeys: &mut ActiveHotkeys) -> HotkeyAction {
    match hotkeys {
        Some((_, rx)) => match rx.recv().await {
            Some(action) => action,
            None => std::future::pending().await,
        },
        None => std::future::pending().await,
    }
}

async fn countdown(palette: Palette, what: &str, seconds: u64) {
    for remaining in (1..=seconds).rev() {
        println!("{}", palette.info(&format!("{} in {}...", what, remaining)));
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

fn print_listing(palette: Palette, events: &[MacroEvent]) {
    for line in render_lines(&group_actions(events)) {
        if line.starts_with("    ") {
            println!("{}", palette.dim(&line));
        } else {
            println!("{}", line);
        }
    }
}

async fn record(
    settings: &Settings,
    palette: Palette,
    output: &Path,
    mode: RecordMode,
    seconds: u64,
    quiet: bool,
) -> Result<()> {
    let mut hotkeys = start_hotkeys(settings);

    countdown(palette, "Recording", seconds).await;

    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    let session = CaptureSession::begin(
        mode,
        ignored_keys(&settings.hotkeys),
        Some(Box::new(move |line: &str| {
            let _ = line_tx.send(line.to_string());
        })),
    )
    .context("failed to start recording")?;

    let stop_hint = match &settings.hotkeys.record {
        Some(key) if hotkeys.is_some() => format!("Enter, Ctrl+C or {}", key),
        _ => "Enter or Ctrl+C".to_string(),
    };
    println!(
        "{}",
        palette.ok(&format!("Recording ({}). Press {} to stop.", mode, stop_hint))
    );

    // A plain thread: a blocking task stuck on stdin would hold up runtime shutdown.
    let (enter_tx, mut enter_rx) = tokio::sync::oneshot::channel::<()>();
    std::thread::spawn(move || {
        let mut line = String::new();
        if matches!(std::io::stdin().read_line(&mut line), Ok(n) if n > 0) {
            let _ = enter_tx.send(());
        }
    });
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            Some(line) = line_rx.recv() => {
                if !quiet {
                    println!("{}", palette.dim(&line));
                }
            }
            _ = &mut ctrl_c => break,
            Ok(()) = &mut enter_rx => break,
            action = next_hotkey(&mut hotkeys) => {
                if action == HotkeyAction::ToggleRecording {
                    break;
                }
            }
        }
    }

    let events = session.finish();
    println!("{}", palette.ok("Recording stopped."));

    if events.is_empty() {
        println!("{}", palette.warn("No actions recorded, nothing saved."));
        return Ok(());
    }

    print_listing(palette, &events);
    save_events(output, &events)?;
    println!(
        "{}",
        palette.ok(&format!(
            "Saved {} actions to {}",
            events.len(),
            output.display()
        ))
    );
    Ok(())
}

async fn play(
    settings: Settings,
    palette: Palette,
    file: &Path,
    options: PlaybackOptions,
    engine: PlaybackEngine,
    target: WindowTarget,
    seconds: u64,
) -> Result<()> {
    let events = load_events(file)?;
    if events.is_empty() {
        println!("{}", palette.warn("The macro has no actions."));
        return Ok(());
    }

    let mut hotkeys = start_hotkeys(&settings);
    countdown(palette, "Playing", seconds).await;

    let stop = Arc::new(AtomicBool::new(false));
    let worker_stop = stop.clone();
    debug!(%engine, ?options, "Starting playback");

    let worker = tokio::task::spawn_blocking(move || -> macro_recorder::Result<SessionReport> {
        let backend = create_backend(engine, &settings)?;
        let player = MacroPlayer::new(backend, SystemWindowProbe::new(), target);
        let mut session = PlaybackSession::new(player, options)?;
        Ok(session.run(&events, &worker_stop, |rep, total| {
            println!("{}", palette.info(&format!("Repetition: {}/{}", rep, total)));
        }))
    });
    tokio::pin!(worker);

    println!(
        "{}",
        palette.ok(&format!("Playing with {}. Press Ctrl+C to stop.", engine))
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut stopping = false;

    let report = loop {
        tokio::select! {
            result = &mut worker => break result.context("playback worker panicked")??,
            _ = &mut ctrl_c, if !stopping => {
                stopping = true;
                stop.store(true, Ordering::Relaxed);
                println!("{}", palette.warn("Stopping..."));
            }
            action = next_hotkey(&mut hotkeys), if !stopping => {
                if action == HotkeyAction::TogglePlayback {
                    stopping = true;
                    stop.store(true, Ordering::Relaxed);
                    println!("{}", palette.warn("Stopping..."));
                }
            }
        }
    };

    let message = format!("Playback {}", report.outcome);
    match report.outcome {
        PlaybackOutcome::Completed => println!("{}", palette.ok(&message)),
        _ => println!("{}", palette.warn(&message)),
    }
    Ok(())
}

fn show(palette: Palette, file: &Path) -> Result<()> {
    let events = load_events(file)?;
    println!(
        "{}",
        palette.info(&format!("{}: {} actions", file.display(), events.len()))
    );
    print_listing(palette, &events);
    Ok(())
}

fn configure(
    mut settings: Settings,
    palette: Palette,
    path: &Path,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
            return Ok(());
        }
        ConfigAction::Set {
            theme,
            engine,
            record_mode,
            record_hotkey,
            playback_hotkey,
            window,
            optimized_pause,
        } => {
            if let Some(theme) = theme {
                if theme != settings.theme {
                    println!("{}", palette.warn("The new theme applies from the next run."));
                }
                settings.theme = theme;
            }
            if let Some(engine) = engine {
                settings.playback_engine = engine;
            }
            if let Some(mode) = record_mode {
                settings.record_mode = mode;
            }
            if let Some(key) = record_hotkey {
                settings.hotkeys.record = Some(key);
            }
            if let Some(key) = playback_hotkey {
                settings.hotkeys.playback = Some(key);
            }
            if let Some(title) = window {
                settings.window_specific_title = title;
            }
            if let Some(pause) = optimized_pause {
                settings.direct_input_optimized_pause = pause;
            }
        }
        ConfigAction::ClearHotkey { which } => match which {
            HotkeyKind::Record => settings.hotkeys.record = None,
            HotkeyKind::Playback => settings.hotkeys.playback = None,
        },
    }

    settings.validate()?;
    settings.save(path)?;
    println!("{}", palette.ok("Settings saved."));
    Ok(())
}

fn print_window(palette: Palette) -> Result<()> {
    let mut probe = SystemWindowProbe::new();
    match probe.foreground()? {
        Some(window) => {
            println!("{} {}", palette.info("Title:"), window.title);
            if let Some(name) = window.process_name {
                println!("{} {}", palette.info("Process:"), name);
            }
            if let Some(pid) = window.pid {
                println!("{} {}", palette.info("PID:"), pid);
            }
        }
        None => println!("{}", palette.warn("No window has focus.")),
    }
    Ok(())
}
