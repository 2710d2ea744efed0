use anyhow::Result;
use macro_recorder::config::{parse_duration, Hotkeys};
use macro_recorder::display::group_actions;
use macro_recorder::global_hotkey::ignored_keys;
use macro_recorder::recorder::InputEvent;
use macro_recorder::window::ForegroundWindow;
use macro_recorder::{
    load_events, save_events, EventKind, InputBackend, Key, MacroError, MacroEvent, MacroPlayer,
    MacroRecorder, MouseButton, NamedKey, PlaybackEngine, PlaybackOptions, PlaybackOutcome,
    PlaybackSession, Position, RecordMode, Repeat, Settings, Theme, WindowProbe, WindowTarget,
};
use std::io::Write;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

#[derive(Default, Clone)]
struct CollectingBackend {
    events: Arc<Mutex<Vec<EventKind>>>,
}

impl InputBackend for CollectingBackend {
    fn name(&self) -> &'static str {
        "collect"
    }

    fn execute(&mut self, event: &EventKind) -> macro_recorder::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

struct TitleProbe(&'static str);

impl WindowProbe for TitleProbe {
    fn foreground(&mut self) -> macro_recorder::Result<Option<ForegroundWindow>> {
        Ok(Some(ForegroundWindow {
            title: self.0.to_string(),
            pid: Some(1234),
            process_name: Some("notepad.exe".to_string()),
        }))
    }
}

#[test]
fn test_legacy_macro_file() -> Result<()> {
    let json = r#"
    [
        {"time": 0.0, "type": "move", "pos": [100, 200]},
        {"time": 0.25, "type": "click", "pos": [100, 200], "button": "Button.left", "pressed": true},
        {"time": 0.31, "type": "click", "pos": [100, 200], "button": "Button.left", "pressed": false},
        {"time": 0.9, "type": "key_tap", "key": "h"},
        {"time": 1.2, "type": "key_press", "key": "Key.shift"},
        {"time": 1.6, "type": "key_release", "key": "Key.shift"},
        {"time": 2.0, "type": "scroll", "pos": [100, 200], "scroll": [0, -1]}
    ]
    "#;

    let mut file = NamedTempFile::new()?;
    file.write_all(json.as_bytes())?;

    let events = load_events(file.path())?;
    assert_eq!(events.len(), 7);
    assert_eq!(
        events[1].kind,
        EventKind::Click {
            pos: Position(100, 200),
            button: MouseButton::Left,
            pressed: true,
        }
    );
    assert_eq!(
        events[4].kind,
        EventKind::KeyPress {
            key: Key::Named(NamedKey::Shift)
        }
    );
    assert_eq!(
        events[6].kind,
        EventKind::Scroll {
            pos: Position(100, 200),
            scroll: (0, -1),
        }
    );

    Ok(())
}

#[test]
fn test_macro_save_load_roundtrip() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join("macro.json");

    let original = vec![
        MacroEvent::new(0.0, EventKind::KeyTap { key: Key::Char('a') }),
        MacroEvent::new(
            0.5,
            EventKind::KeyPress {
                key: Key::Named(NamedKey::CtrlRight),
            },
        ),
        MacroEvent::new(0.75, EventKind::Move { pos: Position(-5, 1080) }),
    ];

    save_events(&path, &original)?;
    let loaded = load_events(&path)?;
    assert_eq!(loaded, original);

    // Keys and buttons are stored as plain strings.
    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(raw[1]["key"], "ctrl_r");
    assert_eq!(raw[2]["pos"], serde_json::json!([-5, 1080]));

    Ok(())
}

#[test]
fn test_saving_empty_macro_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("empty.json");

    let result = save_events(&path, &[]);
    assert!(matches!(result, Err(MacroError::NothingToSave)));
    assert!(!path.exists());
}

#[test]
fn test_loading_garbage_fails() -> Result<()> {
    let mut file = NamedTempFile::new()?;
    file.write_all(b"{ not json")?;
    assert!(matches!(
        load_events(file.path()),
        Err(MacroError::MacroLoad { .. })
    ));

    assert!(load_events("/nonexistent/dir/macro.json").is_err());
    Ok(())
}

#[test]
fn test_settings_file() -> Result<()> {
    let json = r#"
    {
        "theme": "light",
        "playback_engine": "direct_input",
        "record_mode": "keyboard_only",
        "hotkeys": {"record": "f9", "playback": null},
        "window_specific_title": "Notepad",
        "direct_input_optimized_pause": false
    }
    "#;

    let mut file = NamedTempFile::new()?;
    file.write_all(json.as_bytes())?;

    let settings = Settings::load(file.path())?;
    assert_eq!(settings.theme, Theme::Light);
    assert_eq!(settings.playback_engine, PlaybackEngine::DirectInput);
    assert_eq!(settings.record_mode, RecordMode::KeyboardOnly);
    assert_eq!(settings.hotkeys.record.as_deref(), Some("f9"));
    assert!(settings.hotkeys.playback.is_none());
    assert_eq!(settings.target_window(), Some("Notepad"));
    assert_eq!(settings.direct_input_pause(), Duration::from_millis(100));
    assert!(settings.validate().is_ok());

    Ok(())
}

#[test]
fn test_settings_from_desktop_app() -> Result<()> {
    let json = r#"
    {
        "theme": "dark",
        "playback_engine": "Pynput (Padrão)",
        "record_mode": "Teclado e Mouse",
        "hotkeys": {"record": "f9", "playback": "f10"},
        "window_specific_title": "Notepad",
        "pydirectinput_optimized_pause": false
    }
    "#;

    let mut file = NamedTempFile::new()?;
    file.write_all(json.as_bytes())?;

    let settings = Settings::load_or_default(file.path());
    assert_eq!(settings.playback_engine, PlaybackEngine::Rdev);
    assert_eq!(settings.record_mode, RecordMode::KeyboardAndMouse);
    assert_eq!(settings.hotkeys.playback.as_deref(), Some("f10"));
    assert_eq!(settings.window_specific_title, "Notepad");
    assert!(!settings.direct_input_optimized_pause);
    assert!(settings.validate().is_ok());

    Ok(())
}

#[test]
fn test_combo_hotkey_keys_are_still_recorded() {
    let hotkeys = Hotkeys {
        record: None,
        playback: Some("ctrl+p".to_string()),
    };
    let mut recorder = MacroRecorder::new(RecordMode::KeyboardOnly);
    let t0 = Instant::now();
    let ms = Duration::from_millis;

    recorder.start(t0, ignored_keys(&hotkeys), None);
    recorder.handle(InputEvent::KeyDown(Key::Char('p')), t0 + ms(10));
    recorder.handle(InputEvent::KeyUp(Key::Char('p')), t0 + ms(50));
    recorder.handle(InputEvent::KeyDown(Key::Named(NamedKey::Ctrl)), t0 + ms(60));
    recorder.handle(InputEvent::KeyUp(Key::Named(NamedKey::Ctrl)), t0 + ms(90));
    recorder.stop(t0 + ms(100));

    let keys: Vec<EventKind> = recorder.take_events().into_iter().map(|e| e.kind).collect();
    assert_eq!(
        keys,
        vec![
            EventKind::KeyTap { key: Key::Char('p') },
            EventKind::KeyTap {
                key: Key::Named(NamedKey::Ctrl)
            },
        ]
    );
}

#[test]
fn test_settings_defaults_when_missing_or_corrupt() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let missing = temp_dir.path().join("config.json");
    assert_eq!(Settings::load_or_default(&missing), Settings::default());

    let mut corrupt = NamedTempFile::new()?;
    corrupt.write_all(b"{\"theme\": ")?;
    assert_eq!(Settings::load_or_default(corrupt.path()), Settings::default());
    assert!(Settings::load(corrupt.path()).is_err());

    Ok(())
}

#[test]
fn test_settings_save_load_roundtrip() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join("config.json");

    let original = Settings {
        theme: Theme::Light,
        playback_engine: PlaybackEngine::Enigo,
        record_mode: RecordMode::MouseOnly,
        hotkeys: Hotkeys {
            record: Some("ctrl+shift+r".to_string()),
            playback: Some("f10".to_string()),
        },
        window_specific_title: "Game".to_string(),
        direct_input_optimized_pause: true,
    };

    original.save(&path)?;
    assert_eq!(Settings::load(&path)?, original);
    Ok(())
}

#[test]
fn test_recorded_macro_replays_in_target_window() {
    let mut recorder = MacroRecorder::new(RecordMode::KeyboardAndMouse);
    let t0 = Instant::now();
    let ms = Duration::from_millis;

    recorder.start(t0, [Key::Named(NamedKey::F9)], None);
    recorder.handle(InputEvent::Move(Position(10, 10)), t0 + ms(5));
    recorder.handle(InputEvent::KeyDown(Key::Char('x')), t0 + ms(10));
    recorder.handle(InputEvent::KeyUp(Key::Char('x')), t0 + ms(40));
    recorder.handle(InputEvent::KeyDown(Key::Named(NamedKey::F9)), t0 + ms(45));
    recorder.handle(InputEvent::KeyUp(Key::Named(NamedKey::F9)), t0 + ms(50));
    recorder.stop(t0 + ms(60));
    let events = recorder.take_events();
    assert_eq!(events.len(), 2);

    let backend = CollectingBackend::default();
    let replayed = backend.events.clone();
    let player = MacroPlayer::new(backend, TitleProbe("Untitled - Notepad"), WindowTarget::new("notepad"));
    let options = PlaybackOptions {
        repetitions: Repeat::Times(2),
        delay_between: Duration::from_millis(1),
    };
    let mut session = PlaybackSession::new(player, options).unwrap();
    let stop = AtomicBool::new(false);

    let report = session.run(&events, &stop, |_, _| {});
    assert_eq!(report.outcome, PlaybackOutcome::Completed);
    assert_eq!(report.repetitions_run, 2);

    let replayed = replayed.lock().unwrap();
    assert_eq!(replayed.len(), 4);
    assert_eq!(replayed[0], EventKind::Move { pos: Position(10, 10) });
    assert_eq!(replayed[1], EventKind::KeyTap { key: Key::Char('x') });
}

#[test]
fn test_playback_skipped_in_other_window() {
    let backend = CollectingBackend::default();
    let replayed = backend.events.clone();
    let mut player = MacroPlayer::new(backend, TitleProbe("Spreadsheet"), WindowTarget::new("game"));
    let stop = AtomicBool::new(false);

    let events = vec![MacroEvent::new(0.0, EventKind::Move { pos: Position(1, 1) })];
    assert_eq!(player.play(&events, &stop), PlaybackOutcome::Skipped);
    assert!(replayed.lock().unwrap().is_empty());
}

#[test]
fn test_listing_of_loaded_macro() -> Result<()> {
    let events: Vec<MacroEvent> = serde_json::from_str(
        r#"[
            {"time": 0.0, "type": "move", "pos": [1, 1]},
            {"time": 0.1, "type": "move", "pos": [2, 2]},
            {"time": 0.2, "type": "key_tap", "key": "space"},
            {"time": 0.4, "type": "key_tap", "key": "space"}
        ]"#,
    )?;

    let rows = group_actions(&events);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].details, "2 moves in 0.10s");
    assert_eq!(rows[1].action, "Tap key [x2]");
    Ok(())
}

#[test]
fn test_delay_parsing_for_playback() {
    assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
    assert_eq!(parse_duration("5S").unwrap(), Duration::from_secs(5));
    assert_eq!(parse_duration(" 2m ").unwrap(), Duration::from_secs(120));

    assert!(parse_duration("").is_err());
    assert!(parse_duration("fast").is_err());
    assert!(parse_duration("1000x").is_err());
    assert!(parse_duration("-1000ms").is_err());
}

#[test]
fn test_error_types() {
    let err = MacroError::invalid_key("xyz", "not recognized");
    assert!(err.to_string().contains("xyz"));

    let err = MacroError::macro_load("a.json", "bad");
    assert!(err.to_string().contains("a.json"));

    let err = MacroError::config_validation("missing field");
    assert!(err.to_string().contains("missing field"));
}
