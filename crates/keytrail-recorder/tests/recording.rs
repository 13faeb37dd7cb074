//! End to end: scripted input through the recorder threads, then storage
//! and playback against fakes.

use crossbeam_channel::{Receiver, Sender};
use keytrail_core::{ManualClock, NoWindows, Result, WindowInfo};
use keytrail_recorder::prelude::*;
use keytrail_recorder::storage;
use parking_lot::Mutex;
use std::thread;
use std::time::{Duration, Instant};

struct Focused(&'static str);

impl WindowService for Focused {
    fn active_window_title(&self) -> Option<String> {
        Some(self.0.to_string())
    }

    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        Ok(vec![WindowInfo {
            id: 1,
            title: self.0.to_string(),
        }])
    }

    fn activate(&self, _window: &WindowInfo) -> Result<()> {
        Ok(())
    }
}

/// Blocks the translator inside a focus lookup until released
struct Gated {
    entered: Sender<()>,
    release: Receiver<()>,
}

impl WindowService for Gated {
    fn active_window_title(&self) -> Option<String> {
        let _ = self.entered.send(());
        let _ = self.release.recv();
        Some("Editor".to_string())
    }

    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        Ok(Vec::new())
    }

    fn activate(&self, _window: &WindowInfo) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct Script {
    calls: Mutex<Vec<String>>,
}

impl Script {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn log(&self, call: String) -> Result<()> {
        self.calls.lock().push(call);
        Ok(())
    }
}

impl InputSimulator for Script {
    fn type_text(&self, text: &str) -> Result<()> {
        self.log(format!("type {:?}", text))
    }

    fn press_enter(&self) -> Result<()> {
        self.log("enter".into())
    }

    fn press_tab(&self) -> Result<()> {
        self.log("tab".into())
    }

    fn press_key(&self, key: &Key) -> Result<()> {
        self.log(format!("key {}", key))
    }

    fn press_combo(&self, modifier: Modifier, key: &Key) -> Result<()> {
        self.log(format!("combo {}+{}", modifier, key))
    }

    fn click(&self, button: MouseButton, x: i32, y: i32) -> Result<()> {
        self.log(format!("click {} {} {}", button, x, y))
    }

    fn move_to(&self, x: i32, y: i32) -> Result<()> {
        self.log(format!("move {} {}", x, y))
    }

    fn scroll(&self, direction: ScrollDirection) -> Result<()> {
        self.log(format!("scroll {}", direction))
    }
}

fn key(c: char, keycode: u32) -> RawEvent {
    RawEvent::key(Key::Char(c), keycode)
}

fn session() -> Vec<RawEvent> {
    vec![
        RawEvent::MouseDown {
            button: MouseButton::Left,
            x: 300,
            y: 40,
        },
        RawEvent::MouseUp {
            button: MouseButton::Left,
            x: 300,
            y: 40,
        },
        key('l', 46),
        key('s', 39),
        RawEvent::key(Key::Space, 65),
        RawEvent::key_with(Key::Char('1'), 10, &[Modifier::Shift]),
        RawEvent::key(Key::Enter, 36),
        RawEvent::key_with(Key::Char('c'), 54, &[Modifier::Control]),
        RawEvent::ScrollDown,
        RawEvent::key_with(Key::Char('z'), 52, &[Modifier::Alt]),
        // after the hotkey
        key('q', 24),
    ]
}

fn expected() -> ActionLog {
    ActionLog::new(vec![
        Action::Window {
            activate: "Terminal".into(),
        },
        Action::Mouse {
            button: MouseButton::Left,
            x: 300,
            y: 40,
        },
        Action::type_text("ls ){enter}"),
        Action::Combo {
            modifier: Modifier::Control,
            key: Key::Char('c'),
        },
        Action::MouseWheel {
            direction: ScrollDirection::Down,
        },
    ])
}

fn wait_for(handle: &RecordingHandle, events: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while handle.events_seen() < events {
        assert!(Instant::now() < deadline, "translator stalled");
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn hotkey_ends_recording() {
    let handle = Recorder::new().start(session(), Focused("Terminal")).unwrap();
    let log = handle.wait().unwrap();
    assert_eq!(log, expected());
}

#[test]
fn exhausted_source_ends_recording() {
    let events = vec![key('h', 43), key('i', 31)];
    let handle = Recorder::new().start(events, NoWindows).unwrap();
    let log = handle.wait().unwrap();
    assert_eq!(log.actions(), &[Action::type_text("hi")]);
}

#[test]
fn stop_from_another_thread() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let handle = Recorder::new().start(rx, Focused("Editor")).unwrap();

    tx.send(key('o', 32)).unwrap();
    tx.send(key('k', 45)).unwrap();
    wait_for(&handle, 2);
    assert!(handle.is_running());

    let log = thread::spawn(move || handle.stop().unwrap()).join().unwrap();
    assert_eq!(log.actions(), &[Action::type_text("ok")]);
    assert!(tx.send(key('x', 53)).is_err());
}

#[test]
fn queued_events_are_dropped_after_stop_request() {
    let (entered_tx, entered) = crossbeam_channel::bounded(1);
    let (release, release_rx) = crossbeam_channel::bounded(1);
    let windows = Gated {
        entered: entered_tx,
        release: release_rx,
    };
    let events = vec![
        RawEvent::MouseDown {
            button: MouseButton::Left,
            x: 5,
            y: 6,
        },
        key('a', 38),
        key('b', 56),
        RawEvent::ScrollUp,
    ];
    let handle = Recorder::new().start(events, windows).unwrap();

    // The translator is now inside the click, with the rest queued
    entered.recv_timeout(Duration::from_secs(5)).unwrap();
    handle.request_stop();
    assert!(!handle.is_running());
    thread::sleep(Duration::from_millis(20));
    release.send(()).unwrap();

    let log = handle.wait().unwrap();
    assert_eq!(
        log.actions(),
        &[
            Action::Window {
                activate: "Editor".into(),
            },
            Action::Mouse {
                button: MouseButton::Left,
                x: 5,
                y: 6,
            },
        ]
    );
}

#[test]
fn capture_level_filters_devices() {
    let config = RecorderConfig {
        translator: TranslatorConfig {
            level: CaptureLevel::Keyboard,
            ..Default::default()
        },
        ..Default::default()
    };
    let log = Recorder::with_config(config)
        .start(session(), Focused("Terminal"))
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(
        log.actions(),
        &[
            Action::type_text("ls ){enter}"),
            Action::Combo {
                modifier: Modifier::Control,
                key: Key::Char('c'),
            },
        ]
    );
}

#[test]
fn mouse_only_still_honours_hotkey() {
    let config = RecorderConfig {
        translator: TranslatorConfig {
            level: CaptureLevel::Mouse,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut events = session();
    events.push(RawEvent::MouseMove { x: 1, y: 1 });
    let log = Recorder::with_config(config)
        .start(events, Focused("Terminal"))
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(log.len(), 3);
    assert!(!log.iter().any(|a| matches!(a, Action::MouseMove { .. })));
}

#[test]
fn recorded_log_survives_storage_and_replays() {
    let log = Recorder::new()
        .start(session(), Focused("Terminal"))
        .unwrap()
        .wait()
        .unwrap();

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("session.xml");
    storage::save_to(&path, &log).unwrap();
    let loaded = storage::load_from(&path).unwrap();
    assert_eq!(loaded, log);

    let script = Script::default();
    let stats = Player::new(&script, Focused("Terminal"))
        .with_clock(ManualClock::new())
        .play(&loaded)
        .unwrap();

    assert_eq!(
        script.calls(),
        vec![
            "click left 300 40",
            "type \"ls )\\n\"",
            "combo control+c",
            "scroll down",
        ]
    );
    assert_eq!(stats.actions, 5);
    assert_eq!(stats.windows, 1);
}
