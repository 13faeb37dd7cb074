//! Action log playback
//!
//! Actions run one at a time, in log order, and the first failure aborts
//! the run. A `Sleep` blocks the player itself.

use keytrail_core::{
    split_typed, Action, ActionLog, Clock, Error, InputSimulator, Key, Result, SystemClock,
    TypedPart, WindowService,
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Playback speed (1.0 = real-time, 2.0 = 2x speed)
    pub speed: f64,
    /// Wait before the first action, not scaled by `speed`
    pub start_delay: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            start_delay: Duration::ZERO,
        }
    }
}

impl PlayerConfig {
    /// `speed` must be finite and positive
    pub fn validate(&self) -> Result<()> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(Error::invalid_value("speed", &self.speed.to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackStats {
    pub actions: usize,
    pub clicks: usize,
    pub moves: usize,
    pub scrolls: usize,
    pub keys: usize,
    pub text_chars: usize,
    pub windows: usize,
    pub slept_secs: u64,
}

/// Replays action logs through an input simulator and a window service
pub struct Player<I, W> {
    input: I,
    windows: W,
    clock: Arc<dyn Clock>,
    config: PlayerConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl<I: InputSimulator, W: WindowService> Player<I, W> {
    pub fn new(input: I, windows: W) -> Self {
        Self {
            input,
            windows,
            clock: Arc::new(SystemClock),
            config: PlayerConfig::default(),
            cancel: None,
        }
    }

    pub fn with_config(mut self, config: PlayerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn speed(mut self, speed: f64) -> Self {
        self.config.speed = speed;
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Flag checked between actions; setting it ends playback with a
    /// `Cancelled` error before the next action starts
    pub fn cancel_on(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Replay a log
    pub fn play(&self, log: &ActionLog) -> Result<PlaybackStats> {
        self.config.validate()?;
        let mut stats = PlaybackStats::default();

        if !self.config.start_delay.is_zero() {
            self.clock.sleep(self.config.start_delay);
        }

        for (index, action) in log.iter().enumerate() {
            if self.is_cancelled() {
                return Err(Error::cancelled(index));
            }
            tracing::debug!(index, ?action, "play");
            self.execute(action, &mut stats).map_err(|e| {
                tracing::warn!(index, tag = action.tag(), "playback failed: {}", e);
                e.extend_context(serde_json::json!({
                    "index": index,
                    "tag": action.tag(),
                }))
            })?;
            stats.actions += 1;
        }

        Ok(stats)
    }

    fn execute(&self, action: &Action, stats: &mut PlaybackStats) -> Result<()> {
        match action {
            Action::Type { text } => {
                for part in split_typed(text) {
                    match part {
                        TypedPart::Text(run) => {
                            self.input.type_text(&run)?;
                            stats.text_chars += run.chars().count();
                        }
                        TypedPart::Key(Key::Tab) => {
                            self.input.press_tab()?;
                            stats.keys += 1;
                        }
                        TypedPart::Key(key) => {
                            self.input.press_key(&key)?;
                            stats.keys += 1;
                        }
                    }
                }
            }
            Action::Enter => {
                self.input.press_enter()?;
                stats.keys += 1;
            }
            Action::Tab { times } => {
                for _ in 0..*times {
                    self.input.press_tab()?;
                }
                stats.keys += *times as usize;
            }
            Action::Sleep { duration } => {
                self.pause(*duration)?;
                stats.slept_secs = stats.slept_secs.saturating_add(*duration);
            }
            Action::Combo { modifier, key } => {
                self.input.press_combo(*modifier, key)?;
                stats.keys += 1;
            }
            Action::Mouse { button, x, y } => {
                self.input.click(*button, *x, *y)?;
                stats.clicks += 1;
            }
            Action::MouseMove { x, y } => {
                self.input.move_to(*x, *y)?;
                stats.moves += 1;
            }
            Action::MouseWheel { direction } => {
                self.input.scroll(*direction)?;
                stats.scrolls += 1;
            }
            Action::Window { activate } => {
                let window = self.windows.activate_by_title(activate)?;
                tracing::debug!(id = window.id, title = %window.title, "window activated");
                stats.windows += 1;
            }
        }
        Ok(())
    }

    fn pause(&self, seconds: u64) -> Result<()> {
        if seconds == 0 {
            return Ok(());
        }
        let scaled = Duration::try_from_secs_f64(seconds as f64 / self.config.speed)
            .map_err(|_| Error::invalid_value("sleep duration", &seconds.to_string()))?;
        self.clock.sleep(scaled);
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keytrail_core::{
        ErrorCode, Key, ManualClock, Modifier, MouseButton, ScrollDirection, WindowInfo,
    };
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Type(String),
        Enter,
        Tab,
        Key(Key),
        Combo(Modifier, Key),
        Click(MouseButton, i32, i32),
        Move(i32, i32),
        Scroll(ScrollDirection),
        Activate(String),
        Sleep(Duration),
    }

    type Calls = Arc<Mutex<Vec<Call>>>;

    /// Simulator, window service and clock writing into one call list
    #[derive(Clone, Default)]
    struct Fake {
        calls: Calls,
        windows: Vec<WindowInfo>,
        fail_clicks: bool,
    }

    impl Fake {
        fn with_windows(titles: &[&str]) -> Self {
            Self {
                windows: titles
                    .iter()
                    .enumerate()
                    .map(|(i, t)| WindowInfo {
                        id: i as u64 + 1,
                        title: t.to_string(),
                    })
                    .collect(),
                ..Default::default()
            }
        }

        fn record(&self, call: Call) -> Result<()> {
            self.calls.lock().push(call);
            Ok(())
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }
    }

    impl InputSimulator for Fake {
        fn type_text(&self, text: &str) -> Result<()> {
            self.record(Call::Type(text.to_string()))
        }

        fn press_enter(&self) -> Result<()> {
            self.record(Call::Enter)
        }

        fn press_tab(&self) -> Result<()> {
            self.record(Call::Tab)
        }

        fn press_key(&self, key: &Key) -> Result<()> {
            self.record(Call::Key(key.clone()))
        }

        fn press_combo(&self, modifier: Modifier, key: &Key) -> Result<()> {
            self.record(Call::Combo(modifier, key.clone()))
        }

        fn click(&self, button: MouseButton, x: i32, y: i32) -> Result<()> {
            if self.fail_clicks {
                return Err(Error::simulation_failed("click", "no display"));
            }
            self.record(Call::Click(button, x, y))
        }

        fn move_to(&self, x: i32, y: i32) -> Result<()> {
            self.record(Call::Move(x, y))
        }

        fn scroll(&self, direction: ScrollDirection) -> Result<()> {
            self.record(Call::Scroll(direction))
        }
    }

    impl WindowService for Fake {
        fn active_window_title(&self) -> Option<String> {
            None
        }

        fn list_windows(&self) -> Result<Vec<WindowInfo>> {
            Ok(self.windows.clone())
        }

        fn activate(&self, window: &WindowInfo) -> Result<()> {
            self.record(Call::Activate(window.title.clone()))
        }
    }

    impl Clock for Fake {
        fn now(&self) -> std::time::Instant {
            std::time::Instant::now()
        }

        fn sleep(&self, duration: Duration) {
            self.calls.lock().push(Call::Sleep(duration));
        }
    }

    fn player(fake: &Fake) -> Player<Fake, Fake> {
        Player::new(fake.clone(), fake.clone()).with_clock(fake.clone())
    }

    #[test]
    fn plays_actions_in_order_with_nothing_extra() {
        let fake = Fake::default();
        let log = ActionLog::new(vec![
            Action::type_text("hi"),
            Action::Enter,
            Action::Sleep { duration: 1 },
            Action::Mouse {
                button: MouseButton::Left,
                x: 10,
                y: 20,
            },
        ]);

        let stats = player(&fake).play(&log).unwrap();

        assert_eq!(
            fake.calls(),
            vec![
                Call::Type("hi".into()),
                Call::Enter,
                Call::Sleep(Duration::from_secs(1)),
                Call::Click(MouseButton::Left, 10, 20),
            ]
        );
        assert_eq!(stats.actions, 4);
        assert_eq!(stats.clicks, 1);
        assert_eq!(stats.slept_secs, 1);
    }

    #[test]
    fn enter_placeholder_becomes_newline() {
        let fake = Fake::default();
        let log = ActionLog::new(vec![Action::type_text("ls{enter}pwd{enter}")]);
        player(&fake).play(&log).unwrap();
        assert_eq!(fake.calls(), vec![Call::Type("ls\npwd\n".into())]);
    }

    #[test]
    fn tab_is_pressed_times_times() {
        let fake = Fake::default();
        let log = ActionLog::new(vec![Action::Tab { times: 3 }]);
        let stats = player(&fake).play(&log).unwrap();
        assert_eq!(fake.calls(), vec![Call::Tab, Call::Tab, Call::Tab]);
        assert_eq!(stats.keys, 3);
    }

    #[test]
    fn pointer_and_combo_actions_dispatch() {
        let fake = Fake::default();
        let log = ActionLog::new(vec![
            Action::MouseMove { x: 1, y: 2 },
            Action::MouseWheel {
                direction: ScrollDirection::Up,
            },
            Action::Combo {
                modifier: Modifier::Control,
                key: Key::Char('s'),
            },
        ]);
        player(&fake).play(&log).unwrap();
        assert_eq!(
            fake.calls(),
            vec![
                Call::Move(1, 2),
                Call::Scroll(ScrollDirection::Up),
                Call::Combo(Modifier::Control, Key::Char('s')),
            ]
        );
    }

    #[test]
    fn window_activates_exact_title_match() {
        let fake = Fake::with_windows(&["Terminal - bash", "Terminal"]);
        let log = ActionLog::new(vec![Action::Window {
            activate: "Terminal".into(),
        }]);
        player(&fake).play(&log).unwrap();
        assert_eq!(fake.calls(), vec![Call::Activate("Terminal".into())]);
    }

    #[test]
    fn missing_window_fails_and_stops_playback() {
        let fake = Fake::with_windows(&["Editor"]);
        let log = ActionLog::new(vec![
            Action::type_text("a"),
            Action::Window {
                activate: "Terminal".into(),
            },
            Action::type_text("b"),
        ]);
        let err = player(&fake).play(&log).unwrap_err();
        assert!(err.is(ErrorCode::WindowNotFound));
        let ctx = err.context.as_ref().unwrap();
        assert_eq!(ctx["index"], 1);
        assert_eq!(ctx["tag"], "window");
        assert_eq!(ctx["title"], "Terminal");
        assert_eq!(fake.calls(), vec![Call::Type("a".into())]);
    }

    #[test]
    fn named_key_placeholders_are_pressed() {
        let fake = Fake::default();
        let log = ActionLog::new(vec![Action::type_text("cat{backspace}{tab}x{enter}")]);
        let stats = player(&fake).play(&log).unwrap();
        assert_eq!(
            fake.calls(),
            vec![
                Call::Type("cat".into()),
                Call::Key(Key::named("backspace")),
                Call::Tab,
                Call::Type("x\n".into()),
            ]
        );
        assert_eq!(stats.keys, 2);
        assert_eq!(stats.text_chars, 5);
    }

    #[test]
    fn oversized_sleep_is_an_error() {
        let fake = Fake::default();
        let log = ActionLog::from_xml(
            r#"<keytrail><sleep duration="18446744073709551615"/><enter/></keytrail>"#,
        )
        .unwrap();
        let err = player(&fake).play(&log).unwrap_err();
        assert!(err.is(ErrorCode::InvalidValue));
        assert_eq!(err.context.as_ref().unwrap()["index"], 0);
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn tiny_speed_overflowing_a_pause_is_an_error() {
        let fake = Fake::default();
        let log = ActionLog::new(vec![Action::Sleep { duration: 1 }]);
        let err = player(&fake).speed(1e-300).play(&log).unwrap_err();
        assert!(err.is(ErrorCode::InvalidValue));
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn non_positive_speed_is_rejected_before_playback() {
        let fake = Fake::default();
        let log = ActionLog::new(vec![Action::Enter]);
        for speed in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = player(&fake).speed(speed).play(&log).unwrap_err();
            assert!(err.is(ErrorCode::InvalidValue));
        }
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn simulator_failure_is_fatal() {
        let fake = Fake {
            fail_clicks: true,
            ..Default::default()
        };
        let log = ActionLog::new(vec![
            Action::Mouse {
                button: MouseButton::Right,
                x: 0,
                y: 0,
            },
            Action::Enter,
        ]);
        let err = player(&fake).play(&log).unwrap_err();
        assert!(err.is(ErrorCode::SimulationFailed));
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn speed_shortens_pauses() {
        let fake = Fake::default();
        let log = ActionLog::new(vec![Action::Sleep { duration: 4 }, Action::Sleep { duration: 0 }]);
        player(&fake).speed(2.0).play(&log).unwrap();
        assert_eq!(fake.calls(), vec![Call::Sleep(Duration::from_secs(2))]);
    }

    #[test]
    fn start_delay_runs_once_before_first_action() {
        let fake = Fake::default();
        let config = PlayerConfig {
            speed: 4.0,
            start_delay: Duration::from_secs(3),
        };
        let log = ActionLog::new(vec![Action::Enter, Action::Enter]);
        player(&fake).with_config(config).play(&log).unwrap();
        assert_eq!(
            fake.calls(),
            vec![Call::Sleep(Duration::from_secs(3)), Call::Enter, Call::Enter]
        );
    }

    #[test]
    fn cancellation_is_checked_between_actions() {
        let fake = Fake::default();
        let cancel = Arc::new(AtomicBool::new(true));
        let log = ActionLog::new(vec![Action::Enter]);
        let err = player(&fake).cancel_on(cancel).play(&log).unwrap_err();
        assert!(err.is(ErrorCode::Cancelled));
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn manual_clock_records_sleeps() {
        let fake = Fake::default();
        let clock = ManualClock::new();
        let log = ActionLog::new(vec![Action::Sleep { duration: 2 }]);
        Player::new(fake.clone(), fake.clone())
            .with_clock(clock.clone())
            .play(&log)
            .unwrap();
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2)]);
    }
}
