//! Raw event stream -> action log
//!
//! Consecutive plain keypresses collapse into one `Type` run, shifted keys
//! on the character rows are folded into that run as their shifted
//! character, pauses of two seconds or more become `Sleep` actions, and a
//! `Window` action is emitted before a click whenever focus moved.

use crate::events::{CaptureLevel, Hotkey, RawEvent};
use keytrail_core::{
    Action, ActionLog, Clock, Key, Modifier, MouseButton, ScrollDirection, SystemClock,
    WindowService,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Gap after which a `Sleep` is inserted
pub const SLEEP_THRESHOLD: Duration = Duration::from_secs(2);

/// Keycodes of the three character rows (digits, qwerty, home row)
const SHIFT_ROWS: [std::ops::RangeInclusive<u32>; 3] = [10..=21, 24..=35, 38..=49];

/// First keycode of the digit row
const DIGIT_ROW_START: u32 = 10;

/// Shifted symbols of the digit row, by position in the row
const DIGIT_ROW_SHIFTED: [char; 10] = [')', '!', '"', '£', '$', '%', '^', '&', '*', '('];

const PUNCTUATION: [char; 12] = ['`', '-', '=', '[', ']', ';', '\'', '#', '\\', ',', '.', '/'];
const PUNCTUATION_SHIFTED: [char; 12] = ['¬', '_', '+', '{', '}', ':', '@', '~', '|', '<', '>', '?'];

/// Translator configuration
#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    /// Device classes to record
    pub level: CaptureLevel,
    /// Inactivity gap that produces a `Sleep`
    pub sleep_threshold: Duration,
    /// Chord that ends the recording
    pub stop_hotkey: Hotkey,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            level: CaptureLevel::Both,
            sleep_threshold: SLEEP_THRESHOLD,
            stop_hotkey: Hotkey::default(),
        }
    }
}

/// Incremental builder of an [`ActionLog`] from raw input callbacks.
///
/// Callbacks must be delivered one at a time, in event order.
pub struct EventTranslator {
    config: TranslatorConfig,
    clock: Arc<dyn Clock>,
    windows: Box<dyn WindowService + Send>,
    actions: Vec<Action>,
    last_event: Instant,
    /// Capture time of the event being dispatched, if the source gave one
    event_time: Option<Instant>,
    last_window: Option<String>,
    stopped: bool,
}

impl EventTranslator {
    pub fn new(config: TranslatorConfig, windows: impl WindowService + Send + 'static) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            config,
            last_event: clock.now(),
            clock,
            windows: Box::new(windows),
            actions: Vec::new(),
            event_time: None,
            last_window: None,
            stopped: false,
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self.last_event = self.clock.now();
        self
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Begin a new recording: empty log, fresh gap timer
    pub fn start(&mut self) {
        self.actions.clear();
        self.last_window = None;
        self.stopped = false;
        self.last_event = self.clock.now();
        tracing::info!(level = %self.config.level, "recording started");
    }

    /// Finalize the recording. Later callbacks are ignored.
    pub fn stop(&mut self) -> ActionLog {
        self.stopped = true;
        let log = ActionLog::new(std::mem::take(&mut self.actions));
        tracing::info!(actions = log.len(), "recording stopped");
        log
    }

    /// True once the stop hotkey was seen or [`stop`](Self::stop) was called
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Actions recorded so far
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn dispatch(&mut self, event: RawEvent) {
        match event {
            RawEvent::KeyPress {
                key,
                keycode,
                modifiers,
            } => self.on_key_press(&key, keycode, &modifiers),
            RawEvent::MouseDown { button, x, y } => self.on_mouse_down(button, x, y),
            RawEvent::MouseUp { button, x, y } => self.on_mouse_up(button, x, y),
            RawEvent::MouseMove { x, y } => self.on_mouse_move(x, y),
            RawEvent::ScrollDown => self.on_mouse_scroll_down(),
            RawEvent::ScrollUp => self.on_mouse_scroll_up(),
        }
    }

    /// Dispatch an event captured at `at`; pauses are measured between
    /// capture times rather than handling times
    pub fn dispatch_at(&mut self, event: RawEvent, at: Instant) {
        self.event_time = Some(at);
        self.dispatch(event);
        self.event_time = None;
    }

    pub fn on_key_press(&mut self, key: &Key, keycode: u32, modifiers: &[Modifier]) {
        tracing::debug!(%key, keycode, ?modifiers, "key press");
        if self.stopped {
            return;
        }

        if self.config.stop_hotkey.matches(key, modifiers) {
            tracing::debug!(hotkey = %self.config.stop_hotkey, "stop hotkey");
            self.stopped = true;
            return;
        }

        if !self.config.level.keyboard() {
            return;
        }

        self.check_sleep();

        if let Some(Action::Type { .. }) = self.actions.last() {
            match modifiers {
                [] => self.append_text(&key.typed_text()),
                [modifier] => {
                    let shifted = match modifier {
                        Modifier::Shift if in_shift_rows(keycode) => shifted_char(key, keycode),
                        _ => None,
                    };
                    match shifted {
                        Some(c) => self.append_text(&c.to_string()),
                        None => self.push(Action::Combo {
                            modifier: *modifier,
                            key: key.clone(),
                        }),
                    }
                }
                _ => tracing::debug!(?modifiers, "several modifiers held, dropped"),
            }
            return;
        }

        match key {
            Key::Enter => self.push(Action::Enter),
            Key::Tab => {
                if modifiers.is_empty() {
                    if let Some(Action::Tab { times }) = self.actions.last_mut() {
                        *times += 1;
                        self.touch();
                        return;
                    }
                }
                self.push(Action::Tab { times: 1 });
            }
            other => self.push(Action::type_text(other.typed_text())),
        }
    }

    pub fn on_mouse_down(&mut self, button: MouseButton, x: i32, y: i32) {
        tracing::debug!(%button, x, y, "mouse down");
        if self.stopped || !self.config.level.mouse() {
            return;
        }

        self.check_sleep();

        if let Some(title) = self.windows.active_window_title() {
            if self.last_window.as_deref() != Some(title.as_str()) {
                self.push(Action::Window {
                    activate: title.clone(),
                });
                self.last_window = Some(title);
            }
        }

        self.push(Action::Mouse { button, x, y });
    }

    /// Releases are observed only; the click was recorded on press
    pub fn on_mouse_up(&mut self, button: MouseButton, x: i32, y: i32) {
        tracing::debug!(%button, x, y, "mouse up");
    }

    pub fn on_mouse_move(&mut self, x: i32, y: i32) {
        tracing::trace!(x, y, "mouse move");
        if self.stopped || !self.config.level.mouse() {
            return;
        }
        self.check_sleep();
        self.push(Action::MouseMove { x, y });
    }

    pub fn on_mouse_scroll_down(&mut self) {
        self.on_scroll(ScrollDirection::Down);
    }

    pub fn on_mouse_scroll_up(&mut self) {
        self.on_scroll(ScrollDirection::Up);
    }

    fn on_scroll(&mut self, direction: ScrollDirection) {
        tracing::debug!(%direction, "mouse scroll");
        if self.stopped || !self.config.level.mouse() {
            return;
        }
        self.check_sleep();
        self.push(Action::MouseWheel { direction });
    }

    fn check_sleep(&mut self) {
        let elapsed = self.now().saturating_duration_since(self.last_event);
        if elapsed >= self.config.sleep_threshold {
            self.push(Action::Sleep {
                duration: elapsed.as_secs_f64().round() as u64,
            });
        }
    }

    fn append_text(&mut self, text: &str) {
        if let Some(Action::Type { text: run }) = self.actions.last_mut() {
            run.push_str(text);
        }
        self.touch();
    }

    fn push(&mut self, action: Action) {
        tracing::debug!(?action, "append");
        self.actions.push(action);
        self.touch();
    }

    fn touch(&mut self) {
        self.last_event = self.now();
    }

    fn now(&self) -> Instant {
        self.event_time.unwrap_or_else(|| self.clock.now())
    }
}

fn in_shift_rows(keycode: u32) -> bool {
    SHIFT_ROWS.iter().any(|row| row.contains(&keycode))
}

/// Character produced by shift + `key` on the character rows
pub fn shifted_char(key: &Key, keycode: u32) -> Option<char> {
    let Key::Char(c) = *key else {
        return None;
    };

    if c.is_ascii_lowercase() {
        return Some(c.to_ascii_uppercase());
    }
    if c.is_ascii_digit() {
        let position = keycode.checked_sub(DIGIT_ROW_START)? as usize;
        return DIGIT_ROW_SHIFTED.get(position).copied();
    }
    PUNCTUATION
        .iter()
        .position(|p| *p == c)
        .map(|i| PUNCTUATION_SHIFTED[i])
}
