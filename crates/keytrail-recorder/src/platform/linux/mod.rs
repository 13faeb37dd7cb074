//! X11 event source
//!
//! Runs `xinput test-xi2 --root` and turns its raw key, button and motion
//! events into [`RawEvent`]s. Raw XI2 events carry neither modifiers nor
//! pointer coordinates, so held modifiers are tracked here and the pointer
//! position is read from `xdotool` when a pointer event arrives.

mod keymap;

pub use keymap::{key_for, modifier_for};

use crate::events::RawEvent;
use crate::recorder::{EventSink, EventSource, POLL_INTERVAL};
use anyhow::{Context, Result};
use keytrail_core::{Modifier, MouseButton, Xdotool};
use parking_lot::Mutex;
use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

const XI_RAW_KEY_PRESS: u32 = 13;
const XI_RAW_KEY_RELEASE: u32 = 14;
const XI_RAW_BUTTON_PRESS: u32 = 15;
const XI_RAW_BUTTON_RELEASE: u32 = 16;
const XI_RAW_MOTION: u32 = 17;

/// One parsed `EVENT type N` block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XiEvent {
    pub kind: u32,
    pub detail: u32,
}

/// Line parser for `xinput test-xi2` output
#[derive(Debug, Default)]
pub struct XiParser {
    pending: Option<u32>,
}

impl XiParser {
    /// Feed one line; returns an event once its `detail:` line is seen
    pub fn feed(&mut self, line: &str) -> Option<XiEvent> {
        if let Some(rest) = line.strip_prefix("EVENT type ") {
            self.pending = rest
                .split_whitespace()
                .next()
                .and_then(|n| n.parse().ok());
            return None;
        }

        let detail = line.trim_start().strip_prefix("detail:")?;
        let kind = self.pending.take()?;
        let detail = detail.trim().parse().ok()?;
        Some(XiEvent { kind, detail })
    }
}

/// Held modifiers and last pointer position
#[derive(Debug, Default)]
pub struct XiState {
    held: Vec<Modifier>,
    last_motion: Option<(i32, i32)>,
}

impl XiState {
    /// Convert a raw XI event; `pointer` is asked for the position of
    /// pointer events only
    pub fn convert(
        &mut self,
        event: XiEvent,
        pointer: impl FnOnce() -> Option<(i32, i32)>,
    ) -> Option<RawEvent> {
        match event.kind {
            XI_RAW_KEY_PRESS => {
                if let Some(modifier) = modifier_for(event.detail) {
                    if !self.held.contains(&modifier) {
                        self.held.push(modifier);
                    }
                    return None;
                }
                let key = key_for(event.detail)?;
                Some(RawEvent::KeyPress {
                    key,
                    keycode: event.detail,
                    modifiers: self.held.clone(),
                })
            }
            XI_RAW_KEY_RELEASE => {
                if let Some(modifier) = modifier_for(event.detail) {
                    self.held.retain(|m| *m != modifier);
                }
                None
            }
            XI_RAW_BUTTON_PRESS => match event.detail {
                4 => Some(RawEvent::ScrollUp),
                5 => Some(RawEvent::ScrollDown),
                n => {
                    let button = button_for(n)?;
                    let (x, y) = pointer()?;
                    Some(RawEvent::MouseDown { button, x, y })
                }
            },
            XI_RAW_BUTTON_RELEASE => {
                let button = button_for(event.detail)?;
                let (x, y) = pointer()?;
                Some(RawEvent::MouseUp { button, x, y })
            }
            XI_RAW_MOTION => {
                let (x, y) = pointer()?;
                if self.last_motion == Some((x, y)) {
                    return None;
                }
                self.last_motion = Some((x, y));
                Some(RawEvent::MouseMove { x, y })
            }
            _ => None,
        }
    }
}

fn button_for(detail: u32) -> Option<MouseButton> {
    match detail {
        1 => Some(MouseButton::Left),
        2 => Some(MouseButton::Middle),
        3 => Some(MouseButton::Right),
        _ => None,
    }
}

/// Event source reading `xinput test-xi2 --root`
pub struct XInputSource {
    program: String,
    xdo: Xdotool,
    state: XiState,
}

impl XInputSource {
    pub fn new() -> Self {
        Self {
            program: "xinput".to_string(),
            xdo: Xdotool::new(),
            state: XiState::default(),
        }
    }
}

impl Default for XInputSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for XInputSource {
    fn listen(&mut self, sink: &EventSink, stop: &AtomicBool) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(["test-xi2", "--root"])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start {} (is it installed?)", self.program))?;
        let stdout = child.stdout.take().context("xinput stdout unavailable")?;
        let child = Mutex::new(child);
        let done = AtomicBool::new(false);

        let Self { xdo, state, .. } = self;
        let mut parser = XiParser::default();

        thread::scope(|s| {
            // Killing xinput is what unblocks the read loop below
            s.spawn(|| {
                while !stop.load(Ordering::Acquire) && !done.load(Ordering::Acquire) {
                    thread::sleep(POLL_INTERVAL);
                }
                let _ = child.lock().kill();
            });

            for line in BufReader::new(stdout).lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::warn!("xinput read failed: {}", e);
                        break;
                    }
                };
                if stop.load(Ordering::Acquire) {
                    break;
                }
                let Some(xi) = parser.feed(&line) else {
                    continue;
                };
                let pointer = || match xdo.pointer_location() {
                    Ok(pos) => Some(pos),
                    Err(e) => {
                        tracing::warn!("pointer location unavailable: {}", e);
                        None
                    }
                };
                if let Some(event) = state.convert(xi, pointer) {
                    if sink.send(event).is_err() {
                        break;
                    }
                }
            }
            done.store(true, Ordering::Release);
        });

        let status = child.lock().wait()?;
        tracing::debug!(%status, "xinput exited");
        Ok(())
    }
}
