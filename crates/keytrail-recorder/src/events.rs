//! Raw input events as delivered by an event source

use keytrail_core::{Key, Modifier, MouseButton};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

/// Low-level event, one per physical key press / button / motion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    /// Key pressed; `modifiers` are the modifier keys held at the time, in
    /// the order they were pressed
    KeyPress {
        key: Key,
        keycode: u32,
        modifiers: Vec<Modifier>,
    },
    MouseDown { button: MouseButton, x: i32, y: i32 },
    MouseUp { button: MouseButton, x: i32, y: i32 },
    MouseMove { x: i32, y: i32 },
    ScrollDown,
    ScrollUp,
}

impl RawEvent {
    pub fn key(key: Key, keycode: u32) -> Self {
        RawEvent::KeyPress {
            key,
            keycode,
            modifiers: Vec::new(),
        }
    }

    pub fn key_with(key: Key, keycode: u32, modifiers: &[Modifier]) -> Self {
        RawEvent::KeyPress {
            key,
            keycode,
            modifiers: modifiers.to_vec(),
        }
    }
}

/// A raw event with the time its source observed it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamped {
    pub at: Instant,
    pub event: RawEvent,
}

/// Which device classes are recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureLevel {
    Mouse,
    Keyboard,
    #[default]
    Both,
}

impl CaptureLevel {
    pub fn keyboard(&self) -> bool {
        matches!(self, CaptureLevel::Keyboard | CaptureLevel::Both)
    }

    pub fn mouse(&self) -> bool {
        matches!(self, CaptureLevel::Mouse | CaptureLevel::Both)
    }
}

impl fmt::Display for CaptureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CaptureLevel::Mouse => "mouse",
            CaptureLevel::Keyboard => "keyboard",
            CaptureLevel::Both => "both",
        })
    }
}

impl FromStr for CaptureLevel {
    type Err = keytrail_core::Error;

    fn from_str(s: &str) -> keytrail_core::Result<Self> {
        match s {
            "mouse" | "1" => Ok(CaptureLevel::Mouse),
            "keyboard" | "2" => Ok(CaptureLevel::Keyboard),
            "both" | "3" => Ok(CaptureLevel::Both),
            other => Err(keytrail_core::Error::invalid_value("capture level", other)),
        }
    }
}

/// A modifier + key chord
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hotkey {
    pub modifier: Modifier,
    pub key: Key,
}

impl Hotkey {
    pub fn new(modifier: Modifier, key: Key) -> Self {
        Self { modifier, key }
    }

    pub fn matches(&self, key: &Key, modifiers: &[Modifier]) -> bool {
        *key == self.key && modifiers.contains(&self.modifier)
    }
}

impl Default for Hotkey {
    /// alt+z
    fn default() -> Self {
        Self::new(Modifier::Alt, Key::Char('z'))
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.modifier, self.key)
    }
}

impl FromStr for Hotkey {
    type Err = keytrail_core::Error;

    /// Parses `alt+z`, `control+{f4}`...
    fn from_str(s: &str) -> keytrail_core::Result<Self> {
        let (modifier, key) = s
            .split_once('+')
            .ok_or_else(|| keytrail_core::Error::invalid_value("hotkey", s))?;
        Ok(Self::new(modifier.parse()?, key.parse()?))
    }
}
