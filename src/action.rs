//! Action log data model
//!
//! An [`ActionLog`] is the ordered list of semantic actions recorded in one
//! session. Replay order is recorded order.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A keyboard modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Shift,
    Control,
    Alt,
    Super,
}

impl Modifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modifier::Shift => "shift",
            Modifier::Control => "control",
            Modifier::Alt => "alt",
            Modifier::Super => "super",
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "shift" => Ok(Modifier::Shift),
            "control" | "ctrl" => Ok(Modifier::Control),
            "alt" => Ok(Modifier::Alt),
            "super" => Ok(Modifier::Super),
            other => Err(Error::invalid_value("modifier", other)),
        }
    }
}

/// A key as delivered by the event source.
///
/// Text form: printable keys are the character itself, everything else is a
/// `{name}` placeholder (`{space}`, `{enter}`, `{tab}`, `{backspace}`...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Space,
    Enter,
    Tab,
    Named(String),
}

impl Key {
    /// Build a non-printing key from its placeholder name, normalising the
    /// names that have a dedicated variant.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        match name.as_str() {
            "space" => Key::Space,
            "enter" => Key::Enter,
            "tab" => Key::Tab,
            _ => Key::Named(name),
        }
    }

    /// Key named by a `{name}` placeholder inside typed text. Only names a
    /// keyboard actually produces are recognised, so literal braces in
    /// typed text stay text.
    pub fn placeholder(name: &str) -> Option<Key> {
        const NAMED: [&str; 18] = [
            "escape", "backspace", "delete", "insert", "home", "end", "pageup",
            "pagedown", "up", "down", "left", "right", "capslock", "print",
            "menu", "space", "enter", "tab",
        ];
        let function_key = name
            .strip_prefix('f')
            .and_then(|n| n.parse::<u8>().ok())
            .is_some_and(|n| (1..=24).contains(&n));
        (NAMED.contains(&name) || function_key).then(|| Key::named(name))
    }

    /// Text appended to a `Type` run when this key is pressed unmodified
    pub fn typed_text(&self) -> String {
        match self {
            Key::Space => " ".to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{}", c),
            Key::Space => f.write_str("{space}"),
            Key::Enter => f.write_str("{enter}"),
            Key::Tab => f.write_str("{tab}"),
            Key::Named(name) => write!(f, "{{{}}}", name),
        }
    }
}

impl FromStr for Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (None, _) => Err(Error::invalid_value("key", s)),
            (Some(c), None) => Ok(Key::Char(c)),
            _ => match s.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')) {
                Some(name) if !name.is_empty() => Ok(Key::named(name)),
                _ => Err(Error::invalid_value("key", s)),
            },
        }
    }
}

/// One piece of a `Type` run as it is replayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedPart {
    /// Literal text; `{enter}` placeholders are already turned into `\n`
    Text(String),
    /// A non-printing key recorded as a placeholder
    Key(Key),
}

/// Split typed text into literal runs and placeholder keys
pub fn split_typed(text: &str) -> Vec<TypedPart> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        let key = rest[open + 1..].find('}').and_then(|len| {
            let name = &rest[open + 1..open + 1 + len];
            Key::placeholder(name).map(|key| (key, open + len + 2))
        });
        match key {
            Some((key, end)) => {
                literal.push_str(&rest[..open]);
                match key {
                    Key::Enter => literal.push('\n'),
                    Key::Space => literal.push(' '),
                    key => {
                        if !literal.is_empty() {
                            parts.push(TypedPart::Text(std::mem::take(&mut literal)));
                        }
                        parts.push(TypedPart::Key(key));
                    }
                }
                rest = &rest[end..];
            }
            None => {
                literal.push_str(&rest[..=open]);
                rest = &rest[open + 1..];
            }
        }
    }

    literal.push_str(rest);
    if !literal.is_empty() {
        parts.push(TypedPart::Text(literal));
    }
    parts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    pub fn as_str(&self) -> &'static str {
        match self {
            MouseButton::Left => "left",
            MouseButton::Middle => "middle",
            MouseButton::Right => "right",
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MouseButton {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "left" => Ok(MouseButton::Left),
            "middle" => Ok(MouseButton::Middle),
            "right" => Ok(MouseButton::Right),
            other => Err(Error::invalid_value("mouse button", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScrollDirection::Up => "up",
            ScrollDirection::Down => "down",
        }
    }
}

impl fmt::Display for ScrollDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScrollDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "up" => Ok(ScrollDirection::Up),
            "down" => Ok(ScrollDirection::Down),
            other => Err(Error::invalid_value("scroll direction", other)),
        }
    }
}

/// One semantic unit of a recorded session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Run of literal characters, may contain `{name}` placeholders
    Type { text: String },
    Enter,
    Tab { times: u32 },
    /// Pause in whole seconds
    Sleep { duration: u64 },
    /// One modifier held with one key
    Combo { modifier: Modifier, key: Key },
    Mouse { button: MouseButton, x: i32, y: i32 },
    MouseMove { x: i32, y: i32 },
    MouseWheel { direction: ScrollDirection },
    /// Bring the window with this exact title to focus
    Window { activate: String },
}

impl Action {
    pub fn type_text(text: impl Into<String>) -> Self {
        Action::Type { text: text.into() }
    }

    /// Stable tag used in the tree form
    pub fn tag(&self) -> &'static str {
        match self {
            Action::Type { .. } => "type",
            Action::Enter => "enter",
            Action::Tab { .. } => "tab",
            Action::Sleep { .. } => "sleep",
            Action::Combo { .. } => "combo",
            Action::Mouse { .. } => "mouse",
            Action::MouseMove { .. } => "mousemove",
            Action::MouseWheel { .. } => "mousewheel",
            Action::Window { .. } => "window",
        }
    }
}

/// A finalized, read-only recording
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionLog {
    actions: Vec<Action>,
}

impl ActionLog {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    /// Total pause time encoded in the log, in seconds
    pub fn total_sleep(&self) -> u64 {
        self.actions
            .iter()
            .map(|a| match a {
                Action::Sleep { duration } => *duration,
                _ => 0,
            })
            .sum()
    }
}

impl From<Vec<Action>> for ActionLog {
    fn from(actions: Vec<Action>) -> Self {
        Self::new(actions)
    }
}

impl<'a> IntoIterator for &'a ActionLog {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}
