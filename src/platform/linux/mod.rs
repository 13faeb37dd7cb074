//! X11 implementation backed by `xdotool`
//!
//! Every primitive shells out to one `xdotool` invocation, so the binary
//! must be on `PATH` and `DISPLAY` must point at a running X server.

use crate::action::{Key, Modifier, MouseButton, ScrollDirection};
use crate::error::{Error, Result};
use crate::input::InputSimulator;
use crate::window::{WindowInfo, WindowService};
use anyhow::Context;
use std::process::Command;

/// Delay between typed characters, in milliseconds
const TYPE_DELAY_MS: u32 = 12;

#[derive(Debug, Clone)]
pub struct Xdotool {
    program: String,
    type_delay_ms: u32,
}

impl Xdotool {
    pub fn new() -> Self {
        Self {
            program: "xdotool".to_string(),
            type_delay_ms: TYPE_DELAY_MS,
        }
    }

    pub fn type_delay(mut self, ms: u32) -> Self {
        self.type_delay_ms = ms;
        self
    }

    /// Check that the binary can be executed
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Current pointer position in root window coordinates
    pub fn pointer_location(&self) -> Result<(i32, i32)> {
        let out = self.run("getmouselocation", &["getmouselocation", "--shell"])?;
        parse_mouse_location(&out)
            .ok_or_else(|| Error::simulation_failed("getmouselocation", out.trim()))
    }

    fn run(&self, what: &str, args: &[&str]) -> Result<String> {
        self.output(args)
            .map_err(|e| Error::simulation_failed(what, &format!("{:#}", e)))
    }

    fn output(&self, args: &[&str]) -> anyhow::Result<String> {
        tracing::trace!(?args, "xdotool");
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .with_context(|| format!("Failed to run {}", self.program))?;

        if !output.status.success() {
            anyhow::bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for Xdotool {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSimulator for Xdotool {
    fn type_text(&self, text: &str) -> Result<()> {
        let delay = self.type_delay_ms.to_string();
        self.run("type", &["type", "--delay", &delay, "--", text])?;
        Ok(())
    }

    fn press_enter(&self) -> Result<()> {
        self.run("enter", &["key", "Return"])?;
        Ok(())
    }

    fn press_tab(&self) -> Result<()> {
        self.run("tab", &["key", "Tab"])?;
        Ok(())
    }

    fn press_key(&self, key: &Key) -> Result<()> {
        self.run("key", &["key", &keysym(key)])?;
        Ok(())
    }

    fn press_combo(&self, modifier: Modifier, key: &Key) -> Result<()> {
        let chord = format!("{}+{}", modifier_keysym(modifier), keysym(key));
        self.run("combo", &["key", &chord])?;
        Ok(())
    }

    fn click(&self, button: MouseButton, x: i32, y: i32) -> Result<()> {
        let (x, y) = (x.to_string(), y.to_string());
        self.run(
            "click",
            &["mousemove", "--sync", &x, &y, "click", button_number(button)],
        )?;
        Ok(())
    }

    fn move_to(&self, x: i32, y: i32) -> Result<()> {
        let (x, y) = (x.to_string(), y.to_string());
        self.run("mousemove", &["mousemove", &x, &y])?;
        Ok(())
    }

    fn scroll(&self, direction: ScrollDirection) -> Result<()> {
        let button = match direction {
            ScrollDirection::Up => "4",
            ScrollDirection::Down => "5",
        };
        self.run("mousewheel", &["click", button])?;
        Ok(())
    }
}

impl WindowService for Xdotool {
    fn active_window_title(&self) -> Option<String> {
        match self.output(&["getactivewindow", "getwindowname"]) {
            Ok(title) => Some(title.trim_end_matches('\n').to_string()),
            Err(e) => {
                tracing::debug!("no active window: {:#}", e);
                None
            }
        }
    }

    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        // `search` exits non-zero when nothing matches
        let ids = match self.output(&["search", "--onlyvisible", "--name", ""]) {
            Ok(out) => out,
            Err(_) => return Ok(Vec::new()),
        };

        let mut windows = Vec::new();
        for id in ids.lines().filter_map(|l| l.trim().parse::<u64>().ok()) {
            let id_arg = id.to_string();
            match self.output(&["getwindowname", &id_arg]) {
                Ok(title) => windows.push(WindowInfo {
                    id,
                    title: title.trim_end_matches('\n').to_string(),
                }),
                Err(e) => tracing::debug!(id, "window vanished: {:#}", e),
            }
        }
        Ok(windows)
    }

    fn activate(&self, window: &WindowInfo) -> Result<()> {
        let id = window.id.to_string();
        self.run("window", &["windowactivate", "--sync", &id])?;
        Ok(())
    }
}

/// Parse `X=..`/`Y=..` lines of `getmouselocation --shell`
fn parse_mouse_location(out: &str) -> Option<(i32, i32)> {
    let mut x = None;
    let mut y = None;
    for line in out.lines() {
        match line.split_once('=') {
            Some(("X", v)) => x = v.trim().parse().ok(),
            Some(("Y", v)) => y = v.trim().parse().ok(),
            _ => {}
        }
    }
    Some((x?, y?))
}

fn button_number(button: MouseButton) -> &'static str {
    match button {
        MouseButton::Left => "1",
        MouseButton::Middle => "2",
        MouseButton::Right => "3",
    }
}

fn modifier_keysym(modifier: Modifier) -> &'static str {
    match modifier {
        Modifier::Shift => "shift",
        Modifier::Control => "ctrl",
        Modifier::Alt => "alt",
        Modifier::Super => "super",
    }
}

/// X keysym name for a key
pub fn keysym(key: &Key) -> String {
    match key {
        Key::Space => "space".to_string(),
        Key::Enter => "Return".to_string(),
        Key::Tab => "Tab".to_string(),
        Key::Char(c) => char_keysym(*c),
        Key::Named(name) => named_keysym(name),
    }
}

fn char_keysym(c: char) -> String {
    let name = match c {
        '`' => "grave",
        '-' => "minus",
        '=' => "equal",
        '[' => "bracketleft",
        ']' => "bracketright",
        ';' => "semicolon",
        '\'' => "apostrophe",
        '#' => "numbersign",
        '\\' => "backslash",
        ',' => "comma",
        '.' => "period",
        '/' => "slash",
        ' ' => "space",
        _ => return c.to_string(),
    };
    name.to_string()
}

fn named_keysym(name: &str) -> String {
    let sym = match name {
        "backspace" => "BackSpace",
        "escape" => "Escape",
        "delete" => "Delete",
        "insert" => "Insert",
        "home" => "Home",
        "end" => "End",
        "pageup" => "Prior",
        "pagedown" => "Next",
        "up" => "Up",
        "down" => "Down",
        "left" => "Left",
        "right" => "Right",
        "capslock" => "Caps_Lock",
        "menu" => "Menu",
        "print" => "Print",
        other => {
            if let Some(n) = other.strip_prefix('f').filter(|n| n.parse::<u8>().is_ok()) {
                return format!("F{}", n);
            }
            other
        }
    };
    sym.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keysyms_for_punctuation_and_named_keys() {
        assert_eq!(keysym(&Key::Char('a')), "a");
        assert_eq!(keysym(&Key::Char(',')), "comma");
        assert_eq!(keysym(&Key::named("backspace")), "BackSpace");
        assert_eq!(keysym(&Key::named("f11")), "F11");
        assert_eq!(keysym(&Key::Enter), "Return");
    }

    #[test]
    fn parses_shell_mouse_location() {
        let out = "X=812\nY=-4\nSCREEN=0\nWINDOW=65011718\n";
        assert_eq!(parse_mouse_location(out), Some((812, -4)));
        assert_eq!(parse_mouse_location("SCREEN=0\n"), None);
    }

    #[test]
    fn missing_binary_reports_simulation_failure() {
        let xdo = Xdotool {
            program: "keytrail-no-such-binary".to_string(),
            type_delay_ms: 0,
        };
        assert!(!xdo.is_available());
        let err = xdo.press_enter().unwrap_err();
        assert!(err.is(crate::ErrorCode::SimulationFailed));
        assert_eq!(xdo.active_window_title(), None);
    }
}
