//! Keyboard and mouse input simulation

use crate::action::{Key, Modifier, MouseButton, ScrollDirection};
use crate::error::Result;

/// Primitive input commands used by playback. Every call is synchronous.
pub trait InputSimulator {
    /// Type literal text; `\n` is a return keystroke
    fn type_text(&self, text: &str) -> Result<()>;

    fn press_enter(&self) -> Result<()>;

    fn press_tab(&self) -> Result<()>;

    /// Press and release a single non-printing key (`{backspace}`, `{f5}`...)
    fn press_key(&self, key: &Key) -> Result<()>;

    /// Press `key` while `modifier` is held
    fn press_combo(&self, modifier: Modifier, key: &Key) -> Result<()>;

    fn click(&self, button: MouseButton, x: i32, y: i32) -> Result<()>;

    fn move_to(&self, x: i32, y: i32) -> Result<()>;

    fn scroll(&self, direction: ScrollDirection) -> Result<()>;
}

impl<T: InputSimulator + ?Sized> InputSimulator for &T {
    fn type_text(&self, text: &str) -> Result<()> {
        (**self).type_text(text)
    }

    fn press_enter(&self) -> Result<()> {
        (**self).press_enter()
    }

    fn press_tab(&self) -> Result<()> {
        (**self).press_tab()
    }

    fn press_key(&self, key: &Key) -> Result<()> {
        (**self).press_key(key)
    }

    fn press_combo(&self, modifier: Modifier, key: &Key) -> Result<()> {
        (**self).press_combo(modifier, key)
    }

    fn click(&self, button: MouseButton, x: i32, y: i32) -> Result<()> {
        (**self).click(button, x, y)
    }

    fn move_to(&self, x: i32, y: i32) -> Result<()> {
        (**self).move_to(x, y)
    }

    fn scroll(&self, direction: ScrollDirection) -> Result<()> {
        (**self).scroll(direction)
    }
}
