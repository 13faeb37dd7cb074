//! X11 keycode table (evdev keycodes, UK layout)

use keytrail_core::{Key, Modifier};

/// Modifier held while this key is down
pub fn modifier_for(keycode: u32) -> Option<Modifier> {
    match keycode {
        50 | 62 => Some(Modifier::Shift),
        37 | 105 => Some(Modifier::Control),
        64 | 108 => Some(Modifier::Alt),
        133 | 134 => Some(Modifier::Super),
        _ => None,
    }
}

/// Unshifted key for a keycode; `None` for modifiers and unknown codes
pub fn key_for(keycode: u32) -> Option<Key> {
    const DIGITS: &str = "1234567890";
    const TOP: &str = "qwertyuiop[]";
    const HOME: &str = "asdfghjkl;'`";
    const BOTTOM: &str = "zxcvbnm,./";

    let row = |chars: &str, start: u32| {
        chars
            .chars()
            .nth(keycode.checked_sub(start)? as usize)
            .map(Key::Char)
    };

    let key = match keycode {
        9 => Key::named("escape"),
        10..=19 => return row(DIGITS, 10),
        20 => Key::Char('-'),
        21 => Key::Char('='),
        22 => Key::named("backspace"),
        23 => Key::Tab,
        24..=35 => return row(TOP, 24),
        36 | 104 => Key::Enter,
        38..=49 => return row(HOME, 38),
        51 => Key::Char('#'),
        52..=61 => return row(BOTTOM, 52),
        65 => Key::Space,
        66 => Key::named("capslock"),
        67..=76 => Key::named(format!("f{}", keycode - 66)),
        94 => Key::Char('\\'),
        95 => Key::named("f11"),
        96 => Key::named("f12"),
        107 => Key::named("print"),
        110 => Key::named("home"),
        111 => Key::named("up"),
        112 => Key::named("pageup"),
        113 => Key::named("left"),
        114 => Key::named("right"),
        115 => Key::named("end"),
        116 => Key::named("down"),
        117 => Key::named("pagedown"),
        118 => Key::named("insert"),
        119 => Key::named("delete"),
        135 => Key::named("menu"),
        _ => return None,
    };
    Some(key)
}
