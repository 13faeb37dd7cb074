//! keytrail-core - action logs for keyboard and mouse macros
//!
//! Data model, tree codec and service traits shared by the recorder and the
//! player.
//!
//! ## Platform Support
//!
//! - **Linux (X11)**: input simulation and window control via `xdotool`
//! - Everything else: bring your own [`InputSimulator`] / [`WindowService`]

pub mod action;
pub mod clock;
pub mod error;
pub mod input;
pub mod platform;
pub mod tree;
pub mod window;

pub use action::{
    split_typed, Action, ActionLog, Key, Modifier, MouseButton, ScrollDirection, TypedPart,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, ErrorCode, Result};
pub use input::InputSimulator;
pub use tree::{Node, ROOT_TAG};
pub use window::{NoWindows, WindowInfo, WindowService};

#[cfg(target_os = "linux")]
pub use platform::linux::Xdotool;

pub mod prelude {
    pub use crate::action::{Action, ActionLog, Key, Modifier, MouseButton, ScrollDirection};
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::error::{Error, ErrorCode, Result};
    pub use crate::input::InputSimulator;
    pub use crate::tree::Node;
    pub use crate::window::{WindowInfo, WindowService};
}
