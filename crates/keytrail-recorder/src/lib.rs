//! keytrail-recorder - keyboard and mouse macro recording and replay
//!
//! A raw input stream is compacted into an [`ActionLog`] of typed text,
//! key combos, clicks, pauses and focus changes, which [`Player`] replays.
//!
//! ## Platform Support
//!
//! - **Linux (X11)**: capture via `xinput`, replay via `xdotool`
//! - Anything else: implement [`EventSource`], [`InputSimulator`] and
//!   [`WindowService`] yourself

pub mod events;
pub mod platform;
pub mod recorder;
pub mod replay;
pub mod storage;
pub mod translator;

pub use events::{CaptureLevel, Hotkey, RawEvent, Stamped};
pub use keytrail_core::{
    Action, ActionLog, InputSimulator, Key, Modifier, MouseButton, ScrollDirection,
    WindowService,
};
pub use recorder::{
    EventSink, EventSource, Receiver, Recorder, RecorderConfig, RecordingHandle, Sender,
};
pub use replay::{PlaybackStats, Player, PlayerConfig};
pub use storage::{Format, LogStorage};
pub use translator::{EventTranslator, TranslatorConfig, SLEEP_THRESHOLD};

#[cfg(target_os = "linux")]
pub use platform::linux::XInputSource;

pub mod prelude {
    pub use crate::events::{CaptureLevel, Hotkey, RawEvent};
    pub use crate::recorder::{
        EventSink, EventSource, Recorder, RecorderConfig, RecordingHandle,
    };
    pub use crate::replay::{PlaybackStats, Player, PlayerConfig};
    pub use crate::storage::{Format, LogStorage};
    pub use crate::translator::{EventTranslator, TranslatorConfig};
    pub use keytrail_core::prelude::*;

    #[cfg(target_os = "linux")]
    pub use crate::platform::linux::XInputSource;
    #[cfg(target_os = "linux")]
    pub use keytrail_core::Xdotool;
}
