//! Platform backends for input simulation and window control
//!
//! Only X11 on Linux is implemented, driven through the `xdotool` binary.

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "linux")]
pub use linux as current;
