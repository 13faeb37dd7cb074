//! Platform event sources
//!
//! Only X11 on Linux is implemented.

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "linux")]
pub use linux as current;
