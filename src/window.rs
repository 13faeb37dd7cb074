//! Window enumeration and activation

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An open top-level window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub id: u64,
    pub title: String,
}

pub trait WindowService {
    /// Title of the window that currently has focus, if any
    fn active_window_title(&self) -> Option<String>;

    fn list_windows(&self) -> Result<Vec<WindowInfo>>;

    fn activate(&self, window: &WindowInfo) -> Result<()>;

    /// Focus the first open window whose title equals `title`
    fn activate_by_title(&self, title: &str) -> Result<WindowInfo> {
        let window = self
            .list_windows()?
            .into_iter()
            .find(|w| w.title == title)
            .ok_or_else(|| Error::window_not_found(title))?;
        self.activate(&window)?;
        Ok(window)
    }
}

impl<T: WindowService + ?Sized> WindowService for &T {
    fn active_window_title(&self) -> Option<String> {
        (**self).active_window_title()
    }

    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        (**self).list_windows()
    }

    fn activate(&self, window: &WindowInfo) -> Result<()> {
        (**self).activate(window)
    }
}

impl<T: WindowService + ?Sized> WindowService for Arc<T> {
    fn active_window_title(&self) -> Option<String> {
        (**self).active_window_title()
    }

    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        (**self).list_windows()
    }

    fn activate(&self, window: &WindowInfo) -> Result<()> {
        (**self).activate(window)
    }
}

/// Window service for headless recording: no window is ever active, so no
/// focus changes are recorded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWindows;

impl WindowService for NoWindows {
    fn active_window_title(&self) -> Option<String> {
        None
    }

    fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        Ok(Vec::new())
    }

    fn activate(&self, window: &WindowInfo) -> Result<()> {
        Err(Error::window_not_found(&window.title))
    }
}
