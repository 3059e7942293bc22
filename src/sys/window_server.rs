//! Privileged window server queries. Unlike accessibility these see windows on
//! every space, and are cheap.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::app::pid_t;
use super::screen::{ScreenId, SpaceId};

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct WindowServerId(u32);

impl WindowServerId {
    pub fn new(id: u32) -> WindowServerId { WindowServerId(id) }

    pub fn as_u32(&self) -> u32 { self.0 }
}

impl fmt::Debug for WindowServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Wsid({})", self.0) }
}

impl fmt::Display for WindowServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowServerError {
    #[error("window server call {call} failed with code {code}")]
    CallFailed { call: &'static str, code: i32 },
    #[error("window {0} not found")]
    WindowNotFound(WindowServerId),
}

/// A captured bitmap. Rendering it is the presentation layer's business.
#[derive(Clone, PartialEq, Eq)]
pub struct WindowImage {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
}

impl fmt::Debug for WindowImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WindowImage({}x{})", self.width, self.height)
    }
}

pub trait WindowServer {
    fn active_space(&self) -> Option<SpaceId>;
    /// All user spaces, in display order.
    fn all_spaces(&self) -> Vec<SpaceId>;
    fn windows_in_spaces(&self, spaces: &[SpaceId]) -> Vec<WindowServerId>;
    fn window_spaces(&self, wid: WindowServerId) -> Vec<SpaceId>;
    fn add_windows_to_spaces(
        &self,
        windows: &[WindowServerId],
        spaces: &[SpaceId],
    ) -> Result<(), WindowServerError>;
    fn remove_windows_from_spaces(
        &self,
        windows: &[WindowServerId],
        spaces: &[SpaceId],
    ) -> Result<(), WindowServerError>;
    /// Every window id, front to back.
    fn window_order(&self) -> Vec<WindowServerId>;
    fn window_screen(&self, wid: WindowServerId) -> Option<ScreenId>;
    /// The screen the switcher should appear on.
    fn preferred_screen(&self) -> Option<ScreenId>;
    fn is_mission_control_active(&self) -> bool;
    fn capture_window(&self, wid: WindowServerId) -> Option<WindowImage>;
    /// Brings the process to the front and makes `wid` its key window.
    fn make_key_and_front(&self, pid: pid_t, wid: WindowServerId)
    -> Result<(), WindowServerError>;
}
