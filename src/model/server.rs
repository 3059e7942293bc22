//! Serializable views of the registries handed to the presentation layer and
//! query callers.

use serde::{Deserialize, Serialize};

use super::window::{SpaceAssignment, Window, WindowFlags};
use crate::sys::app::{ActivationPolicy, pid_t};
use crate::sys::window_server::WindowServerId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowData {
    pub id: WindowServerId,
    pub pid: pid_t,
    pub title: Option<String>,
    pub app_name: Option<String>,
    pub bundle_id: Option<String>,
    pub flags: WindowFlags,
    pub space: SpaceAssignment,
    pub dock_label: Option<String>,
    pub has_thumbnail: bool,
}

impl WindowData {
    pub fn new(window: &Window, app_name: Option<String>, bundle_id: Option<String>) -> Self {
        WindowData {
            id: window.id,
            pid: window.pid,
            title: window.title.clone(),
            app_name,
            bundle_id,
            flags: window.flags,
            space: window.space,
            dock_label: window.dock_label.clone(),
            has_thumbnail: window.thumbnail.is_some(),
        }
    }
}

/// What the switcher shows: the shown windows in order, and which of them is
/// selected. `focused` indexes into `windows`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwitcherSnapshot {
    pub windows: Vec<WindowData>,
    pub focused: Option<usize>,
}

impl SwitcherSnapshot {
    pub fn focused_window(&self) -> Option<&WindowData> {
        self.focused.and_then(|i| self.windows.get(i))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationData {
    pub pid: pid_t,
    pub bundle_id: Option<String>,
    pub name: Option<String>,
    pub activation_policy: ActivationPolicy,
    pub is_hidden: bool,
    pub is_finished_launching: bool,
    pub dock_label: Option<String>,
    pub window_count: usize,
}
