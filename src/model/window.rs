use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::actor::app::WindowInfo;
use crate::sys::app::pid_t;
use crate::sys::ax::{AxHandle, role};
use crate::sys::screen::{ScreenId, SpaceId};
use crate::sys::window_server::{WindowImage, WindowServerId};

bitflags! {
    #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WindowFlags: u8 {
        const MINIMIZED = 1 << 0;
        /// The owning application is hidden.
        const HIDDEN = 1 << 1;
        const FULLSCREEN = 1 << 2;
        const ON_ALL_SPACES = 1 << 3;
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SpaceAssignment {
    /// `index` is the 1-based position of the space in display order.
    Space { id: SpaceId, index: usize },
    AllSpaces,
}

impl SpaceAssignment {
    pub fn contains(&self, space: SpaceId) -> bool {
        match self {
            SpaceAssignment::Space { id, .. } => *id == space,
            SpaceAssignment::AllSpaces => true,
        }
    }
}

/// A tracked application window.
#[derive(Debug, Clone)]
pub struct Window {
    pub id: WindowServerId,
    /// Owning application; look it up through the app registry.
    pub pid: pid_t,
    pub ax: Option<AxHandle>,
    pub title: Option<String>,
    pub role: Option<String>,
    pub subrole: Option<String>,
    pub flags: WindowFlags,
    pub space: SpaceAssignment,
    pub screen: Option<ScreenId>,
    pub thumbnail: Option<WindowImage>,
    pub icon: Option<WindowImage>,
    pub dock_label: Option<String>,
    /// Cached result of the last visibility evaluation.
    pub should_show: bool,
}

impl Window {
    pub fn new(pid: pid_t, info: WindowInfo, space: SpaceAssignment) -> Window {
        let mut flags = WindowFlags::empty();
        flags.set(WindowFlags::MINIMIZED, info.is_minimized);
        flags.set(WindowFlags::FULLSCREEN, info.is_fullscreen);
        flags.set(WindowFlags::ON_ALL_SPACES, space == SpaceAssignment::AllSpaces);
        Window {
            id: info.id,
            pid,
            ax: info.ax,
            title: info.title,
            role: info.role,
            subrole: info.subrole,
            flags,
            space,
            screen: None,
            thumbnail: None,
            icon: None,
            dock_label: None,
            should_show: false,
        }
    }

    pub fn is_minimized(&self) -> bool { self.flags.contains(WindowFlags::MINIMIZED) }

    pub fn is_hidden(&self) -> bool { self.flags.contains(WindowFlags::HIDDEN) }

    pub fn is_fullscreen(&self) -> bool { self.flags.contains(WindowFlags::FULLSCREEN) }

    pub fn has_title(&self) -> bool { self.title.as_deref().is_some_and(|t| !t.trim().is_empty()) }

    /// Standard windows and dialogs; excludes panels, tooltips, sheets and
    /// other auxiliary elements.
    pub fn is_actual_window(&self) -> bool {
        self.role.as_deref() == Some(role::WINDOW)
            && matches!(
                self.subrole.as_deref(),
                Some(role::STANDARD_WINDOW) | Some(role::DIALOG)
            )
    }

    pub fn set_space(&mut self, space: SpaceAssignment) {
        self.space = space;
        self.flags.set(WindowFlags::ON_ALL_SPACES, space == SpaceAssignment::AllSpaces);
    }
}
