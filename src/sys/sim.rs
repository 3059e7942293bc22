//! An in-memory platform.
//!
//! [`SimulatedSystem`] implements every platform trait over shared state that
//! tests and scripted scenarios mutate. Mutations deliver the notifications a
//! real system would, on the calling thread, after the state lock has been
//! released.
//!
//! Like the real accessibility API, an application's window list only
//! contains windows that are on the active space.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use parking_lot::Mutex;
use ron::extensions::Extensions;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::app::{
    ActivationPolicy, DOCK_BUNDLE_ID, ProcessInfo, ProcessSource, WorkspaceHandler,
    WorkspaceNotification, pid_t,
};
use super::ax::{
    Accessibility, AxAction, AxAttribute, AxElement, AxError, AxHandler, AxNotification,
    AxNotificationKind, AxRef, AxResult, AxValue, role,
};
use super::screen::{ScreenId, SpaceId};
use super::window_server::{WindowImage, WindowServer, WindowServerError, WindowServerId};
use crate::actor::reactor::Command;
use crate::common::collections::HashMap;

const APPLICATION_ROLE: &str = "AXApplication";
const BUTTON_ROLE: &str = "AXButton";
const DOCK_ITEM_ROLE: &str = "AXDockItem";

fn yes() -> bool { true }

fn window_role() -> String { role::WINDOW.to_string() }

fn standard_subrole() -> String { role::STANDARD_WINDOW.to_string() }

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SimApp {
    pub pid: pid_t,
    #[serde(default)]
    pub bundle_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub activation_policy: ActivationPolicy,
    #[serde(default)]
    pub is_background_helper: bool,
    #[serde(default = "yes")]
    pub is_finished_launching: bool,
    #[serde(default)]
    pub is_hidden: bool,
    /// Bundle location. Dock items are matched to apps by it.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub dock_label: Option<String>,
    /// Accessibility observation of this app fails.
    #[serde(default)]
    pub refuses_observation: bool,
}

impl SimApp {
    pub fn new(pid: pid_t, bundle_id: &str) -> SimApp {
        SimApp {
            pid,
            bundle_id: Some(bundle_id.to_string()),
            name: bundle_id.rsplit('.').next().map(str::to_string),
            activation_policy: ActivationPolicy::Regular,
            is_background_helper: false,
            is_finished_launching: true,
            is_hidden: false,
            url: Some(format!("file:///Applications/{bundle_id}.app/")),
            dock_label: None,
            refuses_observation: false,
        }
    }

    pub fn process_info(&self) -> ProcessInfo {
        ProcessInfo {
            pid: self.pid,
            bundle_id: self.bundle_id.clone(),
            localized_name: self.name.clone(),
            activation_policy: self.activation_policy,
            is_background_helper: self.is_background_helper,
            is_finished_launching: self.is_finished_launching,
            is_hidden: self.is_hidden,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SimWindow {
    pub id: u32,
    pub pid: pid_t,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "window_role")]
    pub role: String,
    #[serde(default = "standard_subrole")]
    pub subrole: String,
    #[serde(default)]
    pub minimized: bool,
    #[serde(default)]
    pub fullscreen: bool,
    /// Empty means the active space at the time the window is added.
    #[serde(default)]
    pub spaces: Vec<SpaceId>,
    #[serde(default)]
    pub screen: Option<u32>,
}

impl SimWindow {
    pub fn new(id: u32, pid: pid_t, title: &str) -> SimWindow {
        SimWindow {
            id,
            pid,
            title: Some(title.to_string()),
            role: window_role(),
            subrole: standard_subrole(),
            minimized: false,
            fullscreen: false,
            spaces: Vec::new(),
            screen: None,
        }
    }

    pub fn on_spaces(mut self, spaces: &[SpaceId]) -> SimWindow {
        self.spaces = spaces.to_vec();
        self
    }

    fn wid(&self) -> WindowServerId { WindowServerId::new(self.id) }
}

/// A recorded call to add or remove windows from spaces.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SpaceMove {
    pub windows: Vec<WindowServerId>,
    pub spaces: Vec<SpaceId>,
    pub added: bool,
}

struct SimState {
    self_pid: pid_t,
    apps: Vec<SimApp>,
    /// Front to back.
    windows: Vec<SimWindow>,
    spaces: Vec<SpaceId>,
    active_space: Option<SpaceId>,
    frontmost: Option<pid_t>,
    preferred_screen: Option<ScreenId>,
    mission_control: bool,
    failing_ax_calls: u32,
    fail_space_moves: bool,
    space_moves: Vec<SpaceMove>,
    workspace_handlers: Vec<WorkspaceHandler>,
    observers: HashMap<pid_t, AxHandler>,
}

impl SimState {
    fn app(&self, pid: pid_t) -> Option<&SimApp> { self.apps.iter().find(|a| a.pid == pid) }

    fn app_mut(&mut self, pid: pid_t) -> Option<&mut SimApp> {
        self.apps.iter_mut().find(|a| a.pid == pid)
    }

    fn window(&self, id: u32) -> Option<&SimWindow> { self.windows.iter().find(|w| w.id == id) }

    fn window_mut(&mut self, id: u32) -> Option<&mut SimWindow> {
        self.windows.iter_mut().find(|w| w.id == id)
    }

    fn is_reachable(&self, window: &SimWindow) -> bool {
        self.active_space.is_some_and(|s| window.spaces.contains(&s))
    }

    fn reachable_windows(&self, pid: pid_t) -> impl Iterator<Item = &SimWindow> + '_ {
        self.windows.iter().filter(move |w| w.pid == pid && self.is_reachable(w))
    }

    fn take_failure(&mut self) -> bool {
        if self.failing_ax_calls == 0 {
            return false;
        }
        self.failing_ax_calls -= 1;
        true
    }

    fn bring_to_front(&mut self, id: u32) -> Option<pid_t> {
        let index = self.windows.iter().position(|w| w.id == id)?;
        let window = self.windows.remove(index);
        let pid = window.pid;
        self.windows.insert(0, window);
        Some(pid)
    }
}

#[derive(Clone)]
pub struct SimulatedSystem {
    state: Arc<Mutex<SimState>>,
}

impl fmt::Debug for SimulatedSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SimulatedSystem")
            .field("apps", &state.apps.len())
            .field("windows", &state.windows.len())
            .field("active_space", &state.active_space)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    App(pid_t),
    Window(u32),
    CloseButton(u32),
    DockList,
    DockItem(pid_t),
}

struct SimElement {
    system: SimulatedSystem,
    node: Node,
}

impl fmt::Debug for SimElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimElement({:?})", self.node)
    }
}

impl SimulatedSystem {
    /// An empty system whose spaces are `spaces`, in display order.
    pub fn new(spaces: Vec<SpaceId>, active_space: SpaceId) -> SimulatedSystem {
        let state = SimState {
            self_pid: nix::unistd::getpid().as_raw(),
            apps: Vec::new(),
            windows: Vec::new(),
            spaces,
            active_space: Some(active_space),
            frontmost: None,
            preferred_screen: None,
            mission_control: false,
            failing_ax_calls: 0,
            fail_space_moves: false,
            space_moves: Vec::new(),
            workspace_handlers: Vec::new(),
            observers: HashMap::default(),
        };
        SimulatedSystem { state: Arc::new(Mutex::new(state)) }
    }

    pub fn with_self_pid(self, pid: pid_t) -> SimulatedSystem {
        self.state.lock().self_pid = pid;
        self
    }

    fn element(&self, node: Node) -> AxRef {
        Arc::new(SimElement { system: self.clone(), node })
    }

    fn notify_workspace(&self, notif: WorkspaceNotification) {
        let handlers = self.state.lock().workspace_handlers.clone();
        trace!(?notif, handlers = handlers.len(), "workspace notification");
        for handler in handlers {
            handler(notif.clone());
        }
    }

    fn notify_ax(&self, pid: pid_t, kind: AxNotificationKind, node: Node, window: Option<u32>) {
        let Some(handler) = self.state.lock().observers.get(&pid).cloned() else {
            return;
        };
        trace!(pid, ?kind, ?node, "accessibility notification");
        handler(AxNotification {
            kind,
            element: self.element(node),
            window_id: window.map(WindowServerId::new),
        });
    }

    /// Adds an app without telling anyone, as if it was running before we
    /// started.
    pub fn add_app(&self, app: SimApp) { self.state.lock().apps.push(app); }

    /// Adds a window behind all others without telling anyone.
    pub fn add_window(&self, mut window: SimWindow) {
        let mut state = self.state.lock();
        if window.spaces.is_empty() {
            window.spaces.extend(state.active_space);
        }
        state.windows.push(window);
    }

    pub fn launch(&self, app: SimApp) {
        let info = app.process_info();
        self.add_app(app);
        self.notify_workspace(WorkspaceNotification::ApplicationLaunched(info));
    }

    pub fn finish_launching(&self, pid: pid_t) {
        if let Some(app) = self.state.lock().app_mut(pid) {
            app.is_finished_launching = true;
        }
        self.notify_workspace(WorkspaceNotification::ApplicationFinishedLaunching(pid));
    }

    /// Marks the app as launched without the notification, which the OS does
    /// not always send.
    pub fn finish_launching_silently(&self, pid: pid_t) {
        if let Some(app) = self.state.lock().app_mut(pid) {
            app.is_finished_launching = true;
        }
    }

    pub fn terminate(&self, pid: pid_t) -> bool {
        {
            let mut state = self.state.lock();
            if state.app(pid).is_none() {
                return false;
            }
            state.apps.retain(|a| a.pid != pid);
            state.windows.retain(|w| w.pid != pid);
            state.observers.remove(&pid);
            if state.frontmost == Some(pid) {
                state.frontmost = None;
            }
        }
        self.notify_workspace(WorkspaceNotification::ApplicationsTerminated(vec![pid]));
        true
    }

    /// A new window appears in front of all others.
    pub fn create_window(&self, mut window: SimWindow) {
        let (id, pid) = (window.id, window.pid);
        {
            let mut state = self.state.lock();
            if window.spaces.is_empty() {
                window.spaces.extend(state.active_space);
            }
            state.windows.insert(0, window);
        }
        self.notify_ax(pid, AxNotificationKind::WindowCreated, Node::Window(id), Some(id));
    }

    pub fn destroy_window(&self, id: u32) -> bool {
        let pid = {
            let mut state = self.state.lock();
            let Some(index) = state.windows.iter().position(|w| w.id == id) else {
                return false;
            };
            state.windows.remove(index).pid
        };
        self.notify_ax(pid, AxNotificationKind::UiElementDestroyed, Node::Window(id), Some(id));
        true
    }

    pub fn set_title(&self, id: u32, title: Option<String>) {
        let Some(pid) = self.state.lock().window_mut(id).map(|w| {
            w.title = title;
            w.pid
        }) else {
            return;
        };
        self.notify_ax(pid, AxNotificationKind::TitleChanged, Node::Window(id), Some(id));
    }

    pub fn set_minimized(&self, id: u32, minimized: bool) {
        let Some(pid) = self.state.lock().window_mut(id).map(|w| {
            w.minimized = minimized;
            w.pid
        }) else {
            return;
        };
        self.notify_ax(pid, AxNotificationKind::MiniaturizedChanged, Node::Window(id), Some(id));
    }

    pub fn move_window_to_space(&self, id: u32, space: SpaceId) {
        let Some(pid) = self.state.lock().window_mut(id).map(|w| {
            w.spaces = vec![space];
            w.pid
        }) else {
            return;
        };
        self.notify_ax(pid, AxNotificationKind::Moved, Node::Window(id), Some(id));
    }

    pub fn switch_space(&self, space: SpaceId) {
        self.state.lock().active_space = Some(space);
        self.notify_workspace(WorkspaceNotification::ActiveSpaceChanged(Some(space)));
    }

    pub fn set_mission_control(&self, active: bool) {
        self.state.lock().mission_control = active;
        self.notify_workspace(if active {
            WorkspaceNotification::MissionControlEntered
        } else {
            WorkspaceNotification::MissionControlExited
        });
    }

    /// The user clicks a window: it comes to the front and its app activates.
    pub fn focus_window(&self, id: u32) -> bool {
        let Some(pid) = ({
            let mut state = self.state.lock();
            let pid = state.bring_to_front(id);
            if pid.is_some() {
                state.frontmost = pid;
            }
            pid
        }) else {
            return false;
        };
        self.notify_workspace(WorkspaceNotification::ApplicationActivated(pid));
        self.notify_ax(pid, AxNotificationKind::FocusedWindowChanged, Node::Window(id), Some(id));
        true
    }

    pub fn hide_app(&self, pid: pid_t, hidden: bool) -> bool {
        match self.state.lock().app_mut(pid) {
            Some(app) => app.is_hidden = hidden,
            None => return false,
        }
        self.notify_workspace(if hidden {
            WorkspaceNotification::ApplicationHidden(pid)
        } else {
            WorkspaceNotification::ApplicationUnhidden(pid)
        });
        true
    }

    pub fn set_dock_label(&self, pid: pid_t, label: Option<String>) {
        if let Some(app) = self.state.lock().app_mut(pid) {
            app.dock_label = label;
        }
    }

    pub fn set_preferred_screen(&self, screen: Option<ScreenId>) {
        self.state.lock().preferred_screen = screen;
    }

    /// Makes the next `count` attribute reads fail with a transient error.
    pub fn fail_ax_calls(&self, count: u32) { self.state.lock().failing_ax_calls = count; }

    pub fn fail_space_moves(&self, fail: bool) { self.state.lock().fail_space_moves = fail; }

    pub fn space_moves(&self) -> Vec<SpaceMove> { self.state.lock().space_moves.clone() }

    /// Window ids, front to back.
    pub fn window_ids(&self) -> Vec<u32> {
        self.state.lock().windows.iter().map(|w| w.id).collect()
    }

    pub fn observed_pids(&self) -> Vec<pid_t> {
        let mut pids: Vec<pid_t> = self.state.lock().observers.keys().copied().collect();
        pids.sort_unstable();
        pids
    }

    pub fn window_spaces_of(&self, id: u32) -> Vec<SpaceId> {
        self.state.lock().window(id).map(|w| w.spaces.clone()).unwrap_or_default()
    }

    /// Applies a scenario step. Commands are not for the system; they are
    /// handed back for the caller to deliver.
    pub fn apply(&self, step: &Step) -> Option<Command> {
        debug!(?step, "applying step");
        match step {
            Step::Launch(app) => self.launch(app.clone()),
            Step::FinishLaunching(pid) => self.finish_launching(*pid),
            Step::Terminate(pid) => {
                self.terminate(*pid);
            }
            Step::CreateWindow(window) => self.create_window(window.clone()),
            Step::DestroyWindow(id) => {
                self.destroy_window(*id);
            }
            Step::SetTitle(id, title) => self.set_title(*id, title.clone()),
            Step::SetMinimized(id, minimized) => self.set_minimized(*id, *minimized),
            Step::MoveWindow(id, space) => self.move_window_to_space(*id, *space),
            Step::SwitchSpace(space) => self.switch_space(*space),
            Step::MissionControl(active) => self.set_mission_control(*active),
            Step::FocusWindow(id) => {
                self.focus_window(*id);
            }
            Step::HideApp(pid, hidden) => {
                self.hide_app(*pid, *hidden);
            }
            Step::SetDockLabel(pid, label) => self.set_dock_label(*pid, label.clone()),
            Step::Command(command) => return Some(command.clone()),
        }
        None
    }
}

impl SimElement {
    fn window_elements(&self, state: &SimState, pid: pid_t) -> AxValue {
        AxValue::Elements(
            state.reachable_windows(pid).map(|w| self.system.element(Node::Window(w.id))).collect(),
        )
    }

    fn attribute_locked(&self, state: &SimState, attribute: AxAttribute) -> AxResult<AxValue> {
        let unsupported = || AxError::AttributeUnsupported(attribute.name());
        match self.node {
            Node::App(pid) => {
                let app = state.app(pid).ok_or(AxError::InvalidElement)?;
                match attribute {
                    AxAttribute::Role => Ok(AxValue::String(APPLICATION_ROLE.to_string())),
                    AxAttribute::Title => {
                        app.name.clone().map(AxValue::String).ok_or_else(unsupported)
                    }
                    AxAttribute::Windows => Ok(self.window_elements(state, pid)),
                    AxAttribute::Children if app.bundle_id.as_deref() == Some(DOCK_BUNDLE_ID) => {
                        Ok(AxValue::Elements(vec![self.system.element(Node::DockList)]))
                    }
                    AxAttribute::Children => Ok(self.window_elements(state, pid)),
                    AxAttribute::FocusedWindow => state
                        .reachable_windows(pid)
                        .next()
                        .map(|w| AxValue::Element(self.system.element(Node::Window(w.id))))
                        .ok_or_else(unsupported),
                    _ => Err(unsupported()),
                }
            }
            Node::Window(id) => {
                let window = state.window(id).ok_or(AxError::InvalidElement)?;
                match attribute {
                    AxAttribute::Role => Ok(AxValue::String(window.role.clone())),
                    AxAttribute::Subrole => Ok(AxValue::String(window.subrole.clone())),
                    AxAttribute::Title => {
                        window.title.clone().map(AxValue::String).ok_or_else(unsupported)
                    }
                    AxAttribute::Minimized => Ok(AxValue::Bool(window.minimized)),
                    AxAttribute::FullScreen => Ok(AxValue::Bool(window.fullscreen)),
                    AxAttribute::CloseButton => {
                        Ok(AxValue::Element(self.system.element(Node::CloseButton(id))))
                    }
                    _ => Err(unsupported()),
                }
            }
            Node::CloseButton(id) => {
                state.window(id).ok_or(AxError::InvalidElement)?;
                match attribute {
                    AxAttribute::Role => Ok(AxValue::String(BUTTON_ROLE.to_string())),
                    _ => Err(unsupported()),
                }
            }
            Node::DockList => match attribute {
                AxAttribute::Role => Ok(AxValue::String(role::LIST.to_string())),
                AxAttribute::Children => Ok(AxValue::Elements(
                    state
                        .apps
                        .iter()
                        .filter(|a| {
                            a.activation_policy == ActivationPolicy::Regular && a.url.is_some()
                        })
                        .map(|a| self.system.element(Node::DockItem(a.pid)))
                        .collect(),
                )),
                _ => Err(unsupported()),
            },
            Node::DockItem(pid) => {
                let app = state.app(pid).ok_or(AxError::InvalidElement)?;
                match attribute {
                    AxAttribute::Role => Ok(AxValue::String(DOCK_ITEM_ROLE.to_string())),
                    AxAttribute::Subrole => {
                        Ok(AxValue::String(role::APPLICATION_DOCK_ITEM.to_string()))
                    }
                    AxAttribute::IsApplicationRunning => Ok(AxValue::Bool(true)),
                    AxAttribute::Url => app.url.clone().map(AxValue::Url).ok_or_else(unsupported),
                    AxAttribute::StatusLabel => {
                        app.dock_label.clone().map(AxValue::String).ok_or_else(unsupported)
                    }
                    _ => Err(unsupported()),
                }
            }
        }
    }
}

impl AxElement for SimElement {
    fn attribute(&self, attribute: AxAttribute) -> AxResult<AxValue> {
        let mut state = self.system.state.lock();
        if state.take_failure() {
            return Err(AxError::ApiDisabled);
        }
        self.attribute_locked(&state, attribute)
    }

    fn set_attribute(&self, attribute: AxAttribute, value: AxValue) -> AxResult<()> {
        match (self.node, attribute, value) {
            (Node::Window(id), AxAttribute::Minimized, AxValue::Bool(minimized)) => {
                if self.system.state.lock().window(id).is_none() {
                    return Err(AxError::InvalidElement);
                }
                self.system.set_minimized(id, minimized);
                Ok(())
            }
            _ => Err(AxError::AttributeUnsupported(attribute.name())),
        }
    }

    fn perform_action(&self, action: AxAction) -> AxResult<()> {
        match (self.node, action) {
            (Node::Window(id), AxAction::Raise) => {
                self.system.state.lock().bring_to_front(id).ok_or(AxError::InvalidElement)?;
                Ok(())
            }
            (Node::CloseButton(id), AxAction::Press) => {
                if self.system.destroy_window(id) {
                    Ok(())
                } else {
                    Err(AxError::InvalidElement)
                }
            }
            _ => Err(AxError::ActionUnsupported(action.into())),
        }
    }

    fn window_id(&self) -> AxResult<WindowServerId> {
        match self.node {
            Node::Window(id) => {
                let state = self.system.state.lock();
                state.window(id).map(SimWindow::wid).ok_or(AxError::InvalidElement)
            }
            _ => Err(AxError::AttributeUnsupported("AXWindowNumber")),
        }
    }
}

impl Accessibility for SimulatedSystem {
    fn application_element(&self, pid: pid_t) -> AxResult<AxRef> {
        if self.state.lock().app(pid).is_none() {
            return Err(AxError::InvalidElement);
        }
        Ok(self.element(Node::App(pid)))
    }

    fn observe(
        &self,
        pid: pid_t,
        _notifications: &[AxNotificationKind],
        handler: AxHandler,
    ) -> AxResult<()> {
        let mut state = self.state.lock();
        let refuses = state.app(pid).ok_or(AxError::InvalidElement)?.refuses_observation;
        if refuses {
            return Err(AxError::CannotComplete);
        }
        state.observers.insert(pid, handler);
        Ok(())
    }

    fn unobserve(&self, pid: pid_t) { self.state.lock().observers.remove(&pid); }
}

impl ProcessSource for SimulatedSystem {
    fn running_applications(&self) -> Vec<ProcessInfo> {
        self.state.lock().apps.iter().map(SimApp::process_info).collect()
    }

    fn current_pid(&self) -> pid_t { self.state.lock().self_pid }

    fn frontmost_application(&self) -> Option<pid_t> { self.state.lock().frontmost }

    fn is_finished_launching(&self, pid: pid_t) -> bool {
        self.state.lock().app(pid).is_some_and(|a| a.is_finished_launching)
    }

    fn application_url(&self, bundle_id: &str) -> Option<String> {
        let state = self.state.lock();
        state.apps.iter().find(|a| a.bundle_id.as_deref() == Some(bundle_id))?.url.clone()
    }

    fn application_icon(&self, pid: pid_t) -> Option<WindowImage> {
        self.state.lock().app(pid)?;
        Some(WindowImage { width: 1, height: 1, data: Arc::from(vec![0u8; 4]) })
    }

    fn activate_application(&self, pid: pid_t) -> bool {
        match self.state.lock().app(pid) {
            Some(_) => {}
            None => return false,
        }
        self.state.lock().frontmost = Some(pid);
        self.notify_workspace(WorkspaceNotification::ApplicationActivated(pid));
        true
    }

    fn terminate_application(&self, pid: pid_t) -> bool { self.terminate(pid) }

    fn set_application_hidden(&self, pid: pid_t, hidden: bool) -> bool {
        self.hide_app(pid, hidden)
    }

    fn observe_workspace(&self, handler: WorkspaceHandler) {
        self.state.lock().workspace_handlers.push(handler);
    }
}

impl WindowServer for SimulatedSystem {
    fn active_space(&self) -> Option<SpaceId> { self.state.lock().active_space }

    fn all_spaces(&self) -> Vec<SpaceId> { self.state.lock().spaces.clone() }

    fn windows_in_spaces(&self, spaces: &[SpaceId]) -> Vec<WindowServerId> {
        self.state
            .lock()
            .windows
            .iter()
            .filter(|w| w.spaces.iter().any(|s| spaces.contains(s)))
            .map(SimWindow::wid)
            .collect()
    }

    fn window_spaces(&self, wid: WindowServerId) -> Vec<SpaceId> {
        self.window_spaces_of(wid.as_u32())
    }

    fn add_windows_to_spaces(
        &self,
        windows: &[WindowServerId],
        spaces: &[SpaceId],
    ) -> Result<(), WindowServerError> {
        let mut state = self.state.lock();
        if state.fail_space_moves {
            return Err(WindowServerError::CallFailed { call: "add_windows_to_spaces", code: -1 });
        }
        for wid in windows {
            if let Some(window) = state.window_mut(wid.as_u32()) {
                for space in spaces {
                    if !window.spaces.contains(space) {
                        window.spaces.push(*space);
                    }
                }
            }
        }
        state.space_moves.push(SpaceMove {
            windows: windows.to_vec(),
            spaces: spaces.to_vec(),
            added: true,
        });
        Ok(())
    }

    fn remove_windows_from_spaces(
        &self,
        windows: &[WindowServerId],
        spaces: &[SpaceId],
    ) -> Result<(), WindowServerError> {
        let mut state = self.state.lock();
        if state.fail_space_moves {
            return Err(WindowServerError::CallFailed {
                call: "remove_windows_from_spaces",
                code: -1,
            });
        }
        for wid in windows {
            if let Some(window) = state.window_mut(wid.as_u32()) {
                window.spaces.retain(|s| !spaces.contains(s));
            }
        }
        state.space_moves.push(SpaceMove {
            windows: windows.to_vec(),
            spaces: spaces.to_vec(),
            added: false,
        });
        Ok(())
    }

    fn window_order(&self) -> Vec<WindowServerId> {
        self.state.lock().windows.iter().map(SimWindow::wid).collect()
    }

    fn window_screen(&self, wid: WindowServerId) -> Option<ScreenId> {
        self.state.lock().window(wid.as_u32())?.screen.map(ScreenId::new)
    }

    fn preferred_screen(&self) -> Option<ScreenId> { self.state.lock().preferred_screen }

    fn is_mission_control_active(&self) -> bool { self.state.lock().mission_control }

    fn capture_window(&self, wid: WindowServerId) -> Option<WindowImage> {
        self.state.lock().window(wid.as_u32())?;
        Some(WindowImage { width: 16, height: 10, data: Arc::from(vec![0u8; 16 * 10 * 4]) })
    }

    fn make_key_and_front(&self, pid: pid_t, wid: WindowServerId) -> Result<(), WindowServerError> {
        let owned = self.state.lock().window(wid.as_u32()).is_some_and(|w| w.pid == pid);
        if !owned || !self.focus_window(wid.as_u32()) {
            return Err(WindowServerError::WindowNotFound(wid));
        }
        Ok(())
    }
}

/// One scripted change to the simulated system, or a user command.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Step {
    Launch(SimApp),
    FinishLaunching(pid_t),
    Terminate(pid_t),
    CreateWindow(SimWindow),
    DestroyWindow(u32),
    SetTitle(u32, Option<String>),
    SetMinimized(u32, bool),
    MoveWindow(u32, SpaceId),
    SwitchSpace(SpaceId),
    MissionControl(bool),
    FocusWindow(u32),
    HideApp(pid_t, bool),
    SetDockLabel(pid_t, Option<String>),
    Command(Command),
}

/// Initial system state plus a list of steps, loaded from a ron file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Display order.
    pub spaces: Vec<SpaceId>,
    pub active_space: SpaceId,
    #[serde(default)]
    pub self_pid: Option<pid_t>,
    #[serde(default)]
    pub apps: Vec<SimApp>,
    /// Front to back.
    #[serde(default)]
    pub windows: Vec<SimWindow>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Scenario> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::parse(&buf).with_context(|| format!("parsing scenario {}", path.display()))
    }

    pub fn parse(buf: &str) -> anyhow::Result<Scenario> {
        let options = ron::Options::default().with_default_extension(Extensions::IMPLICIT_SOME);
        let scenario: Scenario = options.from_str(buf)?;
        Ok(scenario)
    }

    /// Builds the initial system. Fails on inconsistent input.
    pub fn system(&self) -> anyhow::Result<SimulatedSystem> {
        if !self.spaces.contains(&self.active_space) {
            bail!("active space {} is not one of the spaces", self.active_space);
        }
        let system = SimulatedSystem::new(self.spaces.clone(), self.active_space);
        let system = match self.self_pid {
            Some(pid) => system.with_self_pid(pid),
            None => system,
        };
        for app in &self.apps {
            system.add_app(app.clone());
        }
        for window in &self.windows {
            if !self.apps.iter().any(|a| a.pid == window.pid) {
                bail!("window {} belongs to unknown pid {}", window.id, window.pid);
            }
            system.add_window(window.clone());
        }
        Ok(system)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sys::ax::AxHandle;

    fn space(id: u64) -> SpaceId { SpaceId::new(id) }

    fn system() -> SimulatedSystem {
        let system = SimulatedSystem::new(vec![space(1), space(2)], space(1)).with_self_pid(1);
        system.add_app(SimApp::new(10, "com.example.editor"));
        system.add_window(SimWindow::new(100, 10, "here"));
        system.add_window(SimWindow::new(101, 10, "there").on_spaces(&[space(2)]));
        system
    }

    #[test]
    fn accessibility_only_sees_active_space() {
        let system = system();
        let app = AxHandle::new(system.application_element(10).unwrap(), Default::default());
        let ids: Vec<u32> =
            app.windows().unwrap().iter().map(|w| w.window_id().unwrap().as_u32()).collect();
        assert_eq!(ids, vec![100]);
        assert_eq!(
            system.windows_in_spaces(&[space(2)]),
            vec![WindowServerId::new(101)]
        );

        system.add_windows_to_spaces(&[WindowServerId::new(101)], &[space(1)]).unwrap();
        assert_eq!(app.windows().unwrap().len(), 2);
    }

    #[test]
    fn injected_failures_are_transient() {
        let system = system();
        system.fail_ax_calls(2);
        let element = system.application_element(10).unwrap();
        assert_eq!(element.attribute(AxAttribute::Role).unwrap_err(), AxError::ApiDisabled);
        let app = AxHandle::new(element, Default::default());
        assert_eq!(app.role().unwrap(), APPLICATION_ROLE);
    }

    #[test]
    fn mutations_notify_observers() {
        let system = system();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        system
            .observe(10, &AxNotificationKind::WINDOW_EVENTS, Arc::new(move |_: AxNotification| {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();
        system.create_window(SimWindow::new(102, 10, "new"));
        system.set_title(102, Some("renamed".into()));
        assert!(system.destroy_window(102));
        assert!(!system.destroy_window(102));
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn closing_through_accessibility_destroys_the_window() {
        let system = system();
        let app = AxHandle::new(system.application_element(10).unwrap(), Default::default());
        let window = app.windows().unwrap().remove(0);
        window.close().unwrap();
        assert_eq!(system.window_ids(), vec![101]);
        assert_eq!(window.window_id().unwrap_err(), AxError::InvalidElement);
    }

    #[test]
    fn refused_space_moves_are_reported() {
        let system = system();
        system.fail_space_moves(true);
        assert!(system.add_windows_to_spaces(&[WindowServerId::new(101)], &[space(1)]).is_err());
        assert!(system.space_moves().is_empty());
    }

    #[test]
    fn parses_scenario_with_implicit_some() {
        let scenario = Scenario::parse(
            r#"(
                spaces: [1, 2],
                active_space: 1,
                apps: [(pid: 10, bundle_id: "com.example.editor", name: "Editor")],
                windows: [(id: 100, pid: 10, title: "main", spaces: [2])],
                steps: [
                    SetTitle(100, "renamed"),
                    Command(ShowUi),
                    Command(CycleSelection(Trailing)),
                ],
            )"#,
        )
        .unwrap();
        assert_eq!(scenario.apps[0].name.as_deref(), Some("Editor"));
        assert_eq!(scenario.windows[0].spaces, vec![space(2)]);
        assert_eq!(scenario.steps[0], Step::SetTitle(100, Some("renamed".into())));
        assert_eq!(scenario.steps.len(), 3);

        let system = scenario.system().unwrap();
        assert_eq!(system.window_spaces_of(100), vec![space(2)]);
        assert_eq!(system.apply(&scenario.steps[1]), Some(Command::ShowUi));
    }

    #[test]
    fn scenario_rejects_unknown_active_space() {
        let scenario = Scenario::parse("(spaces: [1], active_space: 3)").unwrap();
        assert!(scenario.system().is_err());
    }
}
