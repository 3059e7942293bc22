//! The Reactor's job is to keep the window list coherent with the system.
//!
//! It owns the application, window and space registries. Workspace
//! notifications, accessibility notifications and discovery reports all
//! arrive as [`Event`]s on a single channel and are applied in order. User
//! intent arrives the same way as [`Command`]s, and whatever the switcher
//! panel should display is pushed out to the presenter.

mod events;
mod inline;
mod managers;
mod query;

#[cfg(test)]
mod testing;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use events::app::AppEventHandler;
use events::command::CommandEventHandler;
use events::space::SpaceEventHandler;
use events::window::WindowEventHandler;
pub use inline::InlineReactor;
pub use managers::{
    SummonState, VisibilityContext, should_show_to_user, windows_only_on_other_spaces,
};
pub use query::{QueryRequest, ReactorQueryHandle};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, trace};

use crate::actor::app::{DiscoveryContext, DiscoveryReport, WindowInfo};
use crate::actor::notification_center::NotificationCenter;
use crate::actor::{self, presenter};
use crate::common::config::Config;
use crate::model::Window;
use crate::model::server::SwitcherSnapshot;
use crate::sys::Platform;
use crate::sys::app::{ProcessInfo, pid_t};
use crate::sys::ax::AxPolicy;
use crate::sys::screen::SpaceId;
use crate::sys::timer;
use crate::sys::window_server::WindowServerId;

pub type Sender = actor::Sender<Event>;
type Receiver = actor::Receiver<Event>;

/// How long a deferred level sort waits for outstanding discovery reports.
const LEVEL_SORT_RETRY: Duration = Duration::from_millis(10);

#[derive(Clone)]
pub struct ReactorHandle {
    sender: Sender,
    queries: ReactorQueryHandle,
}

impl ReactorHandle {
    pub fn new(sender: Sender, queries: ReactorQueryHandle) -> Self { Self { sender, queries } }

    pub fn sender(&self) -> Sender { self.sender.clone() }

    pub fn send(&self, event: Event) { self.sender.send(event) }

    pub fn command(&self, command: Command) { self.sender.send(Event::Command(command)) }
}

impl std::ops::Deref for ReactorHandle {
    type Target = ReactorQueryHandle;

    fn deref(&self) -> &Self::Target { &self.queries }
}

#[derive(Debug)]
pub enum Event {
    /// Scan spaces, running applications and their windows. Always the first
    /// event after spawning.
    InitialDiscovery,

    ApplicationLaunched(ProcessInfo),
    ApplicationFinishedLaunching(pid_t),
    ApplicationsTerminated(Vec<pid_t>),
    ApplicationActivated(pid_t),
    /// The application was hidden (`true`) or unhidden.
    ApplicationVisibilityChanged(pid_t, bool),

    /// A discovery pass finished. May arrive long after it was started.
    WindowsDiscovered(DiscoveryReport),
    WindowCreated(pid_t, WindowInfo),
    WindowDestroyed(WindowServerId),
    WindowTitleChanged(WindowServerId, Option<String>),
    WindowMinimizedChanged(WindowServerId, bool),
    WindowMoved(WindowServerId),
    WindowFocused(pid_t, WindowServerId),

    /// The active space changed. `None` if the platform didn't say which
    /// space is active now.
    SpaceChanged(Option<SpaceId>),
    MissionControlEntered,
    MissionControlExited,

    /// Deferred: order windows by stacking level once discovery settled.
    SortByLevel,
    /// Deferred: build and show the panel after the display delay.
    RebuildUi,

    Query(QueryRequest),
    Command(Command),
    ConfigUpdated(Config),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Leading,
    Trailing,
}

impl Direction {
    pub fn step(self) -> isize {
        match self {
            Direction::Leading => 1,
            Direction::Trailing => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// The summon shortcut was pressed.
    ShowUi,
    HideUi,
    CycleSelection(Direction),
    /// Select the n-th window of the displayed list.
    SelectWindow(usize),
    FocusSelectedWindow,
    CloseSelectedWindow,
    MinimizeOrRestoreSelectedWindow,
    QuitSelectedApp,
    HideOrShowSelectedApp,
    RefreshOpenUi,
    RefreshAllThumbnails,
}

pub struct Reactor {
    pub config: Config,
    platform: Arc<dyn Platform>,
    app_manager: managers::AppManager,
    window_manager: managers::WindowManager,
    space_manager: managers::SpaceManager,
    summon_manager: managers::SummonManager,
    communication_manager: managers::CommunicationManager,
}

impl Reactor {
    /// Starts the reactor on its own thread and hooks it up to the platform's
    /// notification feed.
    pub fn spawn(
        config: Config,
        platform: Arc<dyn Platform>,
        presenter_tx: presenter::Sender,
    ) -> std::io::Result<ReactorHandle> {
        let (events_tx, events) = actor::channel();
        let mut reactor = Reactor::new(config, platform.clone());
        reactor.communication_manager.events_tx = Some(events_tx.clone());
        reactor.communication_manager.presenter_tx = Some(presenter_tx);

        events_tx.send(Event::InitialDiscovery);
        NotificationCenter::new(events_tx.clone()).watch(&*platform);

        let runtime = tokio::runtime::Builder::new_current_thread().build()?;
        thread::Builder::new()
            .name("reactor".to_string())
            .spawn(move || runtime.block_on(Reactor::run(reactor, events)))?;
        let query_handle = ReactorQueryHandle::new(events_tx.clone());
        Ok(ReactorHandle::new(events_tx, query_handle))
    }

    pub fn new(config: Config, platform: Arc<dyn Platform>) -> Reactor {
        let self_pid = platform.current_pid();
        Reactor {
            config,
            platform,
            app_manager: managers::AppManager::new(self_pid),
            window_manager: managers::WindowManager::new(),
            space_manager: managers::SpaceManager::default(),
            summon_manager: managers::SummonManager::default(),
            communication_manager: managers::CommunicationManager::default(),
        }
    }

    async fn run(mut reactor: Reactor, mut events: Receiver) {
        while let Some((span, event)) = events.recv().await {
            let _guard = span.enter();
            reactor.handle_loop_event(event);
        }
        debug!("reactor channel closed");
    }

    fn handle_loop_event(&mut self, event: Event) {
        if let Event::Query(req) = event {
            self.handle_query_request(req);
            return;
        }
        self.handle_event(event);
    }

    fn log_event(&self, event: &Event) {
        match event {
            Event::WindowMoved(..) | Event::SortByLevel | Event::Query(..) => {
                trace!(?event, "Event")
            }
            _ => debug!(?event, "Event"),
        }
    }

    #[instrument(name = "reactor::handle_event", skip(self), fields(event=?event))]
    fn handle_event(&mut self, event: Event) {
        self.log_event(&event);
        match event {
            Event::InitialDiscovery => self.initial_discovery(),
            Event::ApplicationLaunched(info) => {
                AppEventHandler::handle_application_launched(self, info)
            }
            Event::ApplicationFinishedLaunching(pid) => {
                AppEventHandler::handle_application_finished_launching(self, pid)
            }
            Event::ApplicationsTerminated(pids) => {
                AppEventHandler::handle_applications_terminated(self, &pids)
            }
            Event::ApplicationActivated(pid) => {
                AppEventHandler::handle_application_activated(self, pid)
            }
            Event::ApplicationVisibilityChanged(pid, hidden) => {
                AppEventHandler::handle_application_visibility_changed(self, pid, hidden)
            }
            Event::WindowsDiscovered(report) => {
                AppEventHandler::handle_windows_discovered(self, report)
            }
            Event::WindowCreated(pid, info) => {
                WindowEventHandler::handle_window_created(self, pid, info)
            }
            Event::WindowDestroyed(wid) => WindowEventHandler::handle_window_destroyed(self, wid),
            Event::WindowTitleChanged(wid, title) => {
                WindowEventHandler::handle_window_title_changed(self, wid, title)
            }
            Event::WindowMinimizedChanged(wid, minimized) => {
                WindowEventHandler::handle_window_minimized_changed(self, wid, minimized)
            }
            Event::WindowMoved(wid) => WindowEventHandler::handle_window_moved(self, wid),
            Event::WindowFocused(pid, wid) => {
                WindowEventHandler::handle_window_focused(self, pid, wid)
            }
            Event::SortByLevel => WindowEventHandler::handle_sort_by_level(self),
            Event::SpaceChanged(space) => SpaceEventHandler::handle_space_changed(self, space),
            Event::MissionControlEntered => {
                SpaceEventHandler::handle_mission_control_entered(self)
            }
            Event::MissionControlExited => SpaceEventHandler::handle_mission_control_exited(self),
            Event::RebuildUi => self.rebuild_ui(),
            Event::Command(command) => CommandEventHandler::handle_command(self, command),
            Event::ConfigUpdated(config) => {
                CommandEventHandler::handle_config_updated(self, config)
            }
            Event::Query(req) => self.handle_query_request(req),
        }
    }

    fn ax_policy(&self) -> AxPolicy { AxPolicy::from_settings(&self.config.settings) }

    fn discovery_context(&self) -> Option<DiscoveryContext> {
        let Some(events_tx) = self.communication_manager.events_tx.clone() else {
            error!("reactor has no event sender, cannot discover windows");
            return None;
        };
        Some(DiscoveryContext {
            platform: self.platform.clone(),
            policy: self.ax_policy(),
            events_tx,
        })
    }

    /// Sends `event` back to ourselves after `delay`. Never cancelled.
    fn schedule(&self, delay: Duration, event: Event) {
        let Some(tx) = self.communication_manager.events_tx.clone() else {
            return;
        };
        if delay.is_zero() {
            tx.send(event);
        } else {
            timer::schedule_after(delay, move || tx.send(event));
        }
    }

    fn queue_level_sort(&mut self, delay: Duration) {
        self.summon_manager.level_sort_pending = true;
        self.schedule(delay, Event::SortByLevel);
    }

    fn is_mission_control_active(&self) -> bool {
        self.summon_manager.mission_control_active || self.platform.is_mission_control_active()
    }

    fn register_application(&mut self, info: ProcessInfo) -> bool {
        if !info.is_eligible(self.platform.current_pid()) {
            return false;
        }
        let icon = self.platform.application_icon(info.pid);
        self.app_manager.add(info, icon)
    }

    fn initial_discovery(&mut self) {
        self.space_manager.initial_discovery(&*self.platform);
        let added = self.app_manager.add_running_applications(&*self.platform);
        debug!(added, "registered running applications");
        let Some(cx) = self.discovery_context() else {
            return;
        };

        let only_elsewhere = if self.space_manager.other_spaces().is_empty() {
            Vec::new()
        } else {
            self.space_manager.windows_only_on_other_spaces(&*self.platform)
        };
        if only_elsewhere.is_empty() {
            self.app_manager.observe_all(&cx);
        } else {
            // Windows on other spaces are invisible to accessibility. Pull
            // them onto this space for the duration of the scan.
            debug!(windows = ?only_elsewhere, "observing windows from other spaces");
            let added = self.space_manager.bring_to_current_space(&*self.platform, &only_elsewhere);
            let timeout = self.config.settings.blocking_discovery_timeout;
            let finished = self.app_manager.observe_all_blocking(&cx, timeout);
            debug!(finished, "blocking discovery done");
            if added {
                self.space_manager.remove_from_current_space(&*self.platform, &only_elsewhere);
            }
        }
        self.queue_level_sort(Duration::ZERO);
    }

    /// Starts tracking a window reported by discovery or a notification.
    fn add_window(&mut self, pid: pid_t, info: WindowInfo, at_front: bool) -> bool {
        if self.window_manager.contains(info.id) {
            return false;
        }
        let Some(app) = self.app_manager.get(pid) else {
            trace!(pid, wid = ?info.id, "window of untracked app");
            return false;
        };
        let icon = app.icon.clone();
        let dock_label = app.dock_label.clone();
        let wid = info.id;
        let space = self.space_manager.assignment_for(wid, &*self.platform);
        let mut window = Window::new(pid, info, space);
        window.screen = self.platform.window_screen(wid);
        window.icon = icon;
        window.dock_label = dock_label;
        if at_front {
            self.window_manager.push_front(window)
        } else {
            self.window_manager.push(window)
        }
    }

    fn refresh_visibility(&mut self) {
        let cx = VisibilityContext {
            filters: &self.config.settings.filters,
            active_space: self.space_manager.current,
            screen: self.platform.preferred_screen(),
            frontmost: self.platform.frontmost_application(),
        };
        self.window_manager.refresh_which_windows_show_to_user(&self.app_manager, &cx);
    }

    fn refresh_window_visibility(&mut self, wid: WindowServerId) -> bool {
        let cx = VisibilityContext {
            filters: &self.config.settings.filters,
            active_space: self.space_manager.current,
            screen: self.platform.preferred_screen(),
            frontmost: self.platform.frontmost_application(),
        };
        self.window_manager.refresh_window_shows_to_user(wid, &self.app_manager, &cx)
    }

    fn snapshot(&self) -> SwitcherSnapshot { self.window_manager.snapshot(&self.app_manager) }

    fn hide_ui(&mut self) {
        debug!("hiding ui");
        self.summon_manager.ui_in_use = false;
        self.summon_manager.state = SummonState::Idle;
        self.summon_manager.panel_shown = false;
        self.communication_manager.present(presenter::Event::Hide);
    }

    /// First summon refreshes everything and schedules the panel; later
    /// summons while the switcher is open just advance the selection.
    fn show_ui_or_cycle_selection(&mut self) {
        if self.summon_manager.state == SummonState::Cycling {
            self.window_manager.cycle_focused_index(Direction::Leading.step());
            self.present_refresh();
            return;
        }
        self.summon_manager.state = SummonState::FirstSummon;
        if self.window_manager.is_empty() || self.is_mission_control_active() {
            self.hide_ui();
            return;
        }
        let platform = self.platform.clone();
        self.space_manager.refresh_ids_and_indexes(&*platform);
        self.space_manager.refresh_current_space_id(&*platform);
        self.window_manager.update_spaces(&mut self.space_manager, &*platform);
        if let Some(cx) = self.discovery_context() {
            self.app_manager.observe_unsubscribed(&cx);
        }
        self.refresh_visibility();
        if !self.window_manager.any_shown() {
            self.hide_ui();
            return;
        }
        self.window_manager.update_focused_index(0);
        self.window_manager.cycle_focused_index(1);
        self.summon_manager.state = SummonState::Cycling;
        self.summon_manager.ui_builds_scheduled += 1;
        self.schedule(self.config.settings.window_display_delay, Event::RebuildUi);
    }

    fn rebuild_ui(&mut self) {
        self.summon_manager.ui_builds_handled += 1;
        if !self.summon_manager.ui_in_use {
            trace!("switcher no longer in use, skipping rebuild");
            return;
        }
        let platform = self.platform.clone();
        self.window_manager.refresh_all_thumbnails(&*platform);
        self.app_manager.refresh_badges(&*platform, self.ax_policy());
        self.window_manager.sync_dock_labels(&self.app_manager);
        if !self.refresh_open_ui_state(None) {
            return;
        }
        self.summon_manager.panel_shown = true;
        self.communication_manager.present(presenter::Event::Show(self.snapshot()));
    }

    fn refresh_open_ui(&mut self, windows: Option<&[WindowServerId]>) {
        if self.refresh_open_ui_state(windows) {
            self.present_refresh();
        }
    }

    /// Brings the open switcher's state up to date, either for `windows` or
    /// for everything. Returns false if the switcher is (or became) closed.
    fn refresh_open_ui_state(&mut self, windows: Option<&[WindowServerId]>) -> bool {
        if !self.summon_manager.ui_in_use {
            return false;
        }
        let platform = self.platform.clone();
        // Some display setups don't report space switches; don't trust our copy.
        self.space_manager.refresh_current_space_id(&*platform);
        match windows {
            Some(windows) => {
                for &wid in windows {
                    self.window_manager.refresh_thumbnail(wid, &*platform);
                    self.window_manager.update_window_space(
                        wid,
                        &mut self.space_manager,
                        &*platform,
                    );
                    self.refresh_window_visibility(wid);
                }
            }
            None => self.refresh_visibility(),
        }
        if !self.window_manager.any_shown() {
            self.hide_ui();
            return false;
        }
        true
    }

    fn present_refresh(&self) {
        if self.summon_manager.panel_shown {
            self.communication_manager.present(presenter::Event::Refresh(self.snapshot()));
        }
    }
}
