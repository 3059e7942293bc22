use tracing::{debug, trace};

use crate::actor::app::WindowInfo;
use crate::actor::reactor::{LEVEL_SORT_RETRY, Reactor};
use crate::model::WindowFlags;
use crate::sys::app::pid_t;
use crate::sys::window_server::WindowServerId;

pub struct WindowEventHandler;

impl WindowEventHandler {
    pub fn handle_window_created(reactor: &mut Reactor, pid: pid_t, info: WindowInfo) {
        let wid = info.id;
        if reactor.add_window(pid, info, true) {
            debug!(pid, ?wid, "window created");
            reactor.refresh_open_ui(Some(&[wid]));
        }
    }

    pub fn handle_window_destroyed(reactor: &mut Reactor, wid: WindowServerId) {
        let removed = reactor.window_manager.remove_windows(|w| w.id == wid);
        if removed.is_empty() {
            trace!(?wid, "destroyed window was not tracked");
            return;
        }
        reactor.space_manager.forget_window(wid);
        if reactor.window_manager.is_empty() {
            reactor.hide_ui();
            return;
        }
        reactor.refresh_open_ui(None);
    }

    pub fn handle_window_title_changed(
        reactor: &mut Reactor,
        wid: WindowServerId,
        title: Option<String>,
    ) {
        let Some(window) = reactor.window_manager.get_mut(wid) else {
            return;
        };
        window.title = title;
        reactor.refresh_open_ui(Some(&[wid]));
    }

    pub fn handle_window_minimized_changed(
        reactor: &mut Reactor,
        wid: WindowServerId,
        minimized: bool,
    ) {
        let Some(window) = reactor.window_manager.get_mut(wid) else {
            return;
        };
        window.flags.set(WindowFlags::MINIMIZED, minimized);
        reactor.refresh_open_ui(Some(&[wid]));
    }

    /// A move may have taken the window to another screen or space.
    pub fn handle_window_moved(reactor: &mut Reactor, wid: WindowServerId) {
        if !reactor.window_manager.contains(wid) {
            return;
        }
        let platform = reactor.platform.clone();
        reactor.window_manager.update_window_space(wid, &mut reactor.space_manager, &*platform);
        reactor.refresh_open_ui(Some(&[wid]));
    }

    pub fn handle_window_focused(reactor: &mut Reactor, pid: pid_t, wid: WindowServerId) {
        if !reactor.config.settings.ordering.most_recent_first {
            return;
        }
        if reactor.window_manager.get(wid).is_none_or(|w| w.pid != pid) {
            return;
        }
        if reactor.window_manager.move_to_front(wid) {
            trace!(?wid, "moved focused window to front");
            reactor.refresh_open_ui(None);
        }
    }

    /// Stacking order is only meaningful once every app has reported its
    /// windows, so this keeps requeueing itself until discovery settles.
    pub fn handle_sort_by_level(reactor: &mut Reactor) {
        if reactor.app_manager.has_pending_discoveries() {
            trace!("discovery still running, deferring level sort");
            reactor.queue_level_sort(LEVEL_SORT_RETRY);
            return;
        }
        reactor.summon_manager.level_sort_pending = false;
        let order = reactor.platform.window_order();
        reactor.window_manager.sort_by_level(&order);
        debug!(windows = ?reactor.window_manager.ids(), "sorted windows by level");
        reactor.refresh_open_ui(None);
    }
}
