use tracing::{debug, trace};

use crate::actor::app::{DiscoveryReport, Subscription};
use crate::actor::reactor::Reactor;
use crate::sys::app::{ProcessInfo, pid_t};
use crate::sys::ax::{AxAttribute, AxHandle, absent};

pub struct AppEventHandler;

impl AppEventHandler {
    pub fn handle_application_launched(reactor: &mut Reactor, info: ProcessInfo) {
        let pid = info.pid;
        if !reactor.register_application(info) {
            return;
        }
        let Some(cx) = reactor.discovery_context() else {
            return;
        };
        if let Some(app) = reactor.app_manager.get_mut(pid) {
            app.observe_windows(&cx, None);
        }
    }

    /// Discovery is skipped for apps that are still launching; this is where
    /// it gets picked up again.
    pub fn handle_application_finished_launching(reactor: &mut Reactor, pid: pid_t) {
        let Some(cx) = reactor.discovery_context() else {
            return;
        };
        let Some(app) = reactor.app_manager.get_mut(pid) else {
            return;
        };
        app.info.is_finished_launching = true;
        if app.subscription == Subscription::None {
            app.observe_windows(&cx, None);
        }
    }

    pub fn handle_applications_terminated(reactor: &mut Reactor, pids: &[pid_t]) {
        let removed = reactor.app_manager.remove(pids);
        for app in &removed {
            if app.subscription != Subscription::None {
                reactor.platform.unobserve(app.pid());
            }
        }
        let windows = reactor.window_manager.remove_windows(|w| pids.contains(&w.pid));
        for window in &windows {
            reactor.space_manager.forget_window(window.id);
        }
        debug!(apps = removed.len(), windows = windows.len(), "applications terminated");

        if reactor.window_manager.is_empty() {
            reactor.hide_ui();
            return;
        }
        reactor.refresh_open_ui(None);
    }

    pub fn handle_application_activated(reactor: &mut Reactor, pid: pid_t) {
        if !reactor.config.settings.ordering.most_recent_first {
            return;
        }
        if reactor.app_manager.get(pid).is_none() {
            return;
        }
        // Ask the app which window has focus; fall back to its frontmost
        // window in our list.
        let focused = reactor
            .platform
            .application_element(pid)
            .ok()
            .map(|element| AxHandle::new(element, reactor.ax_policy()))
            .and_then(|ax| absent(ax.element_attr(AxAttribute::FocusedWindow)))
            .and_then(|window| absent(window.window_id()))
            .filter(|wid| reactor.window_manager.contains(*wid))
            .or_else(|| reactor.window_manager.iter().find(|w| w.pid == pid).map(|w| w.id));
        if let Some(wid) = focused {
            trace!(pid, ?wid, "moving activated window to front");
            reactor.window_manager.move_to_front(wid);
            reactor.refresh_open_ui(None);
        }
    }

    pub fn handle_application_visibility_changed(reactor: &mut Reactor, pid: pid_t, hidden: bool) {
        let Some(app) = reactor.app_manager.get_mut(pid) else {
            return;
        };
        app.info.is_hidden = hidden;
        let windows: Vec<_> =
            reactor.window_manager.iter().filter(|w| w.pid == pid).map(|w| w.id).collect();
        reactor.refresh_open_ui(Some(&windows));
    }

    pub fn handle_windows_discovered(reactor: &mut Reactor, report: DiscoveryReport) {
        let pid = report.pid;
        let Some(app) = reactor.app_manager.get_mut(pid) else {
            // The app quit while we were scanning it.
            if report.subscribed == Some(true) {
                reactor.platform.unobserve(pid);
            }
            return;
        };
        app.finish_discovery(&report);

        let mut added = Vec::new();
        for info in report.windows {
            let wid = info.id;
            if reactor.add_window(pid, info, false) {
                added.push(wid);
            }
        }
        if !added.is_empty() {
            debug!(pid, windows = ?added, "discovered windows");
            reactor.refresh_open_ui(Some(&added));
        }
    }
}
