//! Per-application state and window discovery.
//!
//! An [`Application`] lives in the reactor. Talking to its accessibility tree
//! is slow, so discovery runs on a short-lived background thread that reports
//! back through the reactor's event channel. During blocking initial
//! discovery the reactor also waits on a completion channel.

use std::sync::Arc;
use std::thread;

use crossbeam_channel as cbc;
use tracing::{debug, trace, warn};

use crate::actor::reactor::{self, Event};
use crate::sys::Platform;
use crate::sys::app::{ActivationPolicy, ProcessInfo, pid_t};
use crate::sys::ax::{
    AxHandle, AxHandler, AxNotification, AxNotificationKind, AxPolicy, AxResult, absent,
};
use crate::sys::window_server::{WindowImage, WindowServerId};

/// What the accessibility tree says about one window.
#[derive(Debug, Clone)]
pub struct WindowInfo {
    pub id: WindowServerId,
    pub title: Option<String>,
    pub role: Option<String>,
    pub subrole: Option<String>,
    pub is_minimized: bool,
    pub is_fullscreen: bool,
    pub ax: Option<AxHandle>,
}

impl WindowInfo {
    /// Reads a window node. Fails only if the window id is unreadable, which
    /// means the node is not (or no longer) a real window.
    pub fn from_element(element: &AxHandle) -> AxResult<WindowInfo> {
        let id = element.window_id()?;
        Ok(WindowInfo {
            id,
            title: element.title(),
            role: absent(element.role()),
            subrole: absent(element.subrole()),
            is_minimized: element.is_minimized().unwrap_or(false),
            is_fullscreen: element.is_fullscreen().unwrap_or(false),
            ax: Some(element.clone()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    None,
    Pending,
    Active,
}

/// Result of one discovery pass for one application.
#[derive(Debug)]
pub struct DiscoveryReport {
    pub pid: pid_t,
    /// Whether a subscription was requested by this pass and succeeded.
    /// `None` if the pass did not try to subscribe.
    pub subscribed: Option<bool>,
    pub windows: Vec<WindowInfo>,
}

/// Everything a discovery thread needs; cheap to clone.
#[derive(Clone)]
pub struct DiscoveryContext {
    pub platform: Arc<dyn Platform>,
    pub policy: AxPolicy,
    pub events_tx: reactor::Sender,
}

#[derive(Debug)]
pub struct Application {
    pub info: ProcessInfo,
    pub dock_label: Option<String>,
    pub icon: Option<WindowImage>,
    pub subscription: Subscription,
    /// Discovery passes started but not yet reported.
    pub pending_discoveries: usize,
}

impl Application {
    pub fn new(info: ProcessInfo, icon: Option<WindowImage>) -> Application {
        Application {
            info,
            dock_label: None,
            icon,
            subscription: Subscription::None,
            pending_discoveries: 0,
        }
    }

    pub fn pid(&self) -> pid_t { self.info.pid }

    pub fn bundle_id(&self) -> Option<&str> { self.info.bundle_id.as_deref() }

    pub fn is_regular(&self) -> bool { self.info.activation_policy == ActivationPolicy::Regular }

    /// Starts a discovery pass: subscribes to window notifications if that has
    /// not been done yet, then scans the app's current windows.
    ///
    /// Does nothing and returns false until the app has finished launching.
    /// There is no reliable callback for that, so the platform is asked again
    /// on each attempt and callers retry later. The
    /// report always arrives through the event channel; `completion` is
    /// additionally signalled once it has been sent.
    pub fn observe_windows(
        &mut self,
        cx: &DiscoveryContext,
        completion: Option<cbc::Sender<pid_t>>,
    ) -> bool {
        let pid = self.pid();
        if !self.info.is_finished_launching {
            self.info.is_finished_launching = cx.platform.is_finished_launching(pid);
        }
        if !self.info.is_finished_launching {
            debug!(pid, "app has not finished launching, deferring discovery");
            return false;
        }
        let subscribe = self.subscription == Subscription::None;
        if subscribe {
            self.subscription = Subscription::Pending;
        }
        self.pending_discoveries += 1;

        let cx = cx.clone();
        let spawned = thread::Builder::new().name(format!("discover-{pid}")).spawn(move || {
            let report = discover(&cx, pid, subscribe);
            cx.events_tx.send(Event::WindowsDiscovered(report));
            if let Some(tx) = completion {
                // The waiter may have given up already.
                _ = tx.send(pid);
            }
        });
        if let Err(e) = spawned {
            warn!(pid, %e, "could not spawn discovery thread");
            self.pending_discoveries -= 1;
            if subscribe {
                self.subscription = Subscription::None;
            }
            return false;
        }
        true
    }

    /// Bookkeeping for a finished discovery pass.
    pub fn finish_discovery(&mut self, report: &DiscoveryReport) {
        self.pending_discoveries = self.pending_discoveries.saturating_sub(1);
        match report.subscribed {
            Some(true) => self.subscription = Subscription::Active,
            Some(false) => self.subscription = Subscription::None,
            None => {}
        }
    }
}

fn discover(cx: &DiscoveryContext, pid: pid_t, subscribe: bool) -> DiscoveryReport {
    let app = match cx.platform.application_element(pid) {
        Ok(element) => AxHandle::new(element, cx.policy),
        Err(e) => {
            debug!(pid, %e, "no accessibility element for app");
            return DiscoveryReport {
                pid,
                subscribed: subscribe.then_some(false),
                windows: Vec::new(),
            };
        }
    };

    let subscribed = subscribe.then(|| {
        let handler = notification_handler(pid, cx.policy, cx.events_tx.clone());
        match cx.platform.observe(pid, &AxNotificationKind::WINDOW_EVENTS, handler) {
            Ok(()) => true,
            Err(e) => {
                debug!(pid, %e, "could not observe app");
                false
            }
        }
    });

    let windows = match app.windows() {
        Ok(windows) => windows
            .iter()
            .filter_map(|w| match WindowInfo::from_element(w) {
                Ok(info) => Some(info),
                Err(e) => {
                    trace!(pid, %e, "skipping element without window id");
                    None
                }
            })
            .collect(),
        Err(e) => {
            debug!(pid, %e, "could not list windows");
            Vec::new()
        }
    };
    trace!(pid, count = windows.len(), "discovered windows");
    DiscoveryReport { pid, subscribed, windows }
}

/// Turns raw accessibility notifications for `pid` into reactor events. Runs
/// on whatever thread the platform delivers notifications on.
fn notification_handler(pid: pid_t, policy: AxPolicy, events_tx: reactor::Sender) -> AxHandler {
    Arc::new(move |notif: AxNotification| {
        let element = AxHandle::new(notif.element.clone(), policy);
        let window_id = || notif.window_id.or_else(|| absent(element.window_id()));
        let event = match notif.kind {
            AxNotificationKind::WindowCreated => match WindowInfo::from_element(&element) {
                Ok(info) => Event::WindowCreated(pid, info),
                Err(e) => {
                    trace!(pid, %e, "ignoring created element without window id");
                    return;
                }
            },
            AxNotificationKind::UiElementDestroyed => match window_id() {
                Some(wid) => Event::WindowDestroyed(wid),
                None => return,
            },
            AxNotificationKind::TitleChanged => match window_id() {
                Some(wid) => Event::WindowTitleChanged(wid, element.title()),
                None => return,
            },
            AxNotificationKind::MiniaturizedChanged => match window_id() {
                Some(wid) => {
                    Event::WindowMinimizedChanged(wid, element.is_minimized().unwrap_or(false))
                }
                None => return,
            },
            AxNotificationKind::Moved => match window_id() {
                Some(wid) => Event::WindowMoved(wid),
                None => return,
            },
            AxNotificationKind::FocusedWindowChanged => match window_id() {
                Some(wid) => Event::WindowFocused(pid, wid),
                None => return,
            },
        };
        events_tx.send(event);
    })
}
