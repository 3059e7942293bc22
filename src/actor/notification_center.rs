//! This actor forwards the global workspace notification feed, which tells us
//! when an application is launched, quits or is focused and when the active
//! space or mission control state changes, to the reactor.

use std::sync::Arc;

use tracing::{info_span, trace};

use crate::actor::reactor::{self, Event};
use crate::sys::app::{ProcessSource, WorkspaceHandler, WorkspaceNotification};

pub struct NotificationCenter {
    events_tx: reactor::Sender,
}

impl NotificationCenter {
    pub fn new(events_tx: reactor::Sender) -> Self { NotificationCenter { events_tx } }

    /// Registers with the platform. Notifications are forwarded for as long as
    /// the platform keeps the handler.
    pub fn watch<S: ProcessSource + ?Sized>(self, source: &S) {
        let this = Arc::new(self);
        let handler: WorkspaceHandler = Arc::new(move |notif| this.handle(notif));
        source.observe_workspace(handler);
    }

    fn handle(&self, notif: WorkspaceNotification) {
        let span = info_span!("notification_center::handle", ?notif);
        let _s = span.enter();
        trace!("workspace notification");
        self.events_tx.send(Self::translate(notif));
    }

    pub fn translate(notif: WorkspaceNotification) -> Event {
        use WorkspaceNotification as N;
        match notif {
            N::ApplicationLaunched(info) => Event::ApplicationLaunched(info),
            N::ApplicationFinishedLaunching(pid) => Event::ApplicationFinishedLaunching(pid),
            N::ApplicationsTerminated(pids) => Event::ApplicationsTerminated(pids),
            N::ApplicationActivated(pid) => Event::ApplicationActivated(pid),
            N::ApplicationHidden(pid) => Event::ApplicationVisibilityChanged(pid, true),
            N::ApplicationUnhidden(pid) => Event::ApplicationVisibilityChanged(pid, false),
            N::ActiveSpaceChanged(space) => Event::SpaceChanged(space),
            N::MissionControlEntered => Event::MissionControlEntered,
            N::MissionControlExited => Event::MissionControlExited,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hide_and_unhide_map_to_visibility_changes() {
        assert!(matches!(
            NotificationCenter::translate(WorkspaceNotification::ApplicationHidden(4)),
            Event::ApplicationVisibilityChanged(4, true)
        ));
        assert!(matches!(
            NotificationCenter::translate(WorkspaceNotification::ApplicationUnhidden(4)),
            Event::ApplicationVisibilityChanged(4, false)
        ));
    }

    #[test]
    fn forwards_to_reactor_channel() {
        let (tx, mut rx) = crate::actor::channel();
        let center = NotificationCenter::new(tx);
        center.handle(WorkspaceNotification::ApplicationsTerminated(vec![1, 2]));
        let (_span, event) = rx.try_recv().unwrap();
        assert!(matches!(event, Event::ApplicationsTerminated(pids) if pids == vec![1, 2]));
    }
}
