use tracing::{debug, info};

use crate::actor::reactor::Reactor;
use crate::sys::screen::SpaceId;

pub struct SpaceEventHandler;

impl SpaceEventHandler {
    /// Switching spaces exposes windows that accessibility could not see
    /// before, so every app is scanned again. Known windows are deduplicated.
    pub fn handle_space_changed(reactor: &mut Reactor, space: Option<SpaceId>) {
        let platform = reactor.platform.clone();
        reactor.space_manager.refresh_ids_and_indexes(&*platform);
        reactor.space_manager.current = space.or_else(|| platform.active_space());
        debug!(current = ?reactor.space_manager.current, "space changed");

        reactor.window_manager.update_spaces(&mut reactor.space_manager, &*platform);
        if let Some(cx) = reactor.discovery_context() {
            reactor.app_manager.observe_all(&cx);
        }
        reactor.refresh_open_ui(None);
    }

    pub fn handle_mission_control_entered(reactor: &mut Reactor) {
        info!("mission control entered");
        reactor.summon_manager.mission_control_active = true;
        if reactor.summon_manager.ui_in_use {
            reactor.hide_ui();
        }
    }

    pub fn handle_mission_control_exited(reactor: &mut Reactor) {
        info!("mission control exited");
        reactor.summon_manager.mission_control_active = false;
    }
}
