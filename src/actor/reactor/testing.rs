use std::sync::Arc;
use std::time::Duration;

use super::InlineReactor;
use crate::common::config::Config;
use crate::sys::screen::SpaceId;
use crate::sys::sim::{SimApp, SimWindow, SimulatedSystem};
use crate::sys::window_server::WindowServerId;

pub const SELF_PID: i32 = 1;
pub const SETTLE: Duration = Duration::from_secs(2);

/// Short accessibility budgets so failure paths don't slow the tests down.
pub fn fast_config() -> Config {
    let mut config = Config::default();
    config.settings.ax_timeout = Duration::from_millis(200);
    config.settings.ax_retry_interval = Duration::from_millis(1);
    config.settings.blocking_discovery_timeout = Duration::from_millis(500);
    config.settings.window_display_delay = Duration::ZERO;
    config
}

pub fn space(id: u64) -> SpaceId { SpaceId::new(id) }

pub fn wid(id: u32) -> WindowServerId { WindowServerId::new(id) }

pub fn system(spaces: &[u64], active: u64) -> SimulatedSystem {
    SimulatedSystem::new(spaces.iter().copied().map(space).collect(), space(active))
        .with_self_pid(SELF_PID)
}

/// Adds an app with one window per title, each on the active space.
pub fn app_with_windows(system: &SimulatedSystem, pid: i32, first_wid: u32, titles: &[&str]) {
    system.add_app(SimApp::new(pid, &format!("com.example.app{pid}")));
    for (i, title) in titles.iter().enumerate() {
        system.add_window(SimWindow::new(first_wid + i as u32, pid, title));
    }
}

pub fn start(system: &SimulatedSystem, config: Config) -> InlineReactor {
    let mut reactor = InlineReactor::new(config, Arc::new(system.clone()));
    assert!(reactor.settle(SETTLE), "initial discovery did not settle");
    reactor
}

pub fn window_ids(reactor: &InlineReactor) -> Vec<u32> {
    reactor.windows().iter().map(|w| w.id.as_u32()).collect()
}
