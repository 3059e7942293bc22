//! User intent: the summon state machine and actions on the selected window.

use tracing::{debug, info, warn};

use crate::actor::reactor::{Command, Reactor, SummonState};
use crate::common::config::Config;
use crate::model::WindowFlags;
use crate::sys::window_server::WindowServer;

pub struct CommandEventHandler;

impl CommandEventHandler {
    pub fn handle_command(reactor: &mut Reactor, command: Command) {
        info!(?command);
        match command {
            Command::ShowUi => {
                reactor.summon_manager.ui_in_use = true;
                reactor.show_ui_or_cycle_selection();
            }
            Command::HideUi => reactor.hide_ui(),
            Command::CycleSelection(direction) => {
                if reactor.summon_manager.state != SummonState::Cycling {
                    return;
                }
                reactor.window_manager.cycle_focused_index(direction.step());
                reactor.present_refresh();
            }
            Command::SelectWindow(position) => {
                if reactor.summon_manager.ui_in_use && reactor.window_manager.select_shown(position)
                {
                    reactor.present_refresh();
                }
            }
            Command::FocusSelectedWindow => Self::focus_selected_window(reactor),
            Command::CloseSelectedWindow => Self::close_selected_window(reactor),
            Command::MinimizeOrRestoreSelectedWindow => Self::minimize_or_restore(reactor),
            Command::QuitSelectedApp => Self::quit_selected_app(reactor),
            Command::HideOrShowSelectedApp => Self::hide_or_show_selected_app(reactor),
            Command::RefreshOpenUi => reactor.refresh_open_ui(None),
            Command::RefreshAllThumbnails => {
                let platform = reactor.platform.clone();
                reactor.window_manager.refresh_all_thumbnails(&*platform);
                reactor.present_refresh();
            }
        }
    }

    pub fn handle_config_updated(reactor: &mut Reactor, config: Config) {
        for issue in config.validate() {
            warn!(%issue, "config problem");
        }
        reactor.config = config;
        reactor.refresh_open_ui(None);
    }

    /// Hides the switcher first; focusing while mission control is up would
    /// fight with it, so that case does nothing.
    fn focus_selected_window(reactor: &mut Reactor) {
        let target = reactor.window_manager.focused_window().map(|w| (w.pid, w.id, w.ax.clone()));
        reactor.hide_ui();
        if reactor.is_mission_control_active() {
            debug!("mission control is active, not focusing");
            return;
        }
        let Some((pid, wid, ax)) = target else {
            return;
        };
        if let Err(e) = reactor.platform.make_key_and_front(pid, wid) {
            warn!(pid, ?wid, %e, "could not bring window to front");
        }
        if let Some(ax) = ax
            && let Err(e) = ax.raise()
        {
            debug!(?wid, %e, "could not raise window");
        }
        if reactor.config.settings.ordering.most_recent_first {
            reactor.window_manager.move_to_front(wid);
        }
    }

    fn close_selected_window(reactor: &mut Reactor) {
        let Some(window) = reactor.window_manager.focused_window() else {
            return;
        };
        let Some(ax) = &window.ax else {
            return;
        };
        if let Err(e) = ax.close() {
            debug!(wid = ?window.id, %e, "could not close window");
        }
    }

    fn minimize_or_restore(reactor: &mut Reactor) {
        let Some(window) = reactor.window_manager.focused_window() else {
            return;
        };
        let wid = window.id;
        let minimize = !window.is_minimized();
        let Some(ax) = window.ax.clone() else {
            return;
        };
        match ax.set_minimized(minimize) {
            Ok(()) => {
                if let Some(window) = reactor.window_manager.get_mut(wid) {
                    window.flags.set(WindowFlags::MINIMIZED, minimize);
                }
                reactor.refresh_open_ui(Some(&[wid]));
            }
            Err(e) => debug!(?wid, %e, "could not change minimized state"),
        }
    }

    fn quit_selected_app(reactor: &mut Reactor) {
        let Some(pid) = reactor.window_manager.focused_window().map(|w| w.pid) else {
            return;
        };
        if !reactor.platform.terminate_application(pid) {
            warn!(pid, "could not terminate application");
        }
    }

    fn hide_or_show_selected_app(reactor: &mut Reactor) {
        let Some(pid) = reactor.window_manager.focused_window().map(|w| w.pid) else {
            return;
        };
        let Some(app) = reactor.app_manager.get_mut(pid) else {
            return;
        };
        let hide = !app.info.is_hidden;
        if reactor.platform.set_application_hidden(pid, hide) {
            app.info.is_hidden = hide;
            let windows: Vec<_> =
                reactor.window_manager.iter().filter(|w| w.pid == pid).map(|w| w.id).collect();
            reactor.refresh_open_ui(Some(&windows));
        } else {
            warn!(pid, hide, "could not change application visibility");
        }
    }
}
