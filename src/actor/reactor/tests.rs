use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use test_log::test;

use super::testing::*;
use super::{Command, Direction, Event, Reactor, SummonState};
use crate::actor::presenter;
use crate::model::WindowFlags;
use crate::sys::sim::{SimApp, SimWindow, SpaceMove};

fn command(reactor: &mut super::InlineReactor, command: Command) {
    reactor.send(Event::Command(command));
    assert!(reactor.settle(SETTLE), "reactor did not settle");
}

fn shown_ids(reactor: &super::InlineReactor) -> Vec<u32> {
    reactor.snapshot().windows.iter().map(|w| w.id.as_u32()).collect()
}

#[test]
fn discovers_running_apps_and_forgets_terminated_ones() {
    let system = system(&[1], 1);
    app_with_windows(&system, 10, 100, &["mail"]);
    app_with_windows(&system, 20, 200, &["editor 1", "editor 2"]);
    app_with_windows(&system, 30, 300, &["terminal"]);
    let mut reactor = start(&system, fast_config());

    assert_eq!(window_ids(&reactor), vec![100, 200, 201, 300]);
    let pids: Vec<i32> = reactor.applications().iter().map(|a| a.pid).collect();
    assert_eq!(pids, vec![10, 20, 30]);
    assert_eq!(system.observed_pids(), vec![10, 20, 30]);

    system.terminate(20);
    assert!(reactor.settle(SETTLE));
    assert_eq!(window_ids(&reactor), vec![100, 300]);
    assert_eq!(reactor.applications().len(), 2);
}

#[test]
fn ignores_itself_and_background_helpers() {
    let system = system(&[1], 1);
    app_with_windows(&system, SELF_PID, 10, &["our own panel"]);
    let mut helper = SimApp::new(40, "com.example.helper");
    helper.activation_policy = crate::sys::app::ActivationPolicy::Prohibited;
    helper.is_background_helper = true;
    system.add_app(helper);
    app_with_windows(&system, 50, 500, &["doc"]);
    let reactor = start(&system, fast_config());

    assert_eq!(window_ids(&reactor), vec![500]);
    assert_eq!(reactor.applications().len(), 1);
}

#[test]
fn windows_are_ordered_front_to_back_after_discovery() {
    let system = system(&[1], 1);
    system.add_app(SimApp::new(10, "com.example.a"));
    system.add_app(SimApp::new(20, "com.example.b"));
    // Stacking order interleaves the two apps.
    system.add_window(SimWindow::new(201, 20, "b1"));
    system.add_window(SimWindow::new(101, 10, "a1"));
    system.add_window(SimWindow::new(202, 20, "b2"));
    let reactor = start(&system, fast_config());

    assert_eq!(window_ids(&reactor), vec![201, 101, 202]);
}

#[test]
fn summon_with_no_windows_hides_without_building() {
    let system = system(&[1], 1);
    let mut reactor = start(&system, fast_config());

    command(&mut reactor, Command::ShowUi);
    assert_eq!(reactor.take_presented(), vec![presenter::Event::Hide]);
    assert_eq!(reactor.summon_state(), SummonState::Idle);
    assert_eq!(reactor.reactor().summon_manager.ui_builds_scheduled, 0);
}

#[test]
fn summon_selects_second_window_and_cycles() {
    let system = system(&[1], 1);
    app_with_windows(&system, 10, 100, &["one"]);
    app_with_windows(&system, 20, 200, &["two"]);
    app_with_windows(&system, 30, 300, &["three"]);
    let mut reactor = start(&system, fast_config());

    command(&mut reactor, Command::ShowUi);
    assert_eq!(reactor.summon_state(), SummonState::Cycling);
    let presented = reactor.take_presented();
    assert_eq!(presented.len(), 1);
    let presenter::Event::Show(snapshot) = &presented[0] else {
        panic!("expected the panel to be shown, got {presented:?}");
    };
    assert_eq!(snapshot.windows.len(), 3);
    assert_eq!(snapshot.focused, Some(1));
    assert_eq!(snapshot.windows[0].app_name.as_deref(), Some("app10"));

    // Pressing the shortcut again while cycling advances the selection.
    command(&mut reactor, Command::ShowUi);
    assert_eq!(reactor.snapshot().focused, Some(2));
    command(&mut reactor, Command::CycleSelection(Direction::Leading));
    assert_eq!(reactor.snapshot().focused, Some(0));
    command(&mut reactor, Command::CycleSelection(Direction::Trailing));
    assert_eq!(reactor.snapshot().focused, Some(2));
    command(&mut reactor, Command::SelectWindow(1));
    assert_eq!(reactor.snapshot().focused, Some(1));
    assert!(reactor.take_presented().iter().all(|e| matches!(e, presenter::Event::Refresh(_))));

    command(&mut reactor, Command::HideUi);
    assert_eq!(reactor.take_presented(), vec![presenter::Event::Hide]);
    assert_eq!(reactor.summon_state(), SummonState::Idle);

    // Cycling only applies while the switcher is open.
    command(&mut reactor, Command::CycleSelection(Direction::Leading));
    assert_eq!(reactor.snapshot().focused, Some(1));
    assert!(reactor.take_presented().is_empty());
}

#[test]
fn summon_during_mission_control_hides() {
    let system = system(&[1], 1);
    app_with_windows(&system, 10, 100, &["one"]);
    let mut reactor = start(&system, fast_config());

    system.set_mission_control(true);
    assert!(reactor.settle(SETTLE));
    command(&mut reactor, Command::ShowUi);
    assert_eq!(reactor.take_presented(), vec![presenter::Event::Hide]);
    assert_eq!(reactor.summon_state(), SummonState::Idle);

    system.set_mission_control(false);
    assert!(reactor.settle(SETTLE));
    command(&mut reactor, Command::ShowUi);
    assert_eq!(reactor.summon_state(), SummonState::Cycling);
}

#[test]
fn entering_mission_control_closes_the_switcher() {
    let system = system(&[1], 1);
    app_with_windows(&system, 10, 100, &["one", "two"]);
    let mut reactor = start(&system, fast_config());

    command(&mut reactor, Command::ShowUi);
    reactor.take_presented();
    system.set_mission_control(true);
    assert!(reactor.settle(SETTLE));
    assert_eq!(reactor.take_presented(), vec![presenter::Event::Hide]);
    assert_eq!(reactor.summon_state(), SummonState::Idle);
}

#[test]
fn focusing_during_mission_control_does_nothing() {
    let system = system(&[1], 1);
    app_with_windows(&system, 10, 100, &["one"]);
    app_with_windows(&system, 20, 200, &["two"]);
    let mut reactor = start(&system, fast_config());

    command(&mut reactor, Command::ShowUi);
    system.set_mission_control(true);
    command(&mut reactor, Command::FocusSelectedWindow);

    assert_eq!(system.window_ids(), vec![100, 200]);
    assert_eq!(window_ids(&reactor), vec![100, 200]);
    assert_eq!(reactor.summon_state(), SummonState::Idle);
}

#[test]
fn focusing_selection_moves_it_to_the_front() {
    let system = system(&[1], 1);
    app_with_windows(&system, 10, 100, &["one"]);
    app_with_windows(&system, 20, 200, &["two"]);
    let mut reactor = start(&system, fast_config());

    command(&mut reactor, Command::ShowUi);
    reactor.take_presented();
    command(&mut reactor, Command::FocusSelectedWindow);

    assert_eq!(reactor.take_presented(), vec![presenter::Event::Hide]);
    assert_eq!(system.window_ids(), vec![200, 100]);
    assert_eq!(window_ids(&reactor), vec![200, 100]);
}

#[test]
fn user_focus_reorders_most_recent_first() {
    let system = system(&[1], 1);
    app_with_windows(&system, 10, 100, &["one", "two"]);
    app_with_windows(&system, 20, 200, &["three"]);
    let mut reactor = start(&system, fast_config());

    system.focus_window(200);
    assert!(reactor.settle(SETTLE));
    assert_eq!(window_ids(&reactor), vec![200, 100, 101]);

    system.focus_window(101);
    assert!(reactor.settle(SETTLE));
    assert_eq!(window_ids(&reactor), vec![101, 200, 100]);
}

#[test]
fn focus_order_is_kept_when_mru_is_off() {
    let system = system(&[1], 1);
    app_with_windows(&system, 10, 100, &["one"]);
    app_with_windows(&system, 20, 200, &["two"]);
    let mut config = fast_config();
    config.settings.ordering.most_recent_first = false;
    let mut reactor = start(&system, config);

    system.focus_window(200);
    assert!(reactor.settle(SETTLE));
    assert_eq!(window_ids(&reactor), vec![100, 200]);
}

#[test]
fn windows_on_other_spaces_are_pulled_in_for_discovery() {
    let system = system(&[1, 2], 1);
    app_with_windows(&system, 10, 100, &["here"]);
    system.add_app(SimApp::new(20, "com.example.elsewhere"));
    system.add_window(SimWindow::new(200, 20, "there").on_spaces(&[space(2)]));
    let mut reactor = start(&system, fast_config());

    assert_eq!(
        system.space_moves(),
        vec![
            SpaceMove { windows: vec![wid(200)], spaces: vec![space(1)], added: true },
            SpaceMove { windows: vec![wid(200)], spaces: vec![space(1)], added: false },
        ]
    );
    assert_eq!(system.window_spaces_of(200), vec![space(2)]);
    assert_eq!(window_ids(&reactor), vec![100, 200]);

    // Only windows on the current space are offered by default.
    command(&mut reactor, Command::ShowUi);
    assert_eq!(shown_ids(&reactor), vec![100]);

    system.switch_space(space(2));
    assert!(reactor.settle(SETTLE));
    assert_eq!(shown_ids(&reactor), vec![200]);
}

#[test]
fn refused_space_moves_are_not_undone() {
    let system = system(&[1, 2], 1);
    app_with_windows(&system, 10, 100, &["here"]);
    system.add_window(SimWindow::new(101, 10, "there").on_spaces(&[space(2)]));
    system.fail_space_moves(true);
    let reactor = start(&system, fast_config());

    assert!(system.space_moves().is_empty());
    // Accessibility can't see the other space, so that window stays unknown.
    assert_eq!(window_ids(&reactor), vec![100]);
}

#[test]
fn created_and_destroyed_windows_update_the_open_switcher() {
    let system = system(&[1], 1);
    app_with_windows(&system, 10, 100, &["one"]);
    app_with_windows(&system, 20, 200, &["two"]);
    let mut reactor = start(&system, fast_config());

    command(&mut reactor, Command::ShowUi);
    reactor.take_presented();
    assert_eq!(reactor.snapshot().focused_window().map(|w| w.id), Some(wid(200)));

    system.create_window(SimWindow::new(102, 10, "new"));
    assert!(reactor.settle(SETTLE));
    assert_eq!(window_ids(&reactor), vec![102, 100, 200]);
    // The selection stays on the same window.
    assert_eq!(reactor.snapshot().focused_window().map(|w| w.id), Some(wid(200)));

    system.destroy_window(200);
    assert!(reactor.settle(SETTLE));
    assert_eq!(window_ids(&reactor), vec![102, 100]);
    assert_eq!(reactor.snapshot().focused_window().map(|w| w.id), Some(wid(100)));
    let presented = reactor.take_presented();
    assert!(matches!(presented.last(), Some(presenter::Event::Refresh(_))));

    system.destroy_window(102);
    system.destroy_window(100);
    assert!(reactor.settle(SETTLE));
    assert!(window_ids(&reactor).is_empty());
    assert_eq!(reactor.take_presented().last(), Some(&presenter::Event::Hide));
    assert_eq!(reactor.summon_state(), SummonState::Idle);
}

#[test]
fn title_and_minimize_changes_are_tracked() {
    let system = system(&[1], 1);
    app_with_windows(&system, 10, 100, &["draft"]);
    let mut reactor = start(&system, fast_config());

    system.set_title(100, Some("final".into()));
    system.set_minimized(100, true);
    assert!(reactor.settle(SETTLE));
    let window = &reactor.windows()[0];
    assert_eq!(window.title.as_deref(), Some("final"));
    assert!(window.flags.contains(WindowFlags::MINIMIZED));
}

#[test]
fn selected_window_actions_reach_the_platform() {
    let system = system(&[1], 1);
    app_with_windows(&system, 10, 100, &["one"]);
    app_with_windows(&system, 20, 200, &["two", "three"]);
    let mut reactor = start(&system, fast_config());
    command(&mut reactor, Command::ShowUi);
    assert_eq!(reactor.snapshot().focused_window().map(|w| w.id), Some(wid(200)));

    command(&mut reactor, Command::MinimizeOrRestoreSelectedWindow);
    let selected = reactor.snapshot().focused_window().cloned();
    assert!(selected.is_some_and(|w| w.flags.contains(WindowFlags::MINIMIZED)));

    command(&mut reactor, Command::CloseSelectedWindow);
    assert_eq!(system.window_ids(), vec![100, 201]);
    assert_eq!(window_ids(&reactor), vec![100, 201]);

    command(&mut reactor, Command::SelectWindow(1));
    command(&mut reactor, Command::QuitSelectedApp);
    assert_eq!(window_ids(&reactor), vec![100]);
    assert_eq!(reactor.applications().len(), 1);
}

#[test]
fn hiding_the_selected_app_respects_the_hidden_filter() {
    let system = system(&[1], 1);
    app_with_windows(&system, 10, 100, &["one"]);
    app_with_windows(&system, 20, 200, &["two"]);
    let mut config = fast_config();
    config.settings.filters.show_hidden_windows = false;
    let mut reactor = start(&system, config);

    command(&mut reactor, Command::ShowUi);
    command(&mut reactor, Command::HideOrShowSelectedApp);
    assert_eq!(shown_ids(&reactor), vec![100]);
    assert!(reactor.applications().iter().any(|a| a.pid == 20 && a.is_hidden));
}

#[test]
fn apps_launched_later_are_discovered_once_ready() {
    let system = system(&[1], 1);
    app_with_windows(&system, 10, 100, &["one"]);
    let mut reactor = start(&system, fast_config());

    system.add_window(SimWindow::new(400, 40, "late"));
    let mut late = SimApp::new(40, "com.example.late");
    late.is_finished_launching = false;
    system.launch(late);
    assert!(reactor.settle(SETTLE));
    assert_eq!(window_ids(&reactor), vec![100]);
    assert_eq!(reactor.applications().len(), 2);

    system.finish_launching(40);
    assert!(reactor.settle(SETTLE));
    assert_eq!(window_ids(&reactor), vec![100, 400]);
    assert_eq!(system.observed_pids(), vec![10, 40]);
}

#[test]
fn launch_is_rechecked_when_the_notification_never_arrives() {
    let system = system(&[1], 1);
    app_with_windows(&system, 10, 100, &["one"]);
    let mut reactor = start(&system, fast_config());

    system.add_window(SimWindow::new(400, 40, "late"));
    let mut late = SimApp::new(40, "com.example.late");
    late.is_finished_launching = false;
    system.launch(late);
    assert!(reactor.settle(SETTLE));
    assert_eq!(window_ids(&reactor), vec![100]);

    system.finish_launching_silently(40);
    command(&mut reactor, Command::ShowUi);
    command(&mut reactor, Command::HideUi);
    command(&mut reactor, Command::ShowUi);
    assert_eq!(window_ids(&reactor), vec![100, 400]);
    assert_eq!(system.observed_pids(), vec![10, 40]);
}

#[test]
fn apps_that_refuse_observation_still_list_windows() {
    let system = system(&[1], 1);
    let mut stubborn = SimApp::new(10, "com.example.stubborn");
    stubborn.refuses_observation = true;
    system.add_app(stubborn);
    system.add_window(SimWindow::new(100, 10, "one"));
    let reactor = start(&system, fast_config());

    assert_eq!(window_ids(&reactor), vec![100]);
    assert!(system.observed_pids().is_empty());
    let app = reactor.reactor().app_manager.get(10).map(|a| a.subscription);
    assert_eq!(app, Some(crate::actor::app::Subscription::None));
}

#[test]
fn transient_accessibility_failures_are_retried() {
    let system = system(&[1], 1);
    app_with_windows(&system, 10, 100, &["one", "two"]);
    system.fail_ax_calls(5);
    let reactor = start(&system, fast_config());

    assert_eq!(window_ids(&reactor), vec![100, 101]);
    let titles: Vec<_> = reactor.windows().into_iter().filter_map(|w| w.title).collect();
    assert_eq!(titles, vec!["one".to_string(), "two".to_string()]);
}

#[test]
fn dock_labels_are_read_when_the_panel_is_built() {
    let system = system(&[1], 1);
    system.add_app(SimApp::new(5, crate::sys::app::DOCK_BUNDLE_ID));
    app_with_windows(&system, 10, 100, &["inbox"]);
    app_with_windows(&system, 20, 200, &["editor"]);
    system.set_dock_label(10, Some("3".into()));
    let mut reactor = start(&system, fast_config());

    command(&mut reactor, Command::ShowUi);
    let presented = reactor.take_presented();
    let Some(presenter::Event::Show(snapshot)) = presented.first() else {
        panic!("expected the panel to be shown, got {presented:?}");
    };
    let labels: Vec<_> = snapshot.windows.iter().map(|w| w.dock_label.clone()).collect();
    assert_eq!(labels, vec![Some("3".to_string()), None]);
    assert!(snapshot.windows.iter().all(|w| w.has_thumbnail));
}

#[test]
fn excluded_bundles_are_never_shown() {
    let system = system(&[1], 1);
    app_with_windows(&system, 10, 100, &["one"]);
    app_with_windows(&system, 20, 200, &["two"]);
    let mut config = fast_config();
    config.settings.filters.excluded_bundle_ids = vec!["com.example.app20".to_string()];
    let mut reactor = start(&system, config);

    command(&mut reactor, Command::ShowUi);
    assert_eq!(shown_ids(&reactor), vec![100]);
    assert_eq!(reactor.snapshot().focused, Some(0));
}

#[test]
fn config_updates_apply_to_the_open_switcher() {
    let system = system(&[1], 1);
    app_with_windows(&system, 10, 100, &["one"]);
    app_with_windows(&system, 20, 200, &["two"]);
    let mut reactor = start(&system, fast_config());
    command(&mut reactor, Command::ShowUi);
    assert_eq!(shown_ids(&reactor), vec![100, 200]);

    let mut config = fast_config();
    config.settings.filters.excluded_bundle_ids = vec!["com.example.app10".to_string()];
    reactor.send(Event::ConfigUpdated(config));
    assert!(reactor.settle(SETTLE));
    assert_eq!(shown_ids(&reactor), vec![200]);
}

#[test]
fn stale_rebuild_after_hide_is_ignored() {
    let system = system(&[1], 1);
    app_with_windows(&system, 10, 100, &["one"]);
    let mut config = fast_config();
    config.settings.window_display_delay = std::time::Duration::from_millis(30);
    let mut reactor = start(&system, config);

    reactor.send(Event::Command(Command::ShowUi));
    reactor.send(Event::Command(Command::HideUi));
    assert!(reactor.settle(SETTLE));
    assert_eq!(reactor.take_presented(), vec![presenter::Event::Hide]);
    let summon = &reactor.reactor().summon_manager;
    assert_eq!(summon.ui_builds_scheduled, summon.ui_builds_handled);
    assert!(!summon.panel_shown);
}

#[test]
fn spawned_reactor_answers_queries_and_presents() {
    let system = system(&[1], 1);
    app_with_windows(&system, 10, 100, &["one"]);
    app_with_windows(&system, 20, 200, &["two"]);
    let (presenter_tx, mut presenter_rx) = crate::actor::channel();
    let handle = Reactor::spawn(fast_config(), Arc::new(system.clone()), presenter_tx).unwrap();

    let ids = || handle.query_windows().iter().map(|w| w.id.as_u32()).collect::<Vec<_>>();
    let deadline = Instant::now() + SETTLE;
    while ids() != [100, 200] {
        assert!(Instant::now() < deadline, "windows were never discovered");
        thread::sleep(Duration::from_millis(5));
    }

    handle.command(Command::ShowUi);
    let shown = loop {
        match presenter_rx.try_recv() {
            Ok((_, presenter::Event::Show(snapshot))) => break snapshot,
            Ok(_) => {}
            Err(_) if Instant::now() < deadline => thread::sleep(Duration::from_millis(5)),
            Err(e) => panic!("panel was never shown: {e:?}"),
        }
    };

    assert_eq!(shown.focused_window().map(|w| w.id.as_u32()), Some(200));
    assert_eq!(ids(), vec![100, 200]);
    assert_eq!(handle.query_summon_state(), Some(SummonState::Cycling));
    assert_eq!(handle.query_snapshot(), shown);
    assert_eq!(handle.query_applications().len(), 2);
}
