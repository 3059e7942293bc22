use std::time::{Duration, Instant};

use crossbeam_channel as cbc;
use serde::Serialize;
use tracing::{debug, trace, warn};

use super::Sender;
use crate::actor::app::{Application, DiscoveryContext};
use crate::actor::presenter;
use crate::common::collections::HashMap;
use crate::common::config::{AppsToShow, ScreensToShow, SpacesToShow, WindowFilters};
use crate::model::server::{ApplicationData, SwitcherSnapshot, WindowData};
use crate::model::{SpaceAssignment, Window, WindowFlags};
use crate::sys::Platform;
use crate::sys::app::{DOCK_BUNDLE_ID, ProcessInfo, ProcessSource, pid_t};
use crate::sys::ax::{AxAttribute, AxError, AxHandle, AxPolicy, AxResult, absent, role};
use crate::sys::screen::{ScreenId, SpaceId};
use crate::sys::window_server::{WindowImage, WindowServer, WindowServerId};

/// Manages the set of running applications we track windows for
pub struct AppManager {
    pub apps: HashMap<pid_t, Application>,
    /// Registration order. Listing and discovery follow it.
    order: Vec<pid_t>,
    self_pid: pid_t,
}

impl AppManager {
    pub fn new(self_pid: pid_t) -> Self {
        AppManager {
            apps: HashMap::default(),
            order: Vec::new(),
            self_pid,
        }
    }

    pub fn get(&self, pid: pid_t) -> Option<&Application> { self.apps.get(&pid) }

    pub fn get_mut(&mut self, pid: pid_t) -> Option<&mut Application> { self.apps.get_mut(&pid) }

    pub fn len(&self) -> usize { self.order.len() }

    pub fn is_empty(&self) -> bool { self.order.is_empty() }

    pub fn pids(&self) -> &[pid_t] { &self.order }

    pub fn iter(&self) -> impl Iterator<Item = &Application> + '_ {
        self.order.iter().filter_map(|pid| self.apps.get(pid))
    }

    /// Registers the process if it is eligible and not known yet.
    pub fn add(&mut self, info: ProcessInfo, icon: Option<WindowImage>) -> bool {
        if !info.is_eligible(self.self_pid) {
            trace!(pid = info.pid, "ignoring ineligible process");
            return false;
        }
        if self.apps.contains_key(&info.pid) {
            return false;
        }
        debug!(pid = info.pid, bundle_id = ?info.bundle_id, "tracking application");
        self.order.push(info.pid);
        self.apps.insert(info.pid, Application::new(info, icon));
        true
    }

    /// Registers every eligible running process, in the order the OS lists
    /// them. Returns how many were new.
    pub fn add_running_applications(
        &mut self,
        processes: &(impl ProcessSource + ?Sized),
    ) -> usize {
        let mut added = 0;
        for info in processes.running_applications() {
            if !info.is_eligible(self.self_pid) || self.apps.contains_key(&info.pid) {
                continue;
            }
            let icon = processes.application_icon(info.pid);
            if self.add(info, icon) {
                added += 1;
            }
        }
        added
    }

    pub fn remove(&mut self, pids: &[pid_t]) -> Vec<Application> {
        self.order.retain(|pid| !pids.contains(pid));
        pids.iter().filter_map(|pid| self.apps.remove(pid)).collect()
    }

    /// Starts a discovery pass for every tracked app. Returns how many started.
    pub fn observe_all(&mut self, cx: &DiscoveryContext) -> usize {
        let mut started = 0;
        for pid in &self.order {
            if let Some(app) = self.apps.get_mut(pid)
                && app.observe_windows(cx, None)
            {
                started += 1;
            }
        }
        started
    }

    /// Retries discovery for apps that have no subscription yet, typically
    /// because they had not finished launching when we first saw them.
    pub fn observe_unsubscribed(&mut self, cx: &DiscoveryContext) {
        for pid in &self.order {
            if let Some(app) = self.apps.get_mut(pid)
                && app.subscription == crate::actor::app::Subscription::None
            {
                app.observe_windows(cx, None);
            }
        }
    }

    /// Like [`observe_all`](Self::observe_all), but waits until every pass has
    /// delivered its report or `timeout` elapses. Returns how many finished in
    /// time. Late reports still arrive through the event channel.
    pub fn observe_all_blocking(&mut self, cx: &DiscoveryContext, timeout: Duration) -> usize {
        let (tx, rx) = cbc::unbounded();
        let mut expected = 0;
        for pid in &self.order {
            if let Some(app) = self.apps.get_mut(pid)
                && app.observe_windows(cx, Some(tx.clone()))
            {
                expected += 1;
            }
        }
        drop(tx);

        let deadline = Instant::now() + timeout;
        let mut finished = 0;
        while finished < expected {
            match rx.recv_deadline(deadline) {
                Ok(pid) => {
                    trace!(pid, "discovery finished");
                    finished += 1;
                }
                Err(_) => {
                    debug!(finished, expected, "timed out waiting for discovery");
                    break;
                }
            }
        }
        finished
    }

    pub fn has_pending_discoveries(&self) -> bool {
        self.apps.values().any(|app| app.pending_discoveries > 0)
    }

    /// Reads dock badge labels ("3" unread mails, etc) from the dock's
    /// accessibility tree. Leaves labels untouched if the dock can't be read.
    pub fn refresh_badges(&mut self, platform: &dyn Platform, policy: AxPolicy) {
        let Some(dock_pid) =
            self.iter().find(|app| app.bundle_id() == Some(DOCK_BUNDLE_ID)).map(|app| app.pid())
        else {
            trace!("dock is not running");
            return;
        };
        let items = match dock_items(platform, dock_pid, policy) {
            Ok(items) => items,
            Err(e) => {
                debug!(%e, "could not read dock items");
                return;
            }
        };
        for app in self.apps.values_mut() {
            if !app.is_regular() {
                continue;
            }
            let Some(url) = app.bundle_id().and_then(|id| platform.application_url(id)) else {
                continue;
            };
            app.dock_label = items
                .iter()
                .find(|item| item.url.as_deref() == Some(url.as_str()))
                .and_then(|item| item.label.clone());
        }
    }

    pub fn application_data(&self, windows: &WindowManager) -> Vec<ApplicationData> {
        self.iter()
            .map(|app| ApplicationData {
                pid: app.pid(),
                bundle_id: app.info.bundle_id.clone(),
                name: app.info.localized_name.clone(),
                activation_policy: app.info.activation_policy,
                is_hidden: app.info.is_hidden,
                is_finished_launching: app.info.is_finished_launching,
                dock_label: app.dock_label.clone(),
                window_count: windows.iter().filter(|w| w.pid == app.pid()).count(),
            })
            .collect()
    }
}

struct DockItem {
    url: Option<String>,
    label: Option<String>,
}

fn dock_items(
    platform: &dyn Platform,
    dock_pid: pid_t,
    policy: AxPolicy,
) -> AxResult<Vec<DockItem>> {
    let dock = AxHandle::new(platform.application_element(dock_pid)?, policy);
    let list = dock
        .children()?
        .into_iter()
        .find(|child| child.role().is_ok_and(|r| r == role::LIST))
        .ok_or(AxError::AttributeUnsupported(role::LIST))?;
    Ok(list
        .children()?
        .into_iter()
        .filter(|item| {
            item.subrole().is_ok_and(|s| s == role::APPLICATION_DOCK_ITEM)
                && item.bool(AxAttribute::IsApplicationRunning).unwrap_or(false)
        })
        .map(|item| DockItem {
            url: absent(item.string(AxAttribute::Url)),
            label: absent(item.string(AxAttribute::StatusLabel)),
        })
        .collect())
}

/// Inputs of the visibility predicate that don't belong to the window.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityContext<'a> {
    pub filters: &'a WindowFilters,
    pub active_space: Option<SpaceId>,
    pub screen: Option<ScreenId>,
    pub frontmost: Option<pid_t>,
}

/// Whether `window` belongs in the switcher. Windows of unknown apps never do.
pub fn should_show_to_user(
    window: &Window,
    app: Option<&Application>,
    cx: &VisibilityContext,
) -> bool {
    let Some(app) = app else {
        return false;
    };
    let filters = cx.filters;

    if app.bundle_id().is_some_and(|id| filters.excluded_bundle_ids.iter().any(|ex| ex == id)) {
        return false;
    }
    if app.info.is_hidden && !filters.show_hidden_windows {
        return false;
    }
    if filters.apps_to_show == AppsToShow::Active && cx.frontmost != Some(app.pid()) {
        return false;
    }

    if !window.is_actual_window() {
        return false;
    }
    if !filters.show_titleless_windows && !window.has_title() {
        return false;
    }
    if window.is_minimized() && !filters.show_minimized_windows {
        return false;
    }
    if window.is_fullscreen() && !filters.show_fullscreen_windows {
        return false;
    }

    if filters.screens_to_show == ScreensToShow::ShowingSwitcher
        && let (Some(wanted), Some(actual)) = (cx.screen, window.screen)
        && wanted != actual
    {
        return false;
    }
    if filters.spaces_to_show == SpacesToShow::Visible
        && let Some(active) = cx.active_space
        && !window.space.contains(active)
    {
        return false;
    }
    true
}

/// Manages the ordered window list and the focus cursor into it
///
/// The cursor is either `None` or points at a window whose cached
/// `should_show` is true. Every mutating method preserves that.
#[derive(Default)]
pub struct WindowManager {
    windows: Vec<Window>,
    focused_index: Option<usize>,
}

impl WindowManager {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.windows.len() }

    pub fn is_empty(&self) -> bool { self.windows.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &Window> + '_ { self.windows.iter() }

    pub fn ids(&self) -> Vec<WindowServerId> { self.windows.iter().map(|w| w.id).collect() }

    pub fn focused_index(&self) -> Option<usize> { self.focused_index }

    pub fn focused_window(&self) -> Option<&Window> {
        self.focused_index.and_then(|i| self.windows.get(i))
    }

    pub fn index_of(&self, wid: WindowServerId) -> Option<usize> {
        self.windows.iter().position(|w| w.id == wid)
    }

    pub fn get(&self, wid: WindowServerId) -> Option<&Window> {
        self.windows.iter().find(|w| w.id == wid)
    }

    pub fn get_mut(&mut self, wid: WindowServerId) -> Option<&mut Window> {
        self.windows.iter_mut().find(|w| w.id == wid)
    }

    pub fn contains(&self, wid: WindowServerId) -> bool { self.index_of(wid).is_some() }

    fn is_shown(&self, index: usize) -> bool {
        self.windows.get(index).is_some_and(|w| w.should_show)
    }

    pub fn any_shown(&self) -> bool { self.windows.iter().any(|w| w.should_show) }

    /// Appends a window at the end. Ids already present are ignored.
    pub fn push(&mut self, window: Window) -> bool {
        if self.contains(window.id) {
            trace!(wid = ?window.id, "window already tracked");
            return false;
        }
        self.windows.push(window);
        true
    }

    /// Inserts a window at the front, where newly created windows belong.
    pub fn push_front(&mut self, window: Window) -> bool {
        if self.contains(window.id) {
            trace!(wid = ?window.id, "window already tracked");
            return false;
        }
        self.keeping_focus(|windows| windows.insert(0, window));
        true
    }

    /// Re-evaluates the visibility predicate for every window.
    pub fn refresh_which_windows_show_to_user(
        &mut self,
        apps: &AppManager,
        cx: &VisibilityContext,
    ) {
        for window in &mut self.windows {
            let app = apps.get(window.pid);
            window.flags.set(WindowFlags::HIDDEN, app.is_some_and(|a| a.info.is_hidden));
            window.should_show = should_show_to_user(window, app, cx);
        }
        self.repair_focus();
    }

    /// Re-evaluates a single window. Returns its new cached value.
    pub fn refresh_window_shows_to_user(
        &mut self,
        wid: WindowServerId,
        apps: &AppManager,
        cx: &VisibilityContext,
    ) -> bool {
        let Some(window) = self.get_mut(wid) else {
            return false;
        };
        let app = apps.get(window.pid);
        window.flags.set(WindowFlags::HIDDEN, app.is_some_and(|a| a.info.is_hidden));
        window.should_show = should_show_to_user(window, app, cx);
        let shown = window.should_show;
        self.repair_focus();
        shown
    }

    fn repair_focus(&mut self) {
        if let Some(i) = self.focused_index
            && !self.is_shown(i)
        {
            self.focused_index = self.closest_shown_index(i);
        }
    }

    /// Index the cursor would land on after moving `step` windows, wrapping
    /// around and skipping windows that are not shown.
    pub fn index_after_cycling(&self, step: isize) -> Option<usize> {
        let len = self.windows.len() as isize;
        if len == 0 || !self.any_shown() {
            return None;
        }
        let start = match self.focused_index {
            Some(i) => i as isize,
            None if step > 0 => -1,
            None => len,
        };
        let direction = if step < 0 { -1 } else { 1 };
        let mut index = (start + step).rem_euclid(len);
        for _ in 0..len {
            if self.is_shown(index as usize) {
                return Some(index as usize);
            }
            index = (index + direction).rem_euclid(len);
        }
        None
    }

    pub fn cycle_focused_index(&mut self, step: isize) {
        if let Some(next) = self.index_after_cycling(step) {
            self.focused_index = Some(next);
        }
    }

    /// Puts the cursor on the first shown window at or after `to`, wrapping.
    pub fn update_focused_index(&mut self, to: usize) {
        if self.windows.is_empty() {
            self.focused_index = None;
            return;
        }
        let len = self.windows.len();
        let to = to.min(len - 1);
        self.focused_index = (0..len).map(|d| (to + d) % len).find(|&i| self.is_shown(i));
    }

    /// Moves the cursor to the `position`th shown window.
    pub fn select_shown(&mut self, position: usize) -> bool {
        let index = self
            .windows
            .iter()
            .enumerate()
            .filter(|(_, w)| w.should_show)
            .nth(position)
            .map(|(i, _)| i);
        match index {
            Some(i) => {
                self.focused_index = Some(i);
                true
            }
            None => false,
        }
    }

    /// Shown window nearest to `from`, without wrapping. Ties go to the
    /// previous window.
    pub fn closest_shown_index(&self, from: usize) -> Option<usize> {
        if self.is_shown(from) {
            return Some(from);
        }
        (1..=self.windows.len()).find_map(|d| {
            from.checked_sub(d)
                .filter(|&i| self.is_shown(i))
                .or_else(|| Some(from + d).filter(|&i| self.is_shown(i)))
        })
    }

    /// Like [`closest_shown_index`](Self::closest_shown_index) for the gap
    /// just before `gap` left by a removed window.
    fn closest_shown_to_gap(&self, gap: usize) -> Option<usize> {
        (0..self.windows.len()).find_map(|d| {
            gap.checked_sub(d + 1)
                .filter(|&i| self.is_shown(i))
                .or_else(|| Some(gap + d).filter(|&i| self.is_shown(i)))
        })
    }

    /// Removes every window matching `pred`. A surviving focused window keeps
    /// the cursor; if it was removed the cursor falls to the closest shown
    /// window.
    pub fn remove_windows(&mut self, mut pred: impl FnMut(&Window) -> bool) -> Vec<Window> {
        let focused = self.focused_index;
        let mut removed = Vec::new();
        let mut removed_before_focus = 0;
        let mut focus_removed = false;
        let mut kept = Vec::with_capacity(self.windows.len());
        for (i, window) in std::mem::take(&mut self.windows).into_iter().enumerate() {
            if pred(&window) {
                match focused {
                    Some(f) if i < f => removed_before_focus += 1,
                    Some(f) if i == f => focus_removed = true,
                    _ => {}
                }
                removed.push(window);
            } else {
                kept.push(window);
            }
        }
        self.windows = kept;

        if let Some(f) = focused {
            let anchor = f - removed_before_focus;
            self.focused_index = if focus_removed {
                self.closest_shown_to_gap(anchor)
            } else {
                self.closest_shown_index(anchor)
            };
        }
        removed
    }

    /// Runs `f` and puts the cursor back on whichever window it was on.
    fn keeping_focus(&mut self, f: impl FnOnce(&mut Vec<Window>)) {
        let focused = self.focused_window().map(|w| w.id);
        f(&mut self.windows);
        if let Some(wid) = focused {
            self.focused_index = self.index_of(wid);
        }
    }

    /// Stable sort by stacking order, front to back. Windows missing from
    /// `order` keep their relative order at the end.
    pub fn sort_by_level(&mut self, order: &[WindowServerId]) {
        let rank: HashMap<WindowServerId, usize> =
            order.iter().enumerate().map(|(i, wid)| (*wid, i)).collect();
        self.keeping_focus(|windows| {
            windows.sort_by_key(|w| rank.get(&w.id).copied().unwrap_or(usize::MAX));
        });
    }

    pub fn move_to_front(&mut self, wid: WindowServerId) -> bool {
        let Some(index) = self.index_of(wid) else {
            return false;
        };
        if index == 0 {
            return false;
        }
        self.keeping_focus(|windows| {
            let window = windows.remove(index);
            windows.insert(0, window);
        });
        true
    }

    /// Refreshes space assignment and screen for every window.
    pub fn update_spaces(&mut self, spaces: &mut SpaceManager, ws: &(impl WindowServer + ?Sized)) {
        for window in &mut self.windows {
            window.set_space(spaces.assignment_for(window.id, ws));
            window.screen = ws.window_screen(window.id);
        }
    }

    pub fn update_window_space(
        &mut self,
        wid: WindowServerId,
        spaces: &mut SpaceManager,
        ws: &(impl WindowServer + ?Sized),
    ) {
        if let Some(window) = self.get_mut(wid) {
            window.set_space(spaces.assignment_for(wid, ws));
            window.screen = ws.window_screen(wid);
        }
    }

    /// Captures a fresh thumbnail for every shown window. A failed capture
    /// keeps the previous image.
    pub fn refresh_all_thumbnails(&mut self, ws: &(impl WindowServer + ?Sized)) {
        for window in self.windows.iter_mut().filter(|w| w.should_show) {
            if let Some(image) = ws.capture_window(window.id) {
                window.thumbnail = Some(image);
            } else {
                trace!(wid = ?window.id, "thumbnail capture failed");
            }
        }
    }

    pub fn refresh_thumbnail(&mut self, wid: WindowServerId, ws: &(impl WindowServer + ?Sized)) {
        if let Some(window) = self.get_mut(wid)
            && let Some(image) = ws.capture_window(wid)
        {
            window.thumbnail = Some(image);
        }
    }

    pub fn sync_dock_labels(&mut self, apps: &AppManager) {
        for window in &mut self.windows {
            window.dock_label = apps.get(window.pid).and_then(|a| a.dock_label.clone());
        }
    }

    pub fn snapshot(&self, apps: &AppManager) -> SwitcherSnapshot {
        let mut focused = None;
        let mut windows = Vec::new();
        for (i, window) in self.windows.iter().enumerate().filter(|(_, w)| w.should_show) {
            if self.focused_index == Some(i) {
                focused = Some(windows.len());
            }
            let app = apps.get(window.pid);
            windows.push(WindowData::new(
                window,
                app.and_then(|a| a.info.localized_name.clone()),
                app.and_then(|a| a.info.bundle_id.clone()),
            ));
        }
        SwitcherSnapshot { windows, focused }
    }
}

/// Manages space ids and window to space assignments
#[derive(Default)]
pub struct SpaceManager {
    /// Every user space in display order. Index + 1 is the number users see.
    pub ids: Vec<SpaceId>,
    pub current: Option<SpaceId>,
    assignments: HashMap<WindowServerId, SpaceAssignment>,
}

impl SpaceManager {
    pub fn initial_discovery(&mut self, ws: &(impl WindowServer + ?Sized)) {
        self.refresh_ids_and_indexes(ws);
        self.refresh_current_space_id(ws);
        debug!(spaces = ?self.ids, current = ?self.current, "discovered spaces");
    }

    pub fn refresh_ids_and_indexes(&mut self, ws: &(impl WindowServer + ?Sized)) {
        self.ids = ws.all_spaces();
    }

    pub fn refresh_current_space_id(&mut self, ws: &(impl WindowServer + ?Sized)) {
        self.current = ws.active_space();
    }

    /// 1-based position of `space`, if known.
    pub fn index_of(&self, space: SpaceId) -> Option<usize> {
        self.ids.iter().position(|s| *s == space).map(|i| i + 1)
    }

    pub fn other_spaces(&self) -> Vec<SpaceId> {
        self.ids.iter().copied().filter(|s| Some(*s) != self.current).collect()
    }

    pub fn windows_in_spaces(
        &self,
        ws: &(impl WindowServer + ?Sized),
        spaces: &[SpaceId],
    ) -> Vec<WindowServerId> {
        if spaces.is_empty() {
            return Vec::new();
        }
        ws.windows_in_spaces(spaces)
    }

    /// Windows that live on some other space but not on the current one.
    pub fn windows_only_on_other_spaces(
        &self,
        ws: &(impl WindowServer + ?Sized),
    ) -> Vec<WindowServerId> {
        let Some(current) = self.current else {
            return Vec::new();
        };
        windows_only_on_other_spaces(
            self.windows_in_spaces(ws, &self.other_spaces()),
            &self.windows_in_spaces(ws, &[current]),
        )
    }

    pub fn spaces_containing(
        &self,
        wid: WindowServerId,
        ws: &(impl WindowServer + ?Sized),
    ) -> Vec<SpaceId> {
        ws.window_spaces(wid)
    }

    /// One space gives a concrete assignment, several mean the window is on
    /// all spaces. If the window server knows nothing the previous
    /// assignment is kept, falling back to the current space.
    pub fn assignment_for(
        &mut self,
        wid: WindowServerId,
        ws: &(impl WindowServer + ?Sized),
    ) -> SpaceAssignment {
        let spaces = self.spaces_containing(wid, ws);
        let assignment = match spaces.as_slice() {
            [id] => self.concrete(*id),
            [_, _, ..] => SpaceAssignment::AllSpaces,
            [] => match (self.assignments.get(&wid), self.current) {
                (Some(previous), _) => *previous,
                (None, Some(current)) => self.concrete(current),
                (None, None) => SpaceAssignment::AllSpaces,
            },
        };
        self.assignments.insert(wid, assignment);
        assignment
    }

    fn concrete(&self, id: SpaceId) -> SpaceAssignment {
        SpaceAssignment::Space { id, index: self.index_of(id).unwrap_or(0) }
    }

    pub fn forget_window(&mut self, wid: WindowServerId) { self.assignments.remove(&wid); }

    /// Temporarily adds `windows` to the current space so the accessibility
    /// tree exposes them. Returns false if the window server refused.
    pub fn bring_to_current_space(
        &self,
        ws: &(impl WindowServer + ?Sized),
        windows: &[WindowServerId],
    ) -> bool {
        let Some(current) = self.current else {
            return false;
        };
        match ws.add_windows_to_spaces(windows, &[current]) {
            Ok(()) => true,
            Err(e) => {
                warn!(%e, "could not add windows to the current space");
                false
            }
        }
    }

    pub fn remove_from_current_space(
        &self,
        ws: &(impl WindowServer + ?Sized),
        windows: &[WindowServerId],
    ) {
        let Some(current) = self.current else {
            return;
        };
        if let Err(e) = ws.remove_windows_from_spaces(windows, &[current]) {
            warn!(%e, "could not remove windows from the current space");
        }
    }
}

/// `on_other` minus `on_current`, keeping the order of `on_other` and dropping
/// duplicates.
pub fn windows_only_on_other_spaces(
    on_other: Vec<WindowServerId>,
    on_current: &[WindowServerId],
) -> Vec<WindowServerId> {
    let mut result: Vec<WindowServerId> = Vec::with_capacity(on_other.len());
    for wid in on_other {
        if !on_current.contains(&wid) && !result.contains(&wid) {
            result.push(wid);
        }
    }
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SummonState {
    #[default]
    Idle,
    /// Held only while a summon from idle refreshes discovery; it ends in
    /// the same event as either `Cycling` or `Idle`.
    FirstSummon,
    Cycling,
}

/// Manages the summon state machine
#[derive(Default)]
pub struct SummonManager {
    pub state: SummonState,
    /// Set while the user holds the switcher open. Deferred UI work checks it
    /// before doing anything.
    pub ui_in_use: bool,
    /// The presenter has been told to show the panel since the last hide.
    pub panel_shown: bool,
    pub ui_builds_scheduled: u64,
    pub ui_builds_handled: u64,
    pub mission_control_active: bool,
    pub level_sort_pending: bool,
}

/// Manages communication with other actors in the system
#[derive(Default)]
pub struct CommunicationManager {
    pub events_tx: Option<Sender>,
    pub presenter_tx: Option<presenter::Sender>,
}

impl CommunicationManager {
    pub fn present(&self, event: presenter::Event) {
        if let Some(tx) = &self.presenter_tx {
            tx.send(event);
        }
    }
}
