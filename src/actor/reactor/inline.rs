//! Drives a reactor on the calling thread instead of its own.
//!
//! Used by scripted simulations and tests, which need to know when every
//! effect of an input has been applied.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::{Event, Reactor, Receiver, SummonState};
use crate::actor::notification_center::NotificationCenter;
use crate::actor::{self, presenter};
use crate::common::config::Config;
use crate::model::server::{ApplicationData, SwitcherSnapshot, WindowData};
use crate::sys::Platform;

pub struct InlineReactor {
    reactor: Reactor,
    events: Receiver,
    presenter_rx: presenter::Receiver,
}

impl InlineReactor {
    /// Creates the reactor and subscribes it to the platform's workspace
    /// notifications. Nothing happens until [`settle`](Self::settle).
    pub fn new(config: Config, platform: Arc<dyn Platform>) -> InlineReactor {
        let (events_tx, events) = actor::channel();
        let (presenter_tx, presenter_rx) = actor::channel();
        let mut reactor = Reactor::new(config, platform.clone());
        reactor.communication_manager.events_tx = Some(events_tx.clone());
        reactor.communication_manager.presenter_tx = Some(presenter_tx);
        events_tx.send(Event::InitialDiscovery);
        NotificationCenter::new(events_tx).watch(&*platform);
        InlineReactor { reactor, events, presenter_rx }
    }

    pub fn send(&self, event: Event) {
        if let Some(tx) = &self.reactor.communication_manager.events_tx {
            tx.send(event);
        }
    }

    /// Handles events until nothing is queued and no background work
    /// (discovery passes, deferred sorts, scheduled rebuilds) is outstanding.
    /// Returns false if that didn't happen within `timeout`.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            while let Ok((span, event)) = self.events.try_recv() {
                let _guard = span.enter();
                self.reactor.handle_loop_event(event);
            }
            if !self.is_busy() {
                return true;
            }
            if Instant::now() >= deadline {
                warn!("reactor did not settle in {timeout:?}");
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn is_busy(&self) -> bool {
        let summon = &self.reactor.summon_manager;
        self.reactor.app_manager.has_pending_discoveries()
            || summon.level_sort_pending
            || summon.ui_builds_handled < summon.ui_builds_scheduled
    }

    /// Everything sent to the presenter since the last call.
    pub fn take_presented(&mut self) -> Vec<presenter::Event> {
        let mut presented = Vec::new();
        while let Ok((_span, event)) = self.presenter_rx.try_recv() {
            presented.push(event);
        }
        debug!(count = presented.len(), "collected presenter events");
        presented
    }

    pub fn snapshot(&self) -> SwitcherSnapshot { self.reactor.snapshot() }

    pub fn windows(&self) -> Vec<WindowData> { self.reactor.window_data() }

    pub fn applications(&self) -> Vec<ApplicationData> {
        self.reactor.app_manager.application_data(&self.reactor.window_manager)
    }

    pub fn summon_state(&self) -> SummonState { self.reactor.summon_manager.state }

    pub fn reactor(&self) -> &Reactor { &self.reactor }
}
