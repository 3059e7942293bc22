use std::sync::mpsc::{RecvError, SyncSender, sync_channel};

use crate::actor::reactor::{Event, Reactor, Sender, SummonState};
use crate::model::server::{ApplicationData, SwitcherSnapshot, WindowData};

/// Synchronous window into the reactor's state. Must not be used from the
/// reactor thread itself.
#[derive(Clone)]
pub struct ReactorQueryHandle {
    tx: Sender,
}

impl ReactorQueryHandle {
    pub(super) fn new(tx: Sender) -> Self { Self { tx } }

    fn send_query<T>(
        &self,
        build: impl FnOnce(SyncSender<T>) -> QueryRequest,
    ) -> Result<T, RecvError> {
        let (tx, rx) = sync_channel(1);
        if self.tx.try_send(Event::Query(build(tx))).is_err() {
            return Err(RecvError);
        }
        rx.recv().map_err(|_| RecvError)
    }

    /// What the switcher would show right now.
    pub fn query_snapshot(&self) -> SwitcherSnapshot {
        self.send_query(QueryRequest::Snapshot).unwrap_or_default()
    }

    /// Every tracked window, shown or not, in list order.
    pub fn query_windows(&self) -> Vec<WindowData> {
        self.send_query(QueryRequest::Windows).unwrap_or_default()
    }

    pub fn query_applications(&self) -> Vec<ApplicationData> {
        self.send_query(QueryRequest::Applications).unwrap_or_default()
    }

    pub fn query_summon_state(&self) -> Option<SummonState> {
        self.send_query(QueryRequest::SummonState).ok()
    }
}

#[derive(Debug)]
pub enum QueryRequest {
    Snapshot(SyncSender<SwitcherSnapshot>),
    Windows(SyncSender<Vec<WindowData>>),
    Applications(SyncSender<Vec<ApplicationData>>),
    SummonState(SyncSender<SummonState>),
}

impl Reactor {
    pub(super) fn handle_query_request(&mut self, req: QueryRequest) {
        match req {
            QueryRequest::Snapshot(resp) => {
                let _ = resp.send(self.snapshot());
            }
            QueryRequest::Windows(resp) => {
                let _ = resp.send(self.window_data());
            }
            QueryRequest::Applications(resp) => {
                let _ = resp.send(self.app_manager.application_data(&self.window_manager));
            }
            QueryRequest::SummonState(resp) => {
                let _ = resp.send(self.summon_manager.state);
            }
        }
    }

    pub(super) fn window_data(&self) -> Vec<WindowData> {
        self.window_manager
            .iter()
            .map(|window| {
                let app = self.app_manager.get(window.pid);
                WindowData::new(
                    window,
                    app.and_then(|a| a.info.localized_name.clone()),
                    app.and_then(|a| a.info.bundle_id.clone()),
                )
            })
            .collect()
    }
}
