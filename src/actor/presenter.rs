//! Outbound interface to the presentation layer, which renders the switcher
//! panel. The reactor only ever tells it what to show.

use crate::actor;
use crate::model::server::SwitcherSnapshot;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Build and display the panel.
    Show(SwitcherSnapshot),
    /// The panel is open and its contents changed.
    Refresh(SwitcherSnapshot),
    Hide,
}

pub type Sender = actor::Sender<Event>;
pub type Receiver = actor::Receiver<Event>;
