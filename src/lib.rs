//! Window discovery and switching core.
//!
//! The [`actor::reactor::Reactor`] owns the application, window and space
//! registries and reconciles them from the notification feeds exposed by the
//! platform traits in [`sys`].

pub mod actor;
pub mod common;
pub mod model;
pub mod sys;
