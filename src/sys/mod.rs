//! The boundary to the operating system.
//!
//! Each submodule describes one family of OS services as a trait. The reactor
//! only talks to the OS through [`Platform`], which bundles them.

pub mod app;
pub mod ax;
pub mod screen;
pub mod sim;
pub mod timer;
pub mod window_server;

pub trait Platform:
    app::ProcessSource + ax::Accessibility + window_server::WindowServer + Send + Sync
{
}

impl<T> Platform for T where
    T: app::ProcessSource + ax::Accessibility + window_server::WindowServer + Send + Sync
{
}
