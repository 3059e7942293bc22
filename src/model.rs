pub mod server;
pub mod window;

pub use window::{SpaceAssignment, Window, WindowFlags};
