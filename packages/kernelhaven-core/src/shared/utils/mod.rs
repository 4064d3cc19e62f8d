//! Utilities

pub mod panic;
pub mod progress;
pub mod registry;

pub use panic::panic_message;
pub use progress::ProgressLogger;
pub use registry::{Factory, Registry};
