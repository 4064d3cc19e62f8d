//! Shared data models

mod target;

pub use target::Target;
