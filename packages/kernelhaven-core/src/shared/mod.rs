//! Shared building blocks used by the extraction features and the pipeline

pub mod models;
pub mod sync;
pub mod utils;
