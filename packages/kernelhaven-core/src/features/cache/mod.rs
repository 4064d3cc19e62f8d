//! Extractor result caches
//!
//! - [`NoCache`]: caching disabled
//! - [`MemoryCache`]: DashMap-backed, per process
//! - [`JsonFileCache`]: one JSON file per target, keyed by blake3 hash

mod error;
mod json_file_cache;
mod memory_cache;
mod ports;

pub use error::*;
pub use json_file_cache::JsonFileCache;
pub use memory_cache::MemoryCache;
pub use ports::{Cache, NoCache};
