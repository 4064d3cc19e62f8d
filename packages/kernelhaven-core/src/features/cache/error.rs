//! Error types for extractor caches

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache corrupted: {0}")]
    Corrupted(String),

    #[error("Cache version mismatch: found {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;
