//! Error types for kernelhaven-core
//!
//! Each concern has its own error enum; [`HavenError`] unifies them for
//! callers that drive a whole analysis.

use crate::config::ConfigError;
use crate::features::cache::CacheError;
use crate::features::extraction::{ExtractorError, SetUpError};
use crate::shared::sync::ParallelizerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HavenError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Setup error: {0}")]
    SetUp(#[from] SetUpError),

    #[error("Extraction error: {0}")]
    Extractor(#[from] ExtractorError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Parallelizer error: {0}")]
    Parallelizer(#[from] ParallelizerError),

    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

impl HavenError {
    pub fn pipeline(msg: impl Into<String>) -> Self {
        HavenError::Pipeline(msg.into())
    }
}

/// Result type alias for kernelhaven operations
pub type Result<T> = std::result::Result<T, HavenError>;
