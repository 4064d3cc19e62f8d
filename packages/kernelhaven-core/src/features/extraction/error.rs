//! Error types for extraction

use crate::config::ConfigError;
use crate::features::cache::CacheError;
use crate::shared::models::Target;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Recoverable failure of one extraction
///
/// Lands on the provider's exception queue. Cloneable so that peeking the
/// exception queue can hand out copies.
#[derive(Debug, Clone, Error)]
pub struct ExtractorError {
    message: String,
    target: Option<Target>,
    #[source]
    cause: Option<Arc<dyn StdError + Send + Sync>>,
}

impl ExtractorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            target: None,
            cause: None,
        }
    }

    pub fn for_target(target: &Target, message: impl Into<String>) -> Self {
        Self::new(message).with_target(target.clone())
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Synthesized when no result arrives within the provider timeout.
    pub fn timeout(timeout_ms: u128) -> Self {
        Self::new(format!(
            "Timeout reached: Waited longer than {timeout_ms} ms on extractor result"
        ))
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }
}

impl fmt::Display for ExtractorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{} (target: {})", self.message, target)?,
            None => f.write_str(&self.message)?,
        }
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

/// Failure to configure or start a provider
#[derive(Debug, Error)]
pub enum SetUpError {
    /// Configuration or start requested while an extraction is in progress
    #[error("Extractor '{extractor}' is already running")]
    Running { extractor: String },

    #[error("Extractor '{extractor}' has no configuration; call set_config first")]
    NotConfigured { extractor: String },

    #[error("Could not initialize extractor '{extractor}': {reason}")]
    Init { extractor: String, reason: String },

    /// Target enumeration failed
    #[error("Could not collect targets: {0}")]
    Targets(String),

    #[error("Unknown {kind} '{key}'. Known: {}", known.join(", "))]
    UnknownHandler {
        kind: &'static str,
        key: String,
        known: Vec<String>,
    },

    #[error("Could not spawn thread '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl SetUpError {
    pub fn init(extractor: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::Init {
            extractor: extractor.into(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_target_and_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ExtractorError::for_target(&Target::new("a.c"), "parse failed").with_cause(io);
        assert_eq!(err.to_string(), "parse failed (target: a.c): gone");
        assert!(err.source().is_some());
        assert_eq!(err.target(), Some(&Target::new("a.c")));
    }

    #[test]
    fn test_timeout_message() {
        let err = ExtractorError::timeout(10);
        assert_eq!(
            err.message(),
            "Timeout reached: Waited longer than 10 ms on extractor result"
        );
    }
}
