//! Ports implemented by concrete extractors and model providers

use super::error::{ExtractorError, SetUpError};
use crate::config::Configuration;
use crate::features::cache::Cache;
use crate::shared::models::Target;
use std::sync::Arc;
use std::time::Duration;

/// Strategy turning one target into a model fragment
///
/// `run_on_file` is called concurrently from every worker thread of a run.
pub trait Extractor<R>: Send + Sync {
    /// Called before every run configuration; never while running.
    fn init(&mut self, _config: &Configuration) -> Result<(), SetUpError> {
        Ok(())
    }

    fn run_on_file(&self, target: &Target) -> Result<R, ExtractorError>;

    fn name(&self) -> &str;
}

/// Provider hooks: what to extract, and how
pub trait ProviderPolicy<R>: Send + Sync {
    fn targets(&self, config: &Configuration) -> Result<Vec<Target>, SetUpError>;

    /// Maximum wait for the next result (`Duration::ZERO` = forever).
    fn timeout(&self, config: &Configuration) -> Duration;

    /// Called once per `set_config`.
    fn create_cache(&self, config: &Configuration) -> Result<Arc<dyn Cache<R>>, SetUpError>;

    fn read_cache(&self, config: &Configuration) -> bool;

    fn write_cache(&self, config: &Configuration) -> bool;

    fn number_of_threads(&self, config: &Configuration) -> usize;
}
