//! Extraction providers
//!
//! An [`Extractor`] turns one [`Target`](crate::shared::models::Target) into a
//! model fragment. The [`ExtractorRunner`] fans targets out to worker
//! threads, and the [`Provider`] hands results to consumers with lazy start,
//! caching and timeouts.

mod error;
mod ports;
mod provider;
mod runner;
mod strategies;

pub use error::{ExtractorError, SetUpError};
pub use ports::{Extractor, ProviderPolicy};
pub use provider::{Provider, ProviderState};
pub use runner::{ExtractorRunner, RunChannels, RunJob};
pub use strategies::{EmptyExtractor, FnExtractor, EMPTY_EXTRACTOR};
