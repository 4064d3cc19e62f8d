//! Common test utilities for kernelhaven-core
//!
//! Source tree fixtures, extractor registries and small assertions shared by
//! the integration tests.

#![allow(dead_code)]

mod fixtures;

pub use fixtures::*;

use kernelhaven_core::{ExtractorError, Provider};

/// Drain a provider's result queue.
pub fn collect_results<R: Send + 'static>(provider: &Provider<R>) -> Vec<R> {
    std::iter::from_fn(|| provider.next_result()).collect()
}

/// Drain a provider's exception queue.
pub fn collect_exceptions<R: Send + 'static>(provider: &Provider<R>) -> Vec<ExtractorError> {
    std::iter::from_fn(|| provider.next_exception()).collect()
}

/// Assert that the run produced no extractor errors
pub fn assert_no_exceptions<R: Send + 'static>(provider: &Provider<R>) {
    let errors = collect_exceptions(provider);
    assert!(errors.is_empty(), "Expected no exceptions, got: {errors:?}");
}
