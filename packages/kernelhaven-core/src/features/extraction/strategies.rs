//! Built-in extractor strategies

use super::error::ExtractorError;
use super::ports::Extractor;
use crate::shared::models::Target;
use std::marker::PhantomData;

/// Registry key of [`EmptyExtractor`], the default of every provider section
pub const EMPTY_EXTRACTOR: &str = "empty";

/// Returns an empty model for every target
pub struct EmptyExtractor<R> {
    _result: PhantomData<fn() -> R>,
}

impl<R> EmptyExtractor<R> {
    pub fn new() -> Self {
        Self {
            _result: PhantomData,
        }
    }
}

impl<R> Default for EmptyExtractor<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Default> Extractor<R> for EmptyExtractor<R> {
    fn run_on_file(&self, _target: &Target) -> Result<R, ExtractorError> {
        Ok(R::default())
    }

    fn name(&self) -> &str {
        EMPTY_EXTRACTOR
    }
}

/// Extractor backed by a closure
///
/// # Example
/// ```
/// use kernelhaven_core::features::extraction::{Extractor, FnExtractor};
/// use kernelhaven_core::shared::models::Target;
///
/// let lines = FnExtractor::new("lines", |target: &Target| {
///     Ok(target.path().display().to_string().len())
/// });
/// assert_eq!(lines.run_on_file(&Target::new("a.c")).unwrap(), 3);
/// ```
pub struct FnExtractor<R, F> {
    name: String,
    run: F,
    _result: PhantomData<fn() -> R>,
}

impl<R, F> FnExtractor<R, F>
where
    F: Fn(&Target) -> Result<R, ExtractorError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, run: F) -> Self {
        Self {
            name: name.into(),
            run,
            _result: PhantomData,
        }
    }
}

impl<R, F> Extractor<R> for FnExtractor<R, F>
where
    F: Fn(&Target) -> Result<R, ExtractorError> + Send + Sync,
{
    fn run_on_file(&self, target: &Target) -> Result<R, ExtractorError> {
        (self.run)(target)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
