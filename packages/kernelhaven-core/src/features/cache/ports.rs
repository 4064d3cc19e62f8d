//! Cache port used by the extractor runner

use super::error::CacheResult;
use crate::shared::models::Target;

/// Per-target result store consulted before running an extractor
///
/// Shared by every worker of one run; implementations must tolerate concurrent
/// `read`/`write` calls for different targets.
pub trait Cache<R>: Send + Sync {
    /// `Ok(None)` is a miss. Errors are treated as a miss by the caller.
    fn read(&self, target: &Target) -> CacheResult<Option<R>>;

    fn write(&self, target: &Target, result: &R) -> CacheResult<()>;
}

/// Cache that never hits and discards writes
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl<R> Cache<R> for NoCache {
    fn read(&self, _target: &Target) -> CacheResult<Option<R>> {
        Ok(None)
    }

    fn write(&self, _target: &Target, _result: &R) -> CacheResult<()> {
        Ok(())
    }
}
