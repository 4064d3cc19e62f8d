//! Configuration validation

use super::error::ConfigResult;

/// Checked once after loading, before any provider sees the configuration
pub trait Validatable {
    /// First problem found, if any.
    fn validate(&self) -> ConfigResult<()>;
}
