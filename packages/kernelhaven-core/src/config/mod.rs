//! Configuration
//!
//! A single YAML document (schema version 1) configures the three model
//! providers, the analysis pipeline and logging:
//!
//! ```yaml
//! version: 1
//! source_tree: /src/linux
//! cache_dir: cache
//! code:
//!   extractor: srcml
//!   threads: 4
//!   timeout_ms: 60000
//!   cache_read: true
//!   cache_write: true
//! analysis:
//!   pipeline: feature-count
//! ```

pub mod error;
pub mod settings;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use settings::{
    AnalysisSettings, Configuration, LogLevel, LogSettings, ProviderSettings, SUPPORTED_VERSIONS,
};
pub use validation::Validatable;
