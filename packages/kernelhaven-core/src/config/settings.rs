//! Configuration schema (YAML v1)
//!
//! One section per model provider plus analysis and logging settings.
//! Extractor-specific settings live in the free-form `extra` map.

use super::error::{ConfigError, ConfigResult};
use super::validation::Validatable;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Supported schema versions
pub const SUPPORTED_VERSIONS: &[u64] = &[1];

const MAX_THREADS: usize = 1024;

/// Top-level configuration
///
/// # Example
/// ```
/// use kernelhaven_core::config::Configuration;
///
/// let config = Configuration::from_yaml_str(r#"
/// version: 1
/// source_tree: /src/linux
/// code:
///   threads: 4
///   files: [drivers]
/// "#).unwrap();
///
/// assert_eq!(config.code.threads, 4);
/// assert!(config.analysis.preemptively_start_extractors);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Configuration {
    /// Schema version (always 1 for v1)
    pub version: u64,

    /// Root of the product line source tree
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_tree: Option<PathBuf>,

    /// Directory providers read and write their caches in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Directory analysis output is written to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    pub variability: ProviderSettings,
    pub build: ProviderSettings,
    pub code: ProviderSettings,
    pub analysis: AnalysisSettings,
    pub log: LogSettings,

    /// Settings consumed by concrete extractors
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            version: 1,
            source_tree: None,
            cache_dir: None,
            output_dir: None,
            variability: ProviderSettings::default(),
            build: ProviderSettings::default(),
            code: ProviderSettings::default(),
            analysis: AnalysisSettings::default(),
            log: LogSettings::default(),
            extra: BTreeMap::new(),
        }
    }
}

impl Configuration {
    /// Load and validate a YAML configuration file.
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(content)?;
        let version = value
            .get("version")
            .ok_or(ConfigError::MissingVersion)?
            .as_u64()
            .unwrap_or(0);
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let config: Configuration = serde_yaml::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn with_source_tree(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_tree = Some(path.into());
        self
    }

    pub fn with_cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    pub fn require_source_tree(&self) -> ConfigResult<&Path> {
        self.source_tree
            .as_deref()
            .ok_or_else(|| ConfigError::Missing("source_tree".into()))
    }

    pub fn require_cache_dir(&self) -> ConfigResult<&Path> {
        self.cache_dir
            .as_deref()
            .ok_or_else(|| ConfigError::Missing("cache_dir".into()))
    }

    pub fn require_output_dir(&self) -> ConfigResult<&Path> {
        self.output_dir
            .as_deref()
            .ok_or_else(|| ConfigError::Missing("output_dir".into()))
    }

    pub fn extra(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.extra.get(key)
    }
}

impl Validatable for Configuration {
    fn validate(&self) -> ConfigResult<()> {
        self.variability.validate_section("variability")?;
        self.build.validate_section("build")?;
        self.code.validate_section("code")?;
        Ok(())
    }
}

/// Settings of one model provider and its extractor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderSettings {
    /// Registry key of the extractor
    pub extractor: String,

    /// Maximum wait for an extractor result in milliseconds (0 = no timeout)
    pub timeout_ms: u64,

    pub cache_read: bool,
    pub cache_write: bool,

    /// Worker threads (0 = one per CPU); only honoured by the code model
    pub threads: usize,

    /// Files or directories relative to the source tree (empty = whole tree)
    pub files: Vec<String>,

    /// Whole-name pattern selecting files inside listed directories
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_regex: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            extractor: crate::features::extraction::EMPTY_EXTRACTOR.to_string(),
            timeout_ms: 0,
            cache_read: false,
            cache_write: false,
            threads: 1,
            files: Vec::new(),
            file_regex: None,
        }
    }
}

impl ProviderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Compile `file_regex` (or `default`) so that it must match a whole file name.
    pub fn file_pattern(&self, default: &str) -> Result<Regex, regex::Error> {
        let pattern = self.file_regex.as_deref().unwrap_or(default);
        Regex::new(&format!("^(?:{pattern})$"))
    }

    /// Configured worker count with 0 resolved to the number of CPUs.
    pub fn worker_threads(&self) -> usize {
        match self.threads {
            0 => num_cpus::get(),
            n => n,
        }
    }

    fn validate_section(&self, section: &str) -> ConfigResult<()> {
        if self.threads > MAX_THREADS {
            return Err(ConfigError::range_with_hint(
                format!("{section}.threads"),
                self.threads,
                0,
                MAX_THREADS,
                "Use 0 for one worker per CPU.",
            ));
        }
        if self.extractor.trim().is_empty() {
            return Err(ConfigError::Missing(format!("{section}.extractor")));
        }
        if let Some(pattern) = &self.file_regex {
            Regex::new(pattern).map_err(|source| ConfigError::InvalidRegex {
                field: format!("{section}.file_regex"),
                source,
            })?;
        }
        Ok(())
    }
}

/// Analysis pipeline settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisSettings {
    /// Registry key of the pipeline to run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<String>,

    /// Start all extractors before the pipeline polls them, so they run in parallel
    pub preemptively_start_extractors: bool,

    /// Result names of components whose intermediate results are logged and written
    pub log_intermediate_results: Vec<String>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            pipeline: None,
            preemptively_start_extractors: true,
            log_intermediate_results: Vec::new(),
        }
    }
}

/// Maximum log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    pub level: LogLevel,

    /// Interval between extraction progress reports in milliseconds (0 = off)
    pub progress_interval_ms: u64,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            progress_interval_ms: 30_000,
        }
    }
}

impl LogSettings {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}
