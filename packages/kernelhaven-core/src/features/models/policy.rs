//! Provider policy of the three model kinds
//!
//! Reads every hook from the configuration section of the model kind:
//!
//! | hook        | variability / build | code                              |
//! |-------------|---------------------|-----------------------------------|
//! | targets     | `[source_tree]`     | `files` expanded against the tree |
//! | threads     | 1                   | `code.threads`                    |
//! | cache       | `cache_dir/<kind>`  | `cache_dir/code`                  |

use super::kind::ModelKind;
use crate::config::{ConfigError, Configuration};
use crate::features::cache::{Cache, JsonFileCache, NoCache};
use crate::features::extraction::{ProviderPolicy, SetUpError};
use crate::shared::models::Target;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use walkdir::WalkDir;

/// Default whole-name pattern for code files
pub const DEFAULT_CODE_FILE_REGEX: &str = r".*\.c";

pub struct ModelProviderPolicy<R> {
    kind: ModelKind,
    _result: PhantomData<fn() -> R>,
}

impl<R> ModelProviderPolicy<R> {
    pub fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            _result: PhantomData,
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }
}

impl<R> ProviderPolicy<R> for ModelProviderPolicy<R>
where
    R: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn targets(&self, config: &Configuration) -> Result<Vec<Target>, SetUpError> {
        let root = config.require_source_tree()?;
        if !self.kind.is_per_file() {
            return Ok(vec![Target::new(root)]);
        }
        let targets = code_targets(root, config)?;
        tracing::info!(model = %self.kind, targets = targets.len(), "Collected extraction targets");
        Ok(targets)
    }

    fn timeout(&self, config: &Configuration) -> Duration {
        self.kind.settings(config).timeout()
    }

    fn create_cache(&self, config: &Configuration) -> Result<Arc<dyn Cache<R>>, SetUpError> {
        let settings = self.kind.settings(config);
        if !settings.cache_read && !settings.cache_write {
            return Ok(Arc::new(NoCache));
        }
        let dir = config.require_cache_dir()?.join(self.kind.as_str());
        Ok(Arc::new(JsonFileCache::<R>::new(dir)?))
    }

    fn read_cache(&self, config: &Configuration) -> bool {
        self.kind.settings(config).cache_read
    }

    fn write_cache(&self, config: &Configuration) -> bool {
        self.kind.settings(config).cache_write
    }

    fn number_of_threads(&self, config: &Configuration) -> usize {
        if self.kind.is_per_file() {
            self.kind.settings(config).worker_threads()
        } else {
            1
        }
    }
}

/// Expand `code.files` into file targets relative to `root`.
///
/// Files are taken as listed; directories are walked recursively (sorted by
/// name) keeping files whose name matches `code.file_regex`. An empty list
/// means the whole tree.
fn code_targets(root: &Path, config: &Configuration) -> Result<Vec<Target>, SetUpError> {
    let settings = &config.code;
    let pattern =
        settings
            .file_pattern(DEFAULT_CODE_FILE_REGEX)
            .map_err(|source| ConfigError::InvalidRegex {
                field: "code.file_regex".to_string(),
                source,
            })?;

    let listed: Vec<PathBuf> = if settings.files.is_empty() {
        vec![PathBuf::new()]
    } else {
        settings.files.iter().map(PathBuf::from).collect()
    };

    let mut targets = Vec::new();
    for relative in listed {
        let absolute = if relative.as_os_str().is_empty() {
            root.to_path_buf()
        } else {
            root.join(&relative)
        };

        if absolute.is_file() {
            targets.push(Target::new(relative));
        } else if absolute.is_dir() {
            for entry in WalkDir::new(&absolute).sort_by_file_name() {
                let entry = entry.map_err(|e| SetUpError::Targets(e.to_string()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                if !pattern.is_match(&entry.file_name().to_string_lossy()) {
                    continue;
                }
                let path = entry
                    .path()
                    .strip_prefix(root)
                    .map_err(|e| SetUpError::Targets(e.to_string()))?;
                targets.push(Target::new(path));
            }
        } else {
            return Err(SetUpError::Targets(format!(
                "Non-existing file specified in code.files: {}",
                relative.display()
            )));
        }
    }
    Ok(targets)
}
