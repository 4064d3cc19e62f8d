//! JSON file cache
//!
//! One file per target, named by the blake3 hash of the target path:
//!
//! ```text
//! <dir>/<blake3(target)>.json  =  { "version": 1, "target": "...", "result": ... }
//! ```
//!
//! Writes go to a temporary file first and are renamed into place, so readers
//! never observe a half-written entry.

use super::error::{CacheError, CacheResult};
use super::ports::Cache;
use crate::shared::models::Target;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EntryRef<'a, R> {
    version: u32,
    target: &'a Target,
    result: &'a R,
}

#[derive(Deserialize)]
struct Entry<R> {
    version: u32,
    target: Target,
    result: R,
}

pub struct JsonFileCache<R> {
    dir: PathBuf,
    _result: PhantomData<fn() -> R>,
}

impl<R> JsonFileCache<R> {
    /// Open (and create if needed) a cache directory.
    pub fn new(dir: impl Into<PathBuf>) -> CacheResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            _result: PhantomData,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of the entry for `target`.
    pub fn entry_path(&self, target: &Target) -> PathBuf {
        let key = target.path().to_string_lossy();
        let hash = blake3::hash(key.as_bytes());
        self.dir.join(format!("{}.json", hash.to_hex()))
    }
}

impl<R> Cache<R> for JsonFileCache<R>
where
    R: Serialize + DeserializeOwned,
{
    fn read(&self, target: &Target) -> CacheResult<Option<R>> {
        let path = self.entry_path(target);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: Entry<R> = serde_json::from_slice(&bytes)
            .map_err(|e| CacheError::Corrupted(format!("{}: {e}", path.display())))?;
        if entry.version != FORMAT_VERSION {
            return Err(CacheError::VersionMismatch {
                found: entry.version,
                expected: FORMAT_VERSION,
            });
        }
        if &entry.target != target {
            return Err(CacheError::Corrupted(format!(
                "{} holds an entry for {}",
                path.display(),
                entry.target
            )));
        }
        Ok(Some(entry.result))
    }

    fn write(&self, target: &Target, result: &R) -> CacheResult<()> {
        let path = self.entry_path(target);
        let bytes = serde_json::to_vec(&EntryRef {
            version: FORMAT_VERSION,
            target,
            result,
        })?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path)?;

        tracing::debug!(target = %target, path = %path.display(), "Wrote cache entry");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let cache = JsonFileCache::<Vec<String>>::new(dir.path().join("code")).unwrap();
        let target = Target::new("kernel/fork.c");

        assert_eq!(cache.read(&target).unwrap(), None);
        cache
            .write(&target, &vec!["CONFIG_A".to_string(), "CONFIG_B".to_string()])
            .unwrap();

        let hit = cache.read(&target).unwrap().unwrap();
        assert_eq!(hit, vec!["CONFIG_A", "CONFIG_B"]);
        assert!(cache.entry_path(&target).exists());
    }

    #[test]
    fn test_corrupted_entry() {
        let dir = TempDir::new().unwrap();
        let cache = JsonFileCache::<u32>::new(dir.path()).unwrap();
        let target = Target::new("a.c");
        std::fs::write(cache.entry_path(&target), b"{ not json").unwrap();

        assert!(matches!(cache.read(&target), Err(CacheError::Corrupted(_))));
    }

    #[test]
    fn test_version_mismatch() {
        let dir = TempDir::new().unwrap();
        let cache = JsonFileCache::<u32>::new(dir.path()).unwrap();
        let target = Target::new("a.c");
        std::fs::write(
            cache.entry_path(&target),
            br#"{"version": 9, "target": "a.c", "result": 1}"#,
        )
        .unwrap();

        assert!(matches!(
            cache.read(&target),
            Err(CacheError::VersionMismatch { found: 9, expected: 1 })
        ));
    }

    #[test]
    fn test_foreign_target_is_corruption() {
        let dir = TempDir::new().unwrap();
        let cache = JsonFileCache::<u32>::new(dir.path()).unwrap();
        let target = Target::new("a.c");
        std::fs::write(
            cache.entry_path(&target),
            br#"{"version": 1, "target": "b.c", "result": 1}"#,
        )
        .unwrap();

        assert!(matches!(cache.read(&target), Err(CacheError::Corrupted(_))));
    }
}
