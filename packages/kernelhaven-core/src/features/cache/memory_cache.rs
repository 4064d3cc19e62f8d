//! In-memory cache
//!
//! Lock-free concurrent map keyed by target. Mostly useful for repeated runs
//! within one process and for tests.

use super::error::CacheResult;
use super::ports::Cache;
use crate::shared::models::Target;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct MemoryCache<R> {
    store: DashMap<Target, R>,
    reads: AtomicU64,
    hits: AtomicU64,
    writes: AtomicU64,
}

impl<R> MemoryCache<R> {
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
            reads: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Pre-populate an entry without counting it as a write.
    pub fn insert(&self, target: impl Into<Target>, result: R) {
        self.store.insert(target.into(), result);
    }

    pub fn contains(&self, target: &Target) -> bool {
        self.store.contains_key(target)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

impl<R> Default for MemoryCache<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Clone + Send + Sync> Cache<R> for MemoryCache<R> {
    fn read(&self, target: &Target) -> CacheResult<Option<R>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let hit = self.store.get(target).map(|entry| entry.value().clone());
        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(hit)
    }

    fn write(&self, target: &Target, result: &R) -> CacheResult<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.store.insert(target.clone(), result.clone());
        tracing::debug!(target = %target, "Cached extractor result");
        Ok(())
    }
}
