//! In-memory content cache for loaded artifacts.
//!
//! The cache is a cheap handle around shared state: cloning it shares the
//! entries. Registries opened with the same handle serve each other's warm
//! loads; a fresh handle gives an isolated cache. Entries are never evicted.
//!
//! Entries are scoped by storage root, so registries at different roots can
//! share one handle without serving each other's content for the same
//! `name/version` key.
//!
//! Each key owns a `OnceCell`, so concurrent loads of one key run the disk
//! read once and all observe the same `Arc`.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tokio::sync::OnceCell;
use tracing::debug;

use super::error::Result;

/// Loaded artifact content, shared between all callers
pub type ArtifactContent = Arc<[u8]>;

type Slot = Arc<OnceCell<ArtifactContent>>;

/// Process-wide cache for callers that opt into sharing
static GLOBAL: OnceLock<ArtifactCache> = OnceLock::new();

/// Hit/miss counters and entry count
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Loads served from memory
    pub hits: u64,
    /// Loads that went to disk
    pub misses: u64,
    /// Keys currently holding content
    pub entries: usize,
}

#[derive(Debug, Default)]
struct CacheInner {
    /// (scope, key) -> slot
    entries: Mutex<HashMap<(PathBuf, String), Slot>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Shared handle to an artifact content cache
#[derive(Debug, Clone, Default)]
pub struct ArtifactCache {
    inner: Arc<CacheInner>,
}

impl ArtifactCache {
    /// Create an empty, unshared cache
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache
    pub fn global() -> Self {
        GLOBAL.get_or_init(Self::new).clone()
    }

    /// Whether two handles refer to the same cache
    pub fn same_cache(&self, other: &ArtifactCache) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<(PathBuf, String), Slot>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, scope: &Path, key: &str) -> Slot {
        self.entries()
            .entry((scope.to_path_buf(), key.to_string()))
            .or_default()
            .clone()
    }

    /// Drop a slot that never received content and that nobody else holds
    fn release_empty(&self, scope: &Path, key: &str, slot: &Slot) {
        let mut entries = self.entries();
        let map_key = (scope.to_path_buf(), key.to_string());
        let removable = entries.get(&map_key).is_some_and(|stored| {
            // Map + `slot` are the only owners; new owners only appear under this lock
            Arc::ptr_eq(stored, slot) && !stored.initialized() && Arc::strong_count(stored) == 2
        });
        if removable {
            entries.remove(&map_key);
        }
    }

    /// Return the cached content for `key` under `scope`, running `load` on
    /// the first call.
    ///
    /// A failed load leaves the key uncached so a later call retries.
    pub async fn get_or_load<F, Fut>(
        &self,
        scope: &Path,
        key: &str,
        load: F,
    ) -> Result<ArtifactContent>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ArtifactContent>>,
    {
        let slot = self.slot(scope, key);

        if let Some(content) = slot.get() {
            self.inner.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key, "Artifact cache hit");
            return Ok(content.clone());
        }

        let ran = AtomicBool::new(false);
        let loaded = slot
            .get_or_try_init(|| {
                let ran = &ran;
                async move {
                    ran.store(true, Ordering::Relaxed);
                    load().await
                }
            })
            .await
            .cloned();

        let content = match loaded {
            Ok(content) => content,
            Err(e) => {
                self.release_empty(scope, key, &slot);
                return Err(e);
            }
        };

        if ran.load(Ordering::Relaxed) {
            self.inner.misses.fetch_add(1, Ordering::Relaxed);
            debug!(key, bytes = content.len(), "Artifact cache miss, loaded from disk");
        } else {
            // Another task populated the entry while we waited
            self.inner.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key, "Artifact cache hit after concurrent load");
        }

        Ok(content)
    }

    /// Cached content for `key` under `scope`, without loading
    pub fn get(&self, scope: &Path, key: &str) -> Option<ArtifactContent> {
        self.entries()
            .get(&(scope.to_path_buf(), key.to_string()))
            .and_then(|slot| slot.get().cloned())
    }

    /// Whether `key` under `scope` holds content
    pub fn contains(&self, scope: &Path, key: &str) -> bool {
        self.get(scope, key).is_some()
    }

    /// Number of keys holding content
    pub fn len(&self) -> usize {
        self.entries()
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    /// Check if no key holds content
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of tracked slots, including ones still loading
    pub fn slot_count(&self) -> usize {
        self.entries().len()
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
