//! Registry: metadata store + artifact store + load cache.
//!
//! # Registration
//!
//! `register` validates the source and metrics, then under the write lock
//! shared by every registry on the same document it loads the document,
//! rejects an existing (name, version), copies the artifact and persists the
//! updated document atomically.
//!
//! If persisting fails after the copy, the copied file is left in place
//! and is not referenced by any record.
//!
//! # Loading
//!
//! `load` serves from the cache when it can. A cold load resolves the
//! stored path from the current document, reads the file and caches the
//! bytes under `name/version`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError};

use tokio::fs;
use tokio::sync::Mutex;
use tracing::info;

use super::artifact_store::{validate_identifier, ArtifactStore};
use super::cache::{ArtifactCache, ArtifactContent, CacheStats};
use super::error::{RegistryError, Result};
use super::metadata_store::MetadataStore;
use crate::config::RegistryConfig;
use crate::domain::{ArtifactKey, ArtifactRecord, Metadata, Metrics};

/// Write locks shared by every registry in the process, keyed by the
/// canonical metadata document path
static WRITE_LOCKS: OnceLock<std::sync::Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    OnceLock::new();

/// The write lock guarding the document at `document`
fn write_lock_for(document: &Path) -> Arc<Mutex<()>> {
    let mut locks = WRITE_LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    locks.entry(document.to_path_buf()).or_default().clone()
}

/// Filesystem-backed artifact registry.
///
/// Every registry opened on the same document shares one write lock, so
/// concurrent `register` calls in one process never lose each other's
/// records. Clones also share the cache.
#[derive(Debug, Clone)]
pub struct Registry {
    /// Absolute storage root
    root: PathBuf,

    /// Persisted document
    metadata: MetadataStore,

    /// Isolated artifact copies
    artifacts: ArtifactStore,

    /// Loaded content
    cache: ArtifactCache,

    /// Canonical document path; scopes cache entries to this registry's root
    scope: PathBuf,

    /// Serializes the load-check-mutate-save sequence of `register`
    write_lock: Arc<Mutex<()>>,
}

impl Registry {
    /// Open a registry with its own fresh cache
    pub async fn open(config: RegistryConfig) -> Result<Self> {
        Self::open_with_cache(config, ArtifactCache::new()).await
    }

    /// Open a registry that serves loads from `cache`.
    ///
    /// Pass `ArtifactCache::global()` to share content process-wide.
    pub async fn open_with_cache(config: RegistryConfig, cache: ArtifactCache) -> Result<Self> {
        let root =
            std::path::absolute(&config.root).map_err(|e| RegistryError::storage(&config.root, e))?;
        let config = RegistryConfig { root, ..config };

        let models_dir = config.models_dir();
        fs::create_dir_all(&models_dir)
            .await
            .map_err(|e| RegistryError::storage(&models_dir, e))?;

        let canonical_root = fs::canonicalize(&config.root)
            .await
            .map_err(|e| RegistryError::storage(&config.root, e))?;
        let scope = canonical_root.join(&config.metadata_file);
        let write_lock = write_lock_for(&scope);

        info!(root = %config.root.display(), "Registry opened");

        Ok(Self {
            metadata: MetadataStore::new(config.metadata_path()),
            artifacts: ArtifactStore::new(models_dir),
            root: config.root,
            cache,
            scope,
            write_lock,
        })
    }

    /// Open with the default layout under `root`
    pub async fn open_at(root: impl Into<PathBuf>) -> Result<Self> {
        Self::open(RegistryConfig::new(root)).await
    }

    /// Get the storage root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the directory holding stored artifacts
    pub fn models_dir(&self) -> &Path {
        self.artifacts.models_dir()
    }

    /// Get the metadata document path
    pub fn metadata_path(&self) -> &Path {
        self.metadata.path()
    }

    /// Get the cache handle (clone it to share with another registry)
    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Register a new (name, version), copying `source` into isolated storage.
    ///
    /// Fails with `AlreadyExists` if the pair is taken; the existing record
    /// is not modified. Non-finite metrics are rejected with `InvalidMetric`
    /// since JSON cannot represent them.
    pub async fn register(
        &self,
        name: &str,
        version: &str,
        source: impl AsRef<Path>,
        metrics: Metrics,
        metadata: Metadata,
    ) -> Result<ArtifactRecord> {
        let source = source.as_ref();
        validate_identifier("name", name)?;
        validate_identifier("version", version)?;
        if !fs::metadata(source).await.map(|m| m.is_file()).unwrap_or(false) {
            return Err(RegistryError::SourceNotFound(source.to_path_buf()));
        }
        validate_metrics(&metrics)?;

        let _guard = self.write_lock.lock().await;

        let mut doc = self.metadata.load().await;
        if doc.contains(name, version) {
            return Err(RegistryError::already_exists(name, version));
        }

        let storage_path = self.artifacts.store(name, version, source).await?;
        let (size_bytes, sha256) = self.artifacts.digest(&storage_path).await?;

        let record = ArtifactRecord::new(name, version, storage_path)
            .with_metrics(metrics)
            .with_metadata(metadata)
            .with_digest(size_bytes, sha256);

        doc.insert(record.clone())
            .map_err(|_| RegistryError::already_exists(name, version))?;
        self.metadata.save(&doc).await?;

        info!(
            name,
            version,
            path = %record.storage_path.display(),
            size_bytes,
            "Artifact registered"
        );

        Ok(record)
    }

    /// Stored path for (name, version), or `None` if not registered
    pub async fn resolve_path(&self, name: &str, version: &str) -> Option<PathBuf> {
        self.get(name, version).await.map(|r| r.storage_path)
    }

    /// Load artifact content, from the cache when possible.
    ///
    /// Repeated calls for the same pair return the same `Arc`.
    pub async fn load(&self, name: &str, version: &str) -> Result<ArtifactContent> {
        // Invalid identifiers can never be registered
        if validate_identifier("name", name).is_err()
            || validate_identifier("version", version).is_err()
        {
            return Err(RegistryError::not_found(name, version));
        }

        let key = ArtifactKey::new(name, version).cache_key();
        self.cache
            .get_or_load(&self.scope, &key, move || async move {
                self.load_from_disk(name, version).await
            })
            .await
    }

    async fn load_from_disk(&self, name: &str, version: &str) -> Result<ArtifactContent> {
        let path = self
            .resolve_path(name, version)
            .await
            .ok_or_else(|| RegistryError::not_found(name, version))?;

        match fs::read(&path).await {
            Ok(bytes) => Ok(Arc::from(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(RegistryError::ArtifactMissing {
                    name: name.to_string(),
                    version: version.to_string(),
                    path,
                })
            }
            Err(e) => Err(RegistryError::storage(path, e)),
        }
    }

    /// Full record for (name, version)
    pub async fn get(&self, name: &str, version: &str) -> Option<ArtifactRecord> {
        self.metadata.load().await.get(name, version).cloned()
    }

    /// All records, ordered by name then version
    pub async fn list(&self) -> Vec<ArtifactRecord> {
        self.metadata.load().await.records().cloned().collect()
    }

    /// Versions registered under `name`
    pub async fn versions(&self, name: &str) -> Vec<String> {
        self.metadata
            .load()
            .await
            .versions(name)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Whether (name, version) content is cached
    pub fn is_cached(&self, name: &str, version: &str) -> bool {
        self.cache
            .contains(&self.scope, &ArtifactKey::new(name, version).cache_key())
    }

    /// Cache hit/miss counters
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

/// Metrics must survive a JSON round trip
fn validate_metrics(metrics: &Metrics) -> Result<()> {
    match metrics.iter().find(|(_, value)| !value.is_finite()) {
        Some((key, value)) => Err(RegistryError::InvalidMetric {
            key: key.clone(),
            value: *value,
        }),
        None => Ok(()),
    }
}
