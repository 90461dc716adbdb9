//! JSON document store for registry metadata.
//!
//! Reads are tolerant: a missing or unreadable document is treated as an
//! empty registry. Writes go to a temp file in the same directory and are
//! renamed over the canonical path, so readers never observe a partial file.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tokio::fs;
use tracing::{debug, warn};

use super::error::{RegistryError, Result};
use crate::domain::RegistryDocument;

/// File-backed store for the registry document
#[derive(Debug, Clone)]
pub struct MetadataStore {
    /// Path to the canonical document (e.g. <root>/registry.json)
    path: PathBuf,
}

impl MetadataStore {
    /// Bind a store to its canonical document path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the canonical document path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current document.
    ///
    /// Never fails: a missing file yields an empty document, and a file that
    /// cannot be read or parsed yields an empty document plus a warning.
    pub async fn load(&self) -> RegistryDocument {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No registry document yet, starting empty");
                return RegistryDocument::new();
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Registry document unreadable, initializing empty registry"
                );
                return RegistryDocument::new();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Registry document is corrupted, initializing empty registry"
                );
                RegistryDocument::new()
            }
        }
    }

    /// Atomically replace the persisted document
    pub async fn save(&self, doc: &RegistryDocument) -> Result<()> {
        let content = serde_json::to_vec_pretty(doc)
            .map_err(|e| RegistryError::persistence(&self.path, io::Error::from(e)))?;

        let path = self.path.clone();
        let written = tokio::task::spawn_blocking(move || write_atomic(&path, &content))
            .await
            .map_err(io::Error::other)
            .and_then(|inner| inner);

        written.map_err(|e| RegistryError::persistence(&self.path, e))?;

        debug!(path = %self.path.display(), records = doc.len(), "Registry document saved");
        Ok(())
    }
}

/// Write `content` to a sibling temp file, fsync it, then rename it onto `path`
fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
