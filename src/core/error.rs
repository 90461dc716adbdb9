//! Errors surfaced by registry operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while registering or loading artifacts
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Source artifact not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Artifact '{name}' version '{version}' already exists in registry")]
    AlreadyExists { name: String, version: String },

    #[error("Artifact '{name}' version '{version}' not found in registry")]
    NotFound { name: String, version: String },

    #[error("Artifact '{name}' version '{version}' is registered but missing on disk: {}", .path.display())]
    ArtifactMissing {
        name: String,
        version: String,
        path: PathBuf,
    },

    #[error("Failed to persist registry metadata to {}: {source}", .path.display())]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Artifact storage error at {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {field} '{value}': must be non-empty and contain no path separators")]
    InvalidIdentifier { field: &'static str, value: String },

    #[error("Invalid metric '{key}': {value} is not a finite number")]
    InvalidMetric { key: String, value: f64 },
}

impl RegistryError {
    pub(crate) fn not_found(name: &str, version: &str) -> Self {
        Self::NotFound {
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    pub(crate) fn already_exists(name: &str, version: &str) -> Self {
        Self::AlreadyExists {
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::PersistenceFailure {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for registry operations
pub type Result<T, E = RegistryError> = std::result::Result<T, E>;
