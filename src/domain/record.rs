//! Registered artifact records.
//!
//! A record is created once by `register` and never mutated afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form performance attributes (accuracy, latency, ...)
pub type Metrics = BTreeMap<String, f64>;

/// Free-form string attributes (author, target device, ...)
pub type Metadata = BTreeMap<String, String>;

/// One registered (name, version) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    /// Artifact name (shared by all its versions)
    pub name: String,

    /// Version, unique per name
    pub version: String,

    /// Absolute path of the isolated copy
    pub storage_path: PathBuf,

    /// Performance attributes
    #[serde(default)]
    pub metrics: Metrics,

    /// Descriptive attributes
    #[serde(default)]
    pub metadata: Metadata,

    /// When the artifact was registered
    pub registered_at: DateTime<Utc>,

    /// Size of the stored copy in bytes
    #[serde(default)]
    pub size_bytes: u64,

    /// Hex SHA-256 of the stored copy
    #[serde(default)]
    pub sha256: String,
}

impl ArtifactRecord {
    /// Create a record stamped with the current time
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        storage_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            storage_path: storage_path.into(),
            metrics: Metrics::new(),
            metadata: Metadata::new(),
            registered_at: Utc::now(),
            size_bytes: 0,
            sha256: String::new(),
        }
    }

    /// Attach performance metrics
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Attach descriptive metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Attach size and digest of the stored copy
    pub fn with_digest(mut self, size_bytes: u64, sha256: impl Into<String>) -> Self {
        self.size_bytes = size_bytes;
        self.sha256 = sha256.into();
        self
    }

    /// The composite key addressing this record
    pub fn key(&self) -> ArtifactKey {
        ArtifactKey::new(&self.name, &self.version)
    }
}

/// Composite (name, version) key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArtifactKey {
    pub name: String,
    pub version: String,
}

impl ArtifactKey {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Cache key form: "{name}/{version}"
    pub fn cache_key(&self) -> String {
        format!("{}/{}", self.name, self.version)
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let metrics: Metrics = [("acc".to_string(), 0.9)].into_iter().collect();
        let metadata: Metadata = [("author".to_string(), "x".to_string())]
            .into_iter()
            .collect();

        let record = ArtifactRecord::new("net", "v1", "/data/models/net/v1/a.bin")
            .with_metrics(metrics)
            .with_metadata(metadata)
            .with_digest(42, "abcd");

        assert_eq!(record.name, "net");
        assert_eq!(record.metrics.get("acc"), Some(&0.9));
        assert_eq!(record.metadata.get("author"), Some(&"x".to_string()));
        assert_eq!(record.size_bytes, 42);
        assert_eq!(record.key().cache_key(), "net/v1");
    }

    #[test]
    fn test_record_parses_without_digest_fields() {
        // Documents written before size/digest were tracked
        let json = r#"{
            "name": "net",
            "version": "v1",
            "storage_path": "/data/models/net/v1/a.bin",
            "metrics": {"acc": 0.9},
            "metadata": {},
            "registered_at": "2024-05-01T12:00:00Z"
        }"#;

        let record: ArtifactRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.size_bytes, 0);
        assert!(record.sha256.is_empty());
        assert_eq!(record.storage_path, PathBuf::from("/data/models/net/v1/a.bin"));
    }

    #[test]
    fn test_key_display() {
        let key = ArtifactKey::new("MobileNetV2", "v1.2.0");
        assert_eq!(key.to_string(), "MobileNetV2/v1.2.0");
    }
}
