//! The persisted registry document.
//!
//! Nested name -> version -> record, the canonical on-disk shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::record::ArtifactRecord;

/// Current document format version
pub const FORMAT_VERSION: u32 = 1;

/// All known records, keyed by name then version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryDocument {
    /// Document format version
    #[serde(default = "default_format_version")]
    pub format_version: u32,

    /// name -> version -> record
    #[serde(default)]
    pub models: BTreeMap<String, BTreeMap<String, ArtifactRecord>>,
}

fn default_format_version() -> u32 {
    FORMAT_VERSION
}

impl Default for RegistryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            models: BTreeMap::new(),
        }
    }

    /// Look up a record by (name, version)
    pub fn get(&self, name: &str, version: &str) -> Option<&ArtifactRecord> {
        self.models.get(name).and_then(|versions| versions.get(version))
    }

    /// Check whether (name, version) is registered
    pub fn contains(&self, name: &str, version: &str) -> bool {
        self.get(name, version).is_some()
    }

    /// Insert a record unless its pair is already taken.
    ///
    /// Returns the rejected record when the pair exists; the stored one is
    /// left untouched.
    pub fn insert(&mut self, record: ArtifactRecord) -> Result<(), ArtifactRecord> {
        let versions = self.models.entry(record.name.clone()).or_default();
        if versions.contains_key(&record.version) {
            return Err(record);
        }
        versions.insert(record.version.clone(), record);
        Ok(())
    }

    /// Versions registered under a name, in sorted order
    pub fn versions(&self, name: &str) -> Vec<&str> {
        self.models
            .get(name)
            .map(|versions| versions.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// All records ordered by name then version
    pub fn records(&self) -> impl Iterator<Item = &ArtifactRecord> {
        self.models.values().flat_map(|versions| versions.values())
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.models.values().map(BTreeMap::len).sum()
    }

    /// Check if the document has no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
