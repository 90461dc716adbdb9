//! Domain types for the registry.
//!
//! - ArtifactRecord: one registered (name, version)
//! - RegistryDocument: the persisted aggregate of all records

pub mod document;
pub mod record;

// Re-export commonly used types
pub use document::{RegistryDocument, FORMAT_VERSION};
pub use record::{ArtifactKey, ArtifactRecord, Metadata, Metrics};
