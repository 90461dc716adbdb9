//! Core registry logic.
//!
//! This module contains:
//! - MetadataStore: Atomic, corruption-tolerant JSON persistence
//! - ArtifactStore: Per name/version isolated copies
//! - ArtifactCache: Shared in-memory content cache
//! - Registry: The public surface combining all three

pub mod artifact_store;
pub mod cache;
pub mod error;
pub mod metadata_store;
pub mod registry;

// Re-export commonly used types
pub use artifact_store::{compute_file_digest, validate_identifier, ArtifactStore};
pub use cache::{ArtifactCache, ArtifactContent, CacheStats};
pub use error::{RegistryError, Result};
pub use metadata_store::MetadataStore;
pub use registry::Registry;
