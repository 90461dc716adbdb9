//! edge-registry - Local model artifact registry
//!
//! Tracks named, versioned binary artifacts on a single machine, keeps
//! their metadata in one JSON document and serves their content through
//! an in-process cache.
//!
//! # Architecture
//!
//! - Metadata is re-read from `<root>/registry.json` on every operation and
//!   replaced atomically (temp file + rename) on every registration
//! - Artifacts are copied to `<root>/models/<name>/<version>/<file>`
//! - Loaded content is cached as `Arc<[u8]>`; the cache is an explicit
//!   handle that registries may share or keep private
//!
//! # Modules
//!
//! - `config`: Storage layout and CLI configuration resolution
//! - `core`: MetadataStore, ArtifactStore, ArtifactCache, Registry
//! - `domain`: Data structures (ArtifactRecord, RegistryDocument)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Register a model
//! edge-registry register net v1 ./a.bin --metric acc=0.9 --meta author=x
//!
//! # Resolve its stored path
//! edge-registry path net v1
//!
//! # Compare cold and warm loads
//! edge-registry load net v1
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use self::config::RegistryConfig;
pub use self::core::{ArtifactCache, ArtifactContent, CacheStats, Registry, RegistryError};
pub use self::domain::{ArtifactKey, ArtifactRecord, Metadata, Metrics, RegistryDocument};
