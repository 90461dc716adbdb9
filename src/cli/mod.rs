//! Command-line interface for edge-registry.
//!
//! Thin harness over the registry: register artifacts, resolve their
//! stored paths, inspect records and time cold/warm loads.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sha2::{Digest, Sha256};

use crate::config::{self, ResolvedConfig};
use crate::core::Registry;
use crate::domain::{ArtifactRecord, Metadata, Metrics};

/// edge-registry - Local model artifact registry
#[derive(Parser, Debug)]
#[command(name = "edge-registry")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Registry root directory (overrides EDGE_REGISTRY_HOME and config file)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a new artifact version
    Register {
        /// Artifact name
        name: String,

        /// Artifact version
        version: String,

        /// File to copy into the registry
        file: PathBuf,

        /// Performance metric (repeatable), e.g. --metric accuracy=0.925
        #[arg(long = "metric", value_parser = parse_metric)]
        metrics: Vec<(String, f64)>,

        /// Metadata entry (repeatable), e.g. --meta author=alice
        #[arg(long = "meta", value_parser = parse_meta)]
        metadata: Vec<(String, String)>,
    },

    /// Print the stored path of an artifact version
    Path {
        name: String,
        version: String,
    },

    /// Show the full record of an artifact version
    Show {
        name: String,
        version: String,
    },

    /// List registered artifacts
    List {
        /// Only show versions of this name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Load an artifact twice and report cold vs. warm timings
    Load {
        name: String,
        version: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let resolved = config::load_config(self.root)?;

        if let Commands::Config = self.command {
            show_config(&resolved);
            return Ok(());
        }

        let registry = Registry::open(resolved.registry.clone())
            .await
            .with_context(|| {
                format!(
                    "Failed to open registry at {}",
                    resolved.registry.root.display()
                )
            })?;

        match self.command {
            Commands::Register {
                name,
                version,
                file,
                metrics,
                metadata,
            } => {
                register(
                    &registry,
                    &name,
                    &version,
                    file,
                    metrics.into_iter().collect(),
                    metadata.into_iter().collect(),
                )
                .await
            }
            Commands::Path { name, version } => show_path(&registry, &name, &version).await,
            Commands::Show { name, version } => show_record(&registry, &name, &version).await,
            Commands::List { name } => list(&registry, name.as_deref()).await,
            Commands::Load { name, version } => load(&registry, &name, &version).await,
            Commands::Config => Ok(()),
        }
    }
}

/// Parse a `key=value` pair
fn parse_pair(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_metric(s: &str) -> Result<(String, f64), String> {
    let (key, value) = parse_pair(s)?;
    let value = value
        .parse::<f64>()
        .map_err(|e| format!("invalid number for metric '{}': {}", key, e))?;
    if !value.is_finite() {
        return Err(format!("metric '{}' must be a finite number, got {}", key, value));
    }
    Ok((key, value))
}

fn parse_meta(s: &str) -> Result<(String, String), String> {
    parse_pair(s)
}

/// Register an artifact
async fn register(
    registry: &Registry,
    name: &str,
    version: &str,
    file: PathBuf,
    metrics: Metrics,
    metadata: Metadata,
) -> Result<()> {
    let start = Instant::now();
    let record = registry
        .register(name, version, &file, metrics, metadata)
        .await?;
    let elapsed = start.elapsed();

    println!("Registered {}/{}", record.name, record.version);
    println!("  Path:   {}", record.storage_path.display());
    println!("  Size:   {} bytes", record.size_bytes);
    println!("  SHA256: {}", record.sha256);
    println!("  Time:   {:.2} ms", elapsed.as_secs_f64() * 1000.0);

    Ok(())
}

/// Print the stored path
async fn show_path(registry: &Registry, name: &str, version: &str) -> Result<()> {
    match registry.resolve_path(name, version).await {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => anyhow::bail!("Artifact '{}' version '{}' not found", name, version),
    }
}

/// Print a full record
async fn show_record(registry: &Registry, name: &str, version: &str) -> Result<()> {
    let record = registry
        .get(name, version)
        .await
        .with_context(|| format!("Artifact '{}' version '{}' not found", name, version))?;

    print_record(&record);
    Ok(())
}

fn print_record(record: &ArtifactRecord) {
    println!("Name:       {}", record.name);
    println!("Version:    {}", record.version);
    println!("Path:       {}", record.storage_path.display());
    println!("Registered: {}", record.registered_at.to_rfc3339());
    println!("Size:       {} bytes", record.size_bytes);
    println!("SHA256:     {}", record.sha256);

    if !record.metrics.is_empty() {
        println!("Metrics:");
        for (k, v) in &record.metrics {
            println!("  {}: {}", k, v);
        }
    }
    if !record.metadata.is_empty() {
        println!("Metadata:");
        for (k, v) in &record.metadata {
            println!("  {}: {}", k, v);
        }
    }
}

/// List registered artifacts
async fn list(registry: &Registry, name: Option<&str>) -> Result<()> {
    let records: Vec<ArtifactRecord> = registry
        .list()
        .await
        .into_iter()
        .filter(|r| name.map_or(true, |n| r.name == n))
        .collect();

    if records.is_empty() {
        println!("Registry is empty. Use 'edge-registry register <name> <version> <file>' to add an artifact.");
        return Ok(());
    }

    println!("{:<30} {:<14} {:>12} {:<25}", "NAME", "VERSION", "SIZE", "REGISTERED");
    println!("{}", "-".repeat(84));

    for record in &records {
        println!(
            "{:<30} {:<14} {:>12} {:<25}",
            record.name,
            record.version,
            record.size_bytes,
            record.registered_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    println!("\nTotal: {} artifacts", records.len());

    Ok(())
}

/// Load twice, reporting cold and warm timings
async fn load(registry: &Registry, name: &str, version: &str) -> Result<()> {
    let t0 = Instant::now();
    let cold = registry.load(name, version).await?;
    let cold_ms = t0.elapsed().as_secs_f64() * 1000.0;

    let t1 = Instant::now();
    let warm = registry.load(name, version).await?;
    let warm_ms = t1.elapsed().as_secs_f64() * 1000.0;

    let digest = hex::encode(Sha256::digest(&cold[..]));

    println!("Loaded {}/{} ({} bytes)", name, version, cold.len());
    println!("  SHA256:     {}", digest);
    println!("  Cold start: {:.4} ms", cold_ms);
    println!("  Warm start: {:.4} ms", warm_ms);
    println!("  Same object: {}", std::sync::Arc::ptr_eq(&cold, &warm));
    if warm_ms > 0.0 {
        println!("  Speedup:    {:.1}x", cold_ms / warm_ms);
    }

    Ok(())
}

/// Print resolved configuration
fn show_config(cfg: &ResolvedConfig) {
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Root:     {}", cfg.registry.root.display());
    println!("  Models:   {}", cfg.registry.models_dir().display());
    println!("  Metadata: {}", cfg.registry.metadata_path().display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metric() {
        assert_eq!(
            parse_metric("accuracy=0.925").unwrap(),
            ("accuracy".to_string(), 0.925)
        );
        assert!(parse_metric("accuracy=high").is_err());
        assert!(parse_metric("accuracy").is_err());
        assert!(parse_metric("=1.0").is_err());
    }

    #[test]
    fn test_parse_metric_rejects_non_finite() {
        assert!(parse_metric("latency=NaN").is_err());
        assert!(parse_metric("latency=inf").is_err());
        assert!(parse_metric("latency=-infinity").is_err());
        assert_eq!(
            parse_metric("latency=1e3").unwrap(),
            ("latency".to_string(), 1000.0)
        );
    }

    #[test]
    fn test_parse_meta_keeps_extra_equals() {
        assert_eq!(
            parse_meta("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
    }

    #[test]
    fn test_cli_parses_register() {
        let cli = Cli::try_parse_from([
            "edge-registry",
            "--root",
            "/tmp/reg",
            "register",
            "net",
            "v1",
            "a.bin",
            "--metric",
            "acc=0.9",
            "--meta",
            "author=x",
        ])
        .unwrap();

        assert_eq!(cli.root, Some(PathBuf::from("/tmp/reg")));
        match cli.command {
            Commands::Register {
                name,
                version,
                metrics,
                metadata,
                ..
            } => {
                assert_eq!(name, "net");
                assert_eq!(version, "v1");
                assert_eq!(metrics, vec![("acc".to_string(), 0.9)]);
                assert_eq!(metadata, vec![("author".to_string(), "x".to_string())]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
