//! Configuration for registry paths.
//!
//! The library only ever uses a `RegistryConfig` handed to it by the caller.
//! The CLI resolves one from these sources (highest priority first):
//! 1. `--root` flag
//! 2. Environment variable (EDGE_REGISTRY_HOME)
//! 3. Config file (.edge-registry/config.yaml)
//! 4. Defaults (~/.edge-registry)
//!
//! Config file discovery:
//! - Searches the current directory and parents for .edge-registry/config.yaml
//! - A relative `root` is resolved against the directory containing .edge-registry/

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Environment variable overriding the registry root
pub const HOME_ENV: &str = "EDGE_REGISTRY_HOME";

/// Directory (under a project) holding the config file
pub const CONFIG_DIR: &str = ".edge-registry";

/// Default subdirectory for stored artifacts
pub const DEFAULT_MODELS_DIR: &str = "models";

/// Default metadata document file name
pub const DEFAULT_METADATA_FILE: &str = "registry.json";

/// Storage layout of one registry root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Root storage directory
    pub root: PathBuf,
    /// Subdirectory of `root` holding name/version directories
    pub models_dir_name: String,
    /// File name of the metadata document at `root`
    pub metadata_file: String,
}

impl RegistryConfig {
    /// Default layout under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            models_dir_name: DEFAULT_MODELS_DIR.to_string(),
            metadata_file: DEFAULT_METADATA_FILE.to_string(),
        }
    }

    /// Directory holding all stored artifacts
    pub fn models_dir(&self) -> PathBuf {
        self.root.join(&self.models_dir_name)
    }

    /// Canonical metadata document path
    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(&self.metadata_file)
    }
}

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    /// Registry root (relative to the project directory)
    pub root: Option<String>,
    /// Models subdirectory name
    pub models_dir: Option<String>,
    /// Metadata document file name
    pub metadata_file: Option<String>,
}

/// Resolved configuration plus where it came from
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Storage layout
    pub registry: RegistryConfig,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_relative(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Default root (~/.edge-registry)
fn default_root() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(CONFIG_DIR))
}

/// Resolve configuration from all sources.
///
/// `root_flag` wins, then `env_root`, then the first config file found from
/// `cwd` upwards, then the default under the home directory.
pub fn resolve(
    root_flag: Option<PathBuf>,
    env_root: Option<PathBuf>,
    cwd: &Path,
) -> Result<ResolvedConfig> {
    let config_file = find_config_file(cwd);
    let parsed = config_file.as_deref().map(load_config_file).transpose()?;
    let storage = parsed.map(|c| c.storage).unwrap_or_default();

    let file_root = match (&config_file, &storage.root) {
        (Some(config_path), Some(root)) => {
            // Project directory is the parent of .edge-registry/
            let base_dir = config_path
                .parent()
                .and_then(|p| p.parent())
                .unwrap_or(Path::new("."));
            Some(resolve_relative(base_dir, root))
        }
        _ => None,
    };

    let root = match root_flag.or(env_root).or(file_root) {
        Some(root) => root,
        None => default_root()?,
    };

    let mut registry = RegistryConfig::new(root);
    if let Some(models_dir) = storage.models_dir {
        registry.models_dir_name = models_dir;
    }
    if let Some(metadata_file) = storage.metadata_file {
        registry.metadata_file = metadata_file;
    }

    Ok(ResolvedConfig {
        registry,
        config_file,
    })
}

/// Resolve configuration for the current process (env + working directory)
pub fn load_config(root_flag: Option<PathBuf>) -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let env_root = std::env::var_os(HOME_ENV).map(PathBuf::from);
    resolve(root_flag, env_root, &cwd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let config_dir = dir.join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();
        let config_path = config_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "{}", body).unwrap();
        config_path
    }

    #[test]
    fn test_registry_config_layout() {
        let config = RegistryConfig::new("/data");
        assert_eq!(config.models_dir(), PathBuf::from("/data/models"));
        assert_eq!(config.metadata_path(), PathBuf::from("/data/registry.json"));
    }

    #[test]
    fn test_flag_beats_env() {
        let temp = TempDir::new().unwrap();
        let resolved = resolve(
            Some(PathBuf::from("/from/flag")),
            Some(PathBuf::from("/from/env")),
            temp.path(),
        )
        .unwrap();

        assert_eq!(resolved.registry.root, PathBuf::from("/from/flag"));
    }

    #[test]
    fn test_env_used_without_flag() {
        let temp = TempDir::new().unwrap();
        let resolved = resolve(None, Some(PathBuf::from("/from/env")), temp.path()).unwrap();
        assert_eq!(resolved.registry.root, PathBuf::from("/from/env"));
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let config_path = write_config(
            temp.path(),
            r#"
version: "1.0"
storage:
  root: ./store
  models_dir: artifacts
  metadata_file: index.json
"#,
        );

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.storage.root, Some("./store".to_string()));
        assert_eq!(config.storage.models_dir, Some("artifacts".to_string()));
    }

    #[test]
    fn test_config_file_discovered_from_subdirectory() {
        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            r#"
version: "1.0"
storage:
  root: store
  metadata_file: index.json
"#,
        );
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let resolved = resolve(None, None, &nested).unwrap();

        assert_eq!(resolved.registry.root, temp.path().join("store"));
        assert_eq!(resolved.registry.models_dir_name, DEFAULT_MODELS_DIR);
        assert_eq!(resolved.registry.metadata_file, "index.json");
        assert!(resolved.config_file.is_some());
    }

    #[test]
    fn test_file_layout_applies_under_flag_root() {
        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            r#"
version: "1.0"
storage:
  models_dir: artifacts
"#,
        );

        let resolved = resolve(Some(PathBuf::from("/flag")), None, temp.path()).unwrap();
        assert_eq!(resolved.registry.models_dir(), PathBuf::from("/flag/artifacts"));
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_relative(&base, "./store"),
            PathBuf::from("/home/user/project/./store")
        );
        assert_eq!(
            resolve_relative(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
