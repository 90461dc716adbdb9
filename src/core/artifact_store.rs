//! Isolated artifact storage.
//!
//! Every (name, version) gets its own directory under the models root:
//! `<models>/<name>/<version>/<original file name>`. Stored files are private
//! copies, independent of the caller's source file.

use std::path::{Path, PathBuf};

use filetime::FileTime;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncReadExt;
use tracing::debug;

use super::error::{RegistryError, Result};

/// Read buffer size used when hashing stored artifacts
const DIGEST_CHUNK_BYTES: usize = 64 * 1024;

/// Directory-per-version artifact store
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    /// Root of the name/version hierarchy
    models_dir: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `models_dir`
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    /// Get the models root directory
    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Directory holding the given version's artifact
    pub fn version_dir(&self, name: &str, version: &str) -> PathBuf {
        self.models_dir.join(name).join(version)
    }

    /// Copy `source` into the isolated directory for (name, version).
    ///
    /// Fails with `SourceNotFound` before touching the filesystem if the
    /// source is missing or not a regular file. Returns the absolute path
    /// of the stored copy.
    pub async fn store(&self, name: &str, version: &str, source: &Path) -> Result<PathBuf> {
        validate_identifier("name", name)?;
        validate_identifier("version", version)?;
        let source_meta = check_source(source).await?;

        let file_name = source
            .file_name()
            .ok_or_else(|| RegistryError::SourceNotFound(source.to_path_buf()))?;

        let target_dir = self.version_dir(name, version);
        fs::create_dir_all(&target_dir)
            .await
            .map_err(|e| RegistryError::storage(&target_dir, e))?;

        let target = target_dir.join(file_name);
        fs::copy(source, &target)
            .await
            .map_err(|e| RegistryError::storage(&target, e))?;

        // fs::copy keeps permission bits; carry the timestamps over as well
        let atime = FileTime::from_last_access_time(&source_meta);
        let mtime = FileTime::from_last_modification_time(&source_meta);
        filetime::set_file_times(&target, atime, mtime)
            .map_err(|e| RegistryError::storage(&target, e))?;

        let target = std::path::absolute(&target).map_err(|e| RegistryError::storage(&target, e))?;

        debug!(
            source = %source.display(),
            target = %target.display(),
            "Artifact copied into isolated storage"
        );

        Ok(target)
    }

    /// Size and hex SHA-256 of a stored artifact
    pub async fn digest(&self, path: &Path) -> Result<(u64, String)> {
        compute_file_digest(path)
            .await
            .map_err(|e| RegistryError::storage(path, e))
    }
}

/// Reject identifiers that would escape or collapse the directory hierarchy
pub fn validate_identifier(field: &'static str, value: &str) -> Result<()> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);

    if invalid {
        return Err(RegistryError::InvalidIdentifier {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// The source must be an existing regular file
async fn check_source(source: &Path) -> Result<std::fs::Metadata> {
    match fs::metadata(source).await {
        Ok(meta) if meta.is_file() => Ok(meta),
        _ => Err(RegistryError::SourceNotFound(source.to_path_buf())),
    }
}

/// Stream a file through SHA-256, returning (size, hex digest)
pub async fn compute_file_digest(path: &Path) -> Result<(u64, String), std::io::Error> {
    let mut file = fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; DIGEST_CHUNK_BYTES];
    let mut size = 0u64;

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }

    Ok((size, hex::encode(hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (ArtifactStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp.path().join("models"));
        (store, temp)
    }

    #[tokio::test]
    async fn test_store_copies_into_version_dir() {
        let (store, temp) = create_test_store();
        let source = temp.path().join("a.bin");
        fs::write(&source, b"weights").await.unwrap();

        let stored = store.store("net", "v1", &source).await.unwrap();

        assert!(stored.is_absolute());
        assert_eq!(stored, temp.path().join("models/net/v1/a.bin"));
        assert_eq!(fs::read(&stored).await.unwrap(), b"weights");
    }

    #[tokio::test]
    async fn test_copy_is_independent_of_source() {
        let (store, temp) = create_test_store();
        let source = temp.path().join("a.bin");
        fs::write(&source, b"original").await.unwrap();

        let stored = store.store("net", "v1", &source).await.unwrap();
        fs::write(&source, b"modified").await.unwrap();
        fs::remove_file(&source).await.unwrap();

        assert_eq!(fs::read(&stored).await.unwrap(), b"original");
    }

    #[tokio::test]
    async fn test_store_preserves_mtime() {
        let (store, temp) = create_test_store();
        let source = temp.path().join("a.bin");
        fs::write(&source, b"weights").await.unwrap();

        let old = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&source, old).unwrap();

        let stored = store.store("net", "v1", &source).await.unwrap();
        let meta = std::fs::metadata(&stored).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta), old);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_store_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (store, temp) = create_test_store();
        let source = temp.path().join("a.bin");
        fs::write(&source, b"weights").await.unwrap();
        std::fs::set_permissions(&source, std::fs::Permissions::from_mode(0o640)).unwrap();

        let stored = store.store("net", "v1", &source).await.unwrap();
        let mode = std::fs::metadata(&stored).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[tokio::test]
    async fn test_missing_source_creates_nothing() {
        let (store, temp) = create_test_store();
        let missing = temp.path().join("missing.bin");

        let err = store.store("net", "v1", &missing).await.unwrap_err();

        assert!(matches!(err, RegistryError::SourceNotFound(_)));
        assert!(!store.models_dir().join("net").exists());
    }

    #[tokio::test]
    async fn test_directory_source_is_rejected() {
        let (store, temp) = create_test_store();
        let err = store.store("net", "v1", temp.path()).await.unwrap_err();
        assert!(matches!(err, RegistryError::SourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_store_is_idempotent_on_existing_dir() {
        let (store, temp) = create_test_store();
        let source = temp.path().join("a.bin");
        fs::write(&source, b"weights").await.unwrap();

        fs::create_dir_all(store.version_dir("net", "v1")).await.unwrap();
        let stored = store.store("net", "v1", &source).await.unwrap();
        assert!(stored.exists());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("name", "MobileNetV2_Quantized").is_ok());
        assert!(validate_identifier("version", "v1.2.0").is_ok());

        for bad in ["", ".", "..", "a/b", "a\\b", "nul\0"] {
            let err = validate_identifier("name", bad).unwrap_err();
            assert!(matches!(err, RegistryError::InvalidIdentifier { field: "name", .. }));
        }
    }

    #[tokio::test]
    async fn test_digest() {
        let (store, temp) = create_test_store();
        let path = temp.path().join("hello.txt");
        fs::write(&path, b"hello").await.unwrap();

        let (size, digest) = store.digest(&path).await.unwrap();
        assert_eq!(size, 5);
        assert_eq!(
            digest,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
