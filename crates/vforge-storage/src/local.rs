//! Filesystem-backed object store.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::store::{validate_key, ObjectStore};

/// Configuration for [`LocalStore`].
#[derive(Debug, Clone)]
pub struct LocalStoreConfig {
    /// Directory under which keys are stored as relative paths
    pub root: PathBuf,
}

impl Default for LocalStoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./data"),
        }
    }
}

impl LocalStoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            root: std::env::var("LOCAL_STORE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| Self::default().root),
        }
    }
}

/// Object store rooted at a local directory. Each key maps to a file.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(config: LocalStoreConfig) -> Self {
        Self { root: config.root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    /// Write via a sibling temp file so readers never see a partial object.
    async fn write_atomic(path: &Path, data: &[u8]) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension(format!(
            "{}.part",
            path.extension().and_then(|e| e.to_str()).unwrap_or("obj")
        ));
        fs::write(&tmp, data).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        debug!("Writing {} bytes to {}", data.len(), path.display());
        Self::write_atomic(&path, &data)
            .await
            .map_err(|e| StorageError::upload_failed(format!("{}: {}", key, e)))
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::not_found(key)),
            Err(e) => Err(StorageError::download_failed(format!("{}: {}", key, e))),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.path_for(key)?;
        Ok(fs::try_exists(&path).await?)
    }

    async fn put_file(&self, path: &Path, key: &str, _content_type: &str) -> StorageResult<()> {
        let dest = self.path_for(key)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(path, &dest)
            .await
            .map_err(|e| StorageError::upload_failed(format!("{} -> {}: {}", path.display(), key, e)))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> LocalStore {
        LocalStore::new(LocalStoreConfig {
            root: dir.path().to_path_buf(),
        })
    }

    #[tokio::test]
    async fn test_put_get_exists() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        assert!(!store.exists("jobs/j1/edl.json").await.unwrap());
        store
            .put("jobs/j1/edl.json", b"{}".to_vec(), "application/json")
            .await
            .unwrap();
        assert!(store.exists("jobs/j1/edl.json").await.unwrap());
        assert_eq!(store.get("jobs/j1/edl.json").await.unwrap(), b"{}");
        assert!(dir.path().join("jobs/j1/edl.json").is_file());
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = store(&dir).get("jobs/none/edl.json").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let err = store(&dir)
            .put("../escape.txt", b"x".to_vec(), "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let src = dir.path().join("render.mp4");
        fs::write(&src, b"fake video").await.unwrap();

        store
            .put_file(&src, "jobs/j2/output/final.mp4", "video/mp4")
            .await
            .unwrap();
        let dest = dir.path().join("work/copy.mp4");
        store.get_to_file("jobs/j2/output/final.mp4", &dest).await.unwrap();
        assert_eq!(fs::read(&dest).await.unwrap(), b"fake video");
    }
}
