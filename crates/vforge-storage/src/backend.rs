//! Storage backend selection.

use std::sync::Arc;
use tracing::info;

use crate::client::{R2Client, R2Config};
use crate::error::{StorageError, StorageResult};
use crate::local::{LocalStore, LocalStoreConfig};
use crate::store::ObjectStore;

/// Which object store a process uses.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    Local(LocalStoreConfig),
    R2(R2Config),
}

impl StorageConfig {
    /// Read `STORAGE_BACKEND` (`local` by default, or `r2`) and the matching settings.
    pub fn from_env() -> StorageResult<Self> {
        let backend = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".to_string());
        match backend.trim().to_ascii_lowercase().as_str() {
            "local" | "fs" => Ok(Self::Local(LocalStoreConfig::from_env())),
            "r2" | "s3" => Ok(Self::R2(R2Config::from_env()?)),
            other => Err(StorageError::config_error(format!(
                "unknown STORAGE_BACKEND '{}' (expected local or r2)",
                other
            ))),
        }
    }

    /// Build the configured store.
    pub fn connect(self) -> Arc<dyn ObjectStore> {
        match self {
            Self::Local(config) => {
                info!(root = %config.root.display(), "Using local object store");
                Arc::new(LocalStore::new(config))
            }
            Self::R2(config) => {
                info!(bucket = %config.bucket_name, "Using R2 object store");
                Arc::new(R2Client::new(config))
            }
        }
    }
}
