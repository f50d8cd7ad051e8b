//! Materializing asset sources as local files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use vforge_storage::ObjectStore;

use crate::error::{WorkerError, WorkerResult};

/// Where an asset or EDL lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation<'a> {
    /// `http://` or `https://` URL
    Http(&'a str),
    /// `file://` URL or absolute path, used in place
    File(PathBuf),
    /// Object-store key
    StoreKey(&'a str),
}

impl<'a> SourceLocation<'a> {
    pub fn parse(source: &'a str) -> WorkerResult<Self> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(WorkerError::download_failed("empty source"));
        }
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(Self::Http(trimmed));
        }
        if lower.starts_with("file://") {
            let path = url::Url::parse(trimmed)
                .ok()
                .and_then(|u| u.to_file_path().ok())
                .ok_or_else(|| WorkerError::download_failed(format!("invalid file URL '{}'", trimmed)))?;
            return Ok(Self::File(path));
        }
        if Path::new(trimmed).is_absolute() {
            return Ok(Self::File(PathBuf::from(trimmed)));
        }
        Ok(Self::StoreKey(trimmed))
    }
}

/// Fetches sources over HTTP, from the object store, or the local filesystem.
#[derive(Clone)]
pub struct AssetFetcher {
    store: Arc<dyn ObjectStore>,
    http: reqwest::Client,
}

impl AssetFetcher {
    pub fn new(store: Arc<dyn ObjectStore>, http: reqwest::Client) -> Self {
        Self { store, http }
    }

    /// Make `source` available locally.
    ///
    /// Remote sources are written to `dest`; local files are returned as-is.
    pub async fn fetch_to(&self, source: &str, dest: &Path) -> WorkerResult<PathBuf> {
        match SourceLocation::parse(source)? {
            SourceLocation::File(path) => {
                if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    return Err(WorkerError::download_failed(format!(
                        "local file not found: {}",
                        path.display()
                    )));
                }
                Ok(path)
            }
            SourceLocation::StoreKey(key) => {
                self.store.get_to_file(key, dest).await?;
                debug!(key, dest = %dest.display(), "Fetched asset from store");
                Ok(dest.to_path_buf())
            }
            SourceLocation::Http(url) => {
                self.download(url, dest).await?;
                debug!(url, dest = %dest.display(), "Downloaded asset");
                Ok(dest.to_path_buf())
            }
        }
    }

    /// Read `source` fully into memory.
    pub async fn fetch_bytes(&self, source: &str) -> WorkerResult<Vec<u8>> {
        match SourceLocation::parse(source)? {
            SourceLocation::File(path) => Ok(tokio::fs::read(&path).await?),
            SourceLocation::StoreKey(key) => Ok(self.store.get(key).await?),
            SourceLocation::Http(url) => {
                let response = self.http.get(url).send().await?.error_for_status()?;
                Ok(response.bytes().await?.to_vec())
            }
        }
    }

    async fn download(&self, url: &str, dest: &Path) -> WorkerResult<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(WorkerError::download_failed(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        let partial = dest.with_extension("part");
        let mut file = tokio::fs::File::create(&partial).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(bytes) => file.write_all(&bytes).await?,
                Err(e) => {
                    drop(file);
                    let _ = tokio::fs::remove_file(&partial).await;
                    return Err(e.into());
                }
            }
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&partial, dest).await?;
        Ok(())
    }
}
