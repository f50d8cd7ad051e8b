//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// Bad request or malformed EDL, rejected before any work.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Script generation failed: {0}")]
    ScriptFailed(String),

    /// Every clip was skipped; there is nothing to render.
    #[error("No renderable clips: {0}")]
    NoRenderableClips(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model error: {0}")]
    Model(#[from] vforge_models::ModelError),

    #[error("Storage error: {0}")]
    Storage(#[from] vforge_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] vforge_media::MediaError),

    #[error("Provider error: {0}")]
    Provider(#[from] vforge_providers::ProviderError),

    #[error("Queue error: {0}")]
    Queue(#[from] vforge_queue::QueueError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::DownloadFailed(msg.into())
    }

    /// Whether the error rejected input rather than failing mid-job.
    pub fn is_validation(&self) -> bool {
        matches!(self, WorkerError::Validation(_))
    }
}
