//! Model-level error types.

use thiserror::Error;

/// Result type for model validation.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while validating requests and EDL documents.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid EDL: {0}")]
    InvalidEdl(String),

    #[error("Clip {clip_id} references unknown asset {asset_id}")]
    UnknownAsset { clip_id: String, asset_id: String },

    #[error("Track {track} is not contiguous at clip {clip_id}: expected start {expected:.3}s, found {found:.3}s")]
    NonContiguous {
        track: String,
        clip_id: String,
        expected: f64,
        found: f64,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn invalid_edl(msg: impl Into<String>) -> Self {
        Self::InvalidEdl(msg.into())
    }
}
