//! Render job message.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vforge_models::JobId;

/// Request to render one persisted EDL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderJob {
    /// Job the EDL belongs to
    pub job_id: JobId,
    /// Object store key (or URL) of the EDL document
    pub edl_location: String,
    /// When the job was dispatched
    pub created_at: DateTime<Utc>,
}

impl RenderJob {
    pub fn new(job_id: JobId, edl_location: impl Into<String>) -> Self {
        Self {
            job_id,
            edl_location: edl_location.into(),
            created_at: Utc::now(),
        }
    }

    /// Generate idempotency key for deduplication.
    pub fn idempotency_key(&self) -> String {
        format!("render:{}", self.job_id)
    }
}
