//! Job identity and coarse status.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a generation/render job.
///
/// The job id is the only correlation key across stages; it names the
/// `jobs/{jobId}/...` prefix in the object store and the worker's scratch dir.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job status derived purely from artifact existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Final output exists.
    Completed,
    /// EDL exists but no output yet.
    Rendering,
    /// Neither EDL nor output exists.
    NotFound,
}

impl JobStatus {
    /// Derive status from the two artifact existence checks.
    pub fn from_artifacts(edl_exists: bool, output_exists: bool) -> Self {
        if output_exists {
            JobStatus::Completed
        } else if edl_exists {
            JobStatus::Rendering
        } else {
            JobStatus::NotFound
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Completed => "completed",
            JobStatus::Rendering => "rendering",
            JobStatus::NotFound => "not_found",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_roundtrip() {
        let id = JobId::from_string("job-123");
        assert_eq!(id.as_str(), "job-123");
        assert_eq!(id.to_string(), "job-123");
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn test_status_from_artifacts() {
        assert_eq!(JobStatus::from_artifacts(true, true), JobStatus::Completed);
        assert_eq!(JobStatus::from_artifacts(false, true), JobStatus::Completed);
        assert_eq!(JobStatus::from_artifacts(true, false), JobStatus::Rendering);
        assert_eq!(JobStatus::from_artifacts(false, false), JobStatus::NotFound);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::NotFound).unwrap();
        assert_eq!(json, "\"not_found\"");
    }
}
