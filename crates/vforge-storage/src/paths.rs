//! Artifact key layout under `jobs/{jobId}/`.

use vforge_models::JobId;

/// Keys for one job's artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    prefix: String,
}

impl JobPaths {
    pub fn new(job_id: &JobId) -> Self {
        Self {
            prefix: format!("jobs/{}", job_id.as_str()),
        }
    }

    /// `jobs/{jobId}/`
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `jobs/{jobId}/edl.json`
    pub fn edl_key(&self) -> String {
        format!("{}/edl.json", self.prefix)
    }

    /// `jobs/{jobId}/assets/{assetId}.{ext}`
    pub fn asset_key(&self, asset_id: &str, ext: &str) -> String {
        format!("{}/assets/{}.{}", self.prefix, asset_id, ext.trim_start_matches('.'))
    }

    /// `jobs/{jobId}/output/final.{format}`
    pub fn output_key(&self, format: &str) -> String {
        format!("{}/output/final.{}", self.prefix, format.trim_start_matches('.'))
    }
}
