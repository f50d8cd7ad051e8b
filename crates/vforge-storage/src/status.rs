//! Job status derived from artifact existence.

use vforge_models::{JobId, JobStatus};

use crate::error::StorageResult;
use crate::paths::JobPaths;
use crate::store::ObjectStore;

/// Status of `job_id` whose final output uses container `format`.
///
/// Output present means completed; EDL only means rendering; neither means
/// not found. No separate status record is kept.
pub async fn job_status(store: &dyn ObjectStore, job_id: &JobId, format: &str) -> StorageResult<JobStatus> {
    let paths = JobPaths::new(job_id);
    if store.exists(&paths.output_key(format)).await? {
        return Ok(JobStatus::Completed);
    }
    let edl_exists = store.exists(&paths.edl_key()).await?;
    Ok(JobStatus::from_artifacts(edl_exists, false))
}
