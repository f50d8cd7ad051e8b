//! Hand-off of persisted EDLs to a render worker.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};
use vforge_models::JobId;

use crate::error::{QueueError, QueueResult};

/// Environment variable carrying the job id to the render worker.
pub const JOB_ID_ENV: &str = "JOB_ID";
/// Environment variable carrying the EDL location to the render worker.
pub const EDL_LOCATION_ENV: &str = "EDL_LOCATION";

/// Fire-and-forget submission of a render job.
///
/// Returns once the job has been handed off; the returned string identifies
/// the submission (stream message id, process id).
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    async fn dispatch(&self, job_id: &JobId, edl_location: &str) -> QueueResult<String>;

    fn name(&self) -> &'static str;
}

/// Spawns the render worker binary as a detached child process.
#[derive(Debug, Clone)]
pub struct ProcessDispatcher {
    program: PathBuf,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl ProcessDispatcher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Extra environment passed to every spawned worker.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &PathBuf {
        &self.program
    }
}

#[async_trait]
impl JobDispatcher for ProcessDispatcher {
    async fn dispatch(&self, job_id: &JobId, edl_location: &str) -> QueueResult<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .env(JOB_ID_ENV, job_id.as_str())
            .env(EDL_LOCATION_ENV, edl_location)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let mut child = cmd.spawn().map_err(|source| QueueError::SpawnFailed {
            program: self.program.display().to_string(),
            source,
        })?;
        let pid = child.id().map(|p| p.to_string()).unwrap_or_default();

        info!(job_id = %job_id, pid = %pid, "Spawned render worker");

        // Reap the child in the background so it never lingers as a zombie.
        let job = job_id.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => info!(job_id = %job, "Render worker exited"),
                Ok(status) => warn!(job_id = %job, code = ?status.code(), "Render worker failed"),
                Err(e) => warn!(job_id = %job, error = %e, "Failed to wait for render worker"),
            }
        });

        Ok(pid)
    }

    fn name(&self) -> &'static str {
        "process"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let dispatcher = ProcessDispatcher::new("/nonexistent/vforge-render");
        let err = dispatcher
            .dispatch(&JobId::from_string("j"), "jobs/j/edl.json")
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::SpawnFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_worker_receives_job_environment() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("seen.txt");

        let dispatcher = ProcessDispatcher::new("sh")
            .with_args(["-c", "printf '%s %s' \"$JOB_ID\" \"$EDL_LOCATION\" > \"$OUT_FILE\""])
            .with_env("OUT_FILE", out.display().to_string());

        let pid = dispatcher
            .dispatch(&JobId::from_string("job-7"), "jobs/job-7/edl.json")
            .await
            .unwrap();
        assert!(!pid.is_empty());

        let mut seen = String::new();
        for _ in 0..50 {
            if let Ok(content) = std::fs::read_to_string(&out) {
                if !content.is_empty() {
                    seen = content;
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(seen, "job-7 jobs/job-7/edl.json");
    }
}
