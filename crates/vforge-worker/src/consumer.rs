//! Render queue consumer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use vforge_models::JobId;
use vforge_queue::{RenderJob, RenderQueue};

use crate::error::{WorkerError, WorkerResult};
use crate::render::RenderPipeline;

/// Pulls render jobs from the Redis stream and runs them in-process.
///
/// Failed jobs are recorded on the failed stream and not retried.
pub struct RenderConsumer {
    queue: Arc<RenderQueue>,
    pipeline: Arc<RenderPipeline>,
    max_concurrent_jobs: usize,
    job_semaphore: Arc<Semaphore>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl RenderConsumer {
    pub fn new(queue: RenderQueue, pipeline: RenderPipeline, max_concurrent_jobs: usize) -> Self {
        let max_concurrent_jobs = max_concurrent_jobs.max(1);
        let (shutdown, _) = tokio::sync::watch::channel(false);

        Self {
            queue: Arc::new(queue),
            pipeline: Arc::new(pipeline),
            max_concurrent_jobs,
            job_semaphore: Arc::new(Semaphore::new(max_concurrent_jobs)),
            shutdown,
            consumer_name: format!("renderer-{}", Uuid::new_v4()),
        }
    }

    pub fn consumer_name(&self) -> &str {
        &self.consumer_name
    }

    /// Consume until [`shutdown`](Self::shutdown) is called, then drain in-flight jobs.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting render consumer '{}' with {} max concurrent jobs",
            self.consumer_name, self.max_concurrent_jobs
        );

        self.queue.init().await?;
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping consumer");
                        break;
                    }
                }
                result = self.consume_jobs() => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        info!("Waiting for in-flight renders to complete...");
        if tokio::time::timeout(Duration::from_secs(300), self.wait_for_jobs())
            .await
            .is_err()
        {
            warn!("In-flight renders still running at shutdown");
        }

        info!("Render consumer stopped");
        Ok(())
    }

    async fn consume_jobs(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let jobs = self.queue.consume(&self.consumer_name, 1000, available).await?;
        if jobs.is_empty() {
            return Ok(());
        }
        debug!("Consumed {} render jobs", jobs.len());

        for (message_id, job) in jobs {
            let permit = self
                .job_semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::config_error("job semaphore closed"))?;
            let queue = Arc::clone(&self.queue);
            let pipeline = Arc::clone(&self.pipeline);

            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_job(&queue, &pipeline, &message_id, &job).await;
            });
        }

        Ok(())
    }

    async fn execute_job(queue: &RenderQueue, pipeline: &RenderPipeline, message_id: &str, job: &RenderJob) {
        let job_id: &JobId = &job.job_id;
        info!(job_id = %job_id, edl = %job.edl_location, "Executing render job");

        match pipeline.run_location(job_id, &job.edl_location).await {
            Ok(outcome) => {
                info!(job_id = %job_id, output_key = %outcome.output_key, "Render job completed");
                if let Err(e) = queue.ack(message_id).await {
                    error!("Failed to ack job {}: {}", job_id, e);
                }
            }
            Err(e) => {
                error!("Render job {} failed: {}", job_id, e);
                if let Err(record_err) = queue.fail(message_id, job, &e.to_string()).await {
                    error!("Failed to record failed job {}: {}", job_id, record_err);
                }
            }
        }

        // Either way the job may be dispatched again.
        if let Err(e) = queue.clear_dedup(job).await {
            warn!("Failed to clear dedup key for job {}: {}", job_id, e);
        }
    }

    async fn wait_for_jobs(&self) {
        while self.job_semaphore.available_permits() < self.max_concurrent_jobs {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::FfmpegBackend;
    use vforge_queue::QueueConfig;
    use vforge_storage::{LocalStore, LocalStoreConfig};

    fn consumer(max_jobs: usize) -> RenderConsumer {
        let queue = RenderQueue::new(QueueConfig::default()).unwrap();
        let store = Arc::new(LocalStore::new(LocalStoreConfig {
            root: std::env::temp_dir(),
        }));
        let pipeline = RenderPipeline::new(
            Arc::new(FfmpegBackend::default()),
            store,
            reqwest::Client::new(),
            std::env::temp_dir(),
        );
        RenderConsumer::new(queue, pipeline, max_jobs)
    }

    #[test]
    fn test_consumer_names_are_unique() {
        let a = consumer(1);
        let b = consumer(1);
        assert!(a.consumer_name().starts_with("renderer-"));
        assert_ne!(a.consumer_name(), b.consumer_name());
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_clamped() {
        let c = consumer(0);
        assert_eq!(c.job_semaphore.available_permits(), 1);
        // No jobs in flight, so draining returns immediately.
        tokio::time::timeout(Duration::from_secs(1), c.wait_for_jobs())
            .await
            .unwrap();
    }
}
