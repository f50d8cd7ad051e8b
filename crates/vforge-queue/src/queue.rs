//! Render queue using Redis Streams.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::{debug, info, warn};
use vforge_models::JobId;

use crate::dispatcher::JobDispatcher;
use crate::error::{QueueError, QueueResult};
use crate::job::RenderJob;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream name for render jobs
    pub stream_name: String,
    /// Consumer group name
    pub consumer_group: String,
    /// Stream receiving jobs whose render failed
    pub failed_stream_name: String,
    /// How long a dispatched job id is remembered for deduplication
    pub dedup_ttl_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            stream_name: "vforge:render".to_string(),
            consumer_group: "vforge:renderers".to_string(),
            failed_stream_name: "vforge:render:failed".to_string(),
            dedup_ttl_secs: 3600,
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: std::env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            stream_name: std::env::var("QUEUE_STREAM").unwrap_or(defaults.stream_name),
            consumer_group: std::env::var("QUEUE_CONSUMER_GROUP").unwrap_or(defaults.consumer_group),
            failed_stream_name: std::env::var("QUEUE_FAILED_STREAM").unwrap_or(defaults.failed_stream_name),
            dedup_ttl_secs: std::env::var("QUEUE_DEDUP_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.dedup_ttl_secs),
        }
    }
}

/// Decode the `job` field of a stream entry.
///
/// `None` when the entry has no job field at all.
pub fn decode_entry(map: &HashMap<String, redis::Value>) -> Option<QueueResult<RenderJob>> {
    let payload = match map.get("job")? {
        redis::Value::BulkString(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        redis::Value::SimpleString(s) => s.clone(),
        _ => return None,
    };
    Some(serde_json::from_str(&payload).map_err(QueueError::from))
}

/// Redis Streams render queue.
pub struct RenderQueue {
    client: redis::Client,
    config: QueueConfig,
}

impl RenderQueue {
    /// Create a new render queue.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    async fn connection(&self) -> QueueResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::connection_failed(e.to_string()))
    }

    /// Initialize the queue (create consumer group if not exists).
    pub async fn init(&self) -> QueueResult<()> {
        let mut conn = self.connection().await?;

        let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => info!("Created consumer group: {}", self.config.consumer_group),
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!("Consumer group already exists: {}", self.config.consumer_group);
            }
            Err(e) => return Err(QueueError::Redis(e)),
        }

        Ok(())
    }

    /// Enqueue a render job, rejecting a job id seen within the dedup window.
    pub async fn enqueue(&self, job: &RenderJob) -> QueueResult<String> {
        let mut conn = self.connection().await?;

        let payload = serde_json::to_string(job)?;
        let idempotency_key = job.idempotency_key();
        let dedup_key = format!("vforge:dedup:{}", idempotency_key);

        let claimed: Option<String> = redis::cmd("SET")
            .arg(&dedup_key)
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(self.config.dedup_ttl_secs)
            .query_async(&mut conn)
            .await?;
        if claimed.is_none() {
            warn!("Duplicate job rejected: {}", idempotency_key);
            return Err(QueueError::Duplicate(idempotency_key));
        }

        let message_id: String = match redis::cmd("XADD")
            .arg(&self.config.stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("key")
            .arg(&idempotency_key)
            .query_async(&mut conn)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                // Release the key so the caller can retry dispatch.
                conn.del::<_, ()>(&dedup_key).await.ok();
                return Err(QueueError::enqueue_failed(e.to_string()));
            }
        };

        info!(job_id = %job.job_id, message_id = %message_id, "Enqueued render job");
        Ok(message_id)
    }

    /// Read new jobs for this consumer, blocking up to `block_ms`.
    pub async fn consume(
        &self,
        consumer_name: &str,
        block_ms: u64,
        count: usize,
    ) -> QueueResult<Vec<(String, RenderJob)>> {
        let mut conn = self.connection().await?;

        let result: Option<redis::streams::StreamReadReply> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("BLOCK")
            .arg(block_ms)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        let mut jobs = Vec::new();
        for stream_key in result.map(|r| r.keys).unwrap_or_default() {
            for entry in stream_key.ids {
                match decode_entry(&entry.map) {
                    Some(Ok(job)) => {
                        debug!(job_id = %job.job_id, "Consumed render job");
                        jobs.push((entry.id, job));
                    }
                    Some(Err(e)) => {
                        warn!("Failed to parse job payload: {}", e);
                        // Malformed entries would otherwise be redelivered forever.
                        self.ack(&entry.id).await.ok();
                    }
                    None => {
                        warn!(message_id = %entry.id, "Stream entry without job payload");
                        self.ack(&entry.id).await.ok();
                    }
                }
            }
        }

        Ok(jobs)
    }

    /// Acknowledge and delete a processed message.
    pub async fn ack(&self, message_id: &str) -> QueueResult<()> {
        let mut conn = self.connection().await?;

        redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        redis::cmd("XDEL")
            .arg(&self.config.stream_name)
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        debug!("Acknowledged job: {}", message_id);
        Ok(())
    }

    /// Record a failed render on the failed stream and acknowledge it.
    ///
    /// Jobs are not retried; the record lets an operator re-dispatch.
    pub async fn fail(&self, message_id: &str, job: &RenderJob, error: &str) -> QueueResult<()> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(job)?;

        redis::cmd("XADD")
            .arg(&self.config.failed_stream_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .arg("error")
            .arg(error)
            .arg("original_id")
            .arg(message_id)
            .query_async::<()>(&mut conn)
            .await?;

        self.ack(message_id).await?;
        warn!(job_id = %job.job_id, "Recorded failed render: {}", error);
        Ok(())
    }

    /// Forget a job's dedup key so it can be dispatched again.
    pub async fn clear_dedup(&self, job: &RenderJob) -> QueueResult<()> {
        let mut conn = self.connection().await?;
        let dedup_key = format!("vforge:dedup:{}", job.idempotency_key());
        conn.del::<_, ()>(&dedup_key).await?;
        Ok(())
    }

    /// Pending stream length.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.connection().await?;
        let len: u64 = conn.xlen(&self.config.stream_name).await?;
        Ok(len)
    }
}

#[async_trait]
impl JobDispatcher for RenderQueue {
    async fn dispatch(&self, job_id: &JobId, edl_location: &str) -> QueueResult<String> {
        self.enqueue(&RenderJob::new(job_id.clone(), edl_location)).await
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
