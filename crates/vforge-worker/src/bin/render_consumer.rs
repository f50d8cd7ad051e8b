//! Render worker that consumes the Redis render stream.

use std::sync::Arc;

use tracing::{error, info};

use vforge_media::FfmpegRunner;
use vforge_queue::{QueueConfig, RenderQueue};
use vforge_storage::StorageConfig;
use vforge_worker::{init_tracing, metrics, FfmpegBackend, RenderConsumer, RenderPipeline, WorkerConfig};

#[tokio::main]
async fn main() {
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        eprintln!("rustls crypto provider already installed");
    }

    dotenvy::dotenv().ok();

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);
    init_tracing(use_json);

    info!("Starting vforge-render-consumer");

    let consumer = match build().await {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Failed to start render consumer: {:#}", e);
            std::process::exit(1);
        }
    };

    let signal_consumer = Arc::clone(&consumer);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        signal_consumer.shutdown();
    });

    if let Err(e) = consumer.run().await {
        error!("Consumer error: {}", e);
        std::process::exit(1);
    }

    info!("vforge-render-consumer shutdown complete");
}

async fn build() -> anyhow::Result<RenderConsumer> {
    let config = WorkerConfig::from_env()?;
    info!("Worker config: {:?}", config);
    if let Some(addr) = config.metrics_addr {
        metrics::init_metrics(addr)?;
    }

    let queue = RenderQueue::new(QueueConfig::from_env())?;
    let store = StorageConfig::from_env()?.connect();
    let runner = FfmpegRunner::new().with_optional_timeout(config.ffmpeg_timeout_secs);
    let pipeline = RenderPipeline::new(
        Arc::new(FfmpegBackend::new(runner)),
        store,
        reqwest::Client::new(),
        &config.work_dir,
    );

    Ok(RenderConsumer::new(queue, pipeline, config.max_concurrent_jobs))
}
