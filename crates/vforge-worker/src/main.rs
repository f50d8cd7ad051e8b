//! Single-job render worker.
//!
//! Reads `JOB_ID` and `EDL_LOCATION`, renders the EDL and exits 0 on
//! success or 1 on any fatal failure.

use std::sync::Arc;

use tracing::{error, info};

use vforge_media::FfmpegRunner;
use vforge_models::JobId;
use vforge_queue::{EDL_LOCATION_ENV, JOB_ID_ENV};
use vforge_storage::StorageConfig;
use vforge_worker::{init_tracing, metrics, FfmpegBackend, RenderPipeline, WorkerConfig};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    if rustls::crypto::ring::default_provider().install_default().is_err() {
        eprintln!("rustls crypto provider already installed");
    }

    dotenvy::dotenv().ok();

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);
    init_tracing(use_json);

    if let Err(e) = run().await {
        error!("Render failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env()?;
    if let Some(addr) = config.metrics_addr {
        metrics::init_metrics(addr)?;
    }

    let job_id = std::env::var(JOB_ID_ENV)
        .map(JobId::from_string)
        .map_err(|_| anyhow::anyhow!("missing required env var {}", JOB_ID_ENV))?;
    let edl_location = std::env::var(EDL_LOCATION_ENV)
        .map_err(|_| anyhow::anyhow!("missing required env var {}", EDL_LOCATION_ENV))?;

    info!(job_id = %job_id, edl = %edl_location, "Starting vforge-render");

    let store = StorageConfig::from_env()?.connect();
    let runner = FfmpegRunner::new().with_optional_timeout(config.ffmpeg_timeout_secs);
    let pipeline = RenderPipeline::new(
        Arc::new(FfmpegBackend::new(runner)),
        store,
        reqwest::Client::new(),
        &config.work_dir,
    );

    let outcome = pipeline.run_location(&job_id, &edl_location).await?;
    info!(
        job_id = %job_id,
        output_key = %outcome.output_key,
        rendered = outcome.rendered_clips,
        skipped = outcome.skipped_clips.len(),
        audio = outcome.audio_mixed,
        "Render finished"
    );
    Ok(())
}
