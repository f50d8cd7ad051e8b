//! Topic-to-EDL generation.
//!
//! Reads `VIDEO_TOPIC` and `VIDEO_DURATION`, generates the script and
//! assets, persists the EDL, dispatches a render and prints a JSON summary.

use std::sync::Arc;

use serde_json::json;
use tracing::{error, info};

use vforge_models::GenerateRequest;
use vforge_providers::{GeminiImageClient, GeminiScriptClient, GoogleTtsClient, PexelsClient, ProviderConfig};
use vforge_queue::{JobDispatcher, ProcessDispatcher, QueueConfig, RenderQueue};
use vforge_storage::StorageConfig;
use vforge_worker::{init_tracing, metrics, AssetFanout, DispatchMode, DispatchStatus, Generator, WorkerConfig};

const DEFAULT_DURATION_SECS: f64 = 60.0;

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

    if let Err(e) = run().await {
        error!("Generation failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env()?;
    if let Some(addr) = config.metrics_addr {
        metrics::init_metrics(addr)?;
    }

    let topic = std::env::var("VIDEO_TOPIC").map_err(|_| anyhow::anyhow!("missing required env var VIDEO_TOPIC"))?;
    let duration = match std::env::var("VIDEO_DURATION") {
        Ok(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|e| anyhow::anyhow!("invalid VIDEO_DURATION '{}': {}", raw, e))?,
        Err(_) => DEFAULT_DURATION_SECS,
    };

    let providers = ProviderConfig::from_env();
    let http = providers.http_client()?;
    let store = StorageConfig::from_env()?.connect();

    let dispatcher: Arc<dyn JobDispatcher> = match config.dispatch_mode {
        DispatchMode::Process => Arc::new(ProcessDispatcher::new(&config.render_program)),
        DispatchMode::Redis => {
            let queue = RenderQueue::new(QueueConfig::from_env())?;
            queue.init().await?;
            Arc::new(queue)
        }
    };
    info!(dispatcher = dispatcher.name(), "Starting vforge-generate");

    let fanout = AssetFanout::new(
        Arc::new(GeminiImageClient::new(http.clone(), providers.gemini.clone())),
        Arc::new(GoogleTtsClient::new(http.clone(), providers.tts.clone())),
        Arc::new(PexelsClient::new(http.clone(), providers.pexels.clone())),
        store.clone(),
        providers.tts.voice.clone(),
    );
    let generator = Generator::new(
        Arc::new(GeminiScriptClient::new(http, providers.gemini.clone())),
        fanout,
        store,
        dispatcher,
    );

    let outcome = generator
        .generate_video(GenerateRequest::new(topic, duration))
        .await?;

    let dispatch = match &outcome.dispatch {
        DispatchStatus::Dispatched { dispatcher, handle } => {
            json!({ "status": "dispatched", "dispatcher": dispatcher, "handle": handle })
        }
        DispatchStatus::Failed(reason) => json!({ "status": "failed", "reason": reason }),
    };
    let summary = json!({
        "jobId": outcome.job_id.as_str(),
        "edlKey": outcome.edl_key,
        "title": outcome.edl.metadata.title,
        "duration": outcome.edl.timeline.duration,
        "clips": outcome.edl.video_clips().len(),
        "droppedScenes": outcome.dropped_scenes.iter().map(|d| d.scene_id.as_str()).collect::<Vec<_>>(),
        "failedSlots": outcome.failed_slots.iter().map(|f| f.key.as_str()).collect::<Vec<_>>(),
        "dispatch": dispatch,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
