//! Topic-to-EDL orchestration.

use std::sync::Arc;

use tracing::{info, warn, Instrument};

use vforge_models::{DroppedScene, Edl, EdlBuilder, GenerateRequest, JobId};
use vforge_providers::ScriptProvider;
use vforge_queue::JobDispatcher;
use vforge_storage::{JobPaths, ObjectStore};

use crate::error::{WorkerError, WorkerResult};
use crate::fanout::{AssetFanout, SlotFailure};
use crate::logging::JobLogger;
use crate::metrics;

/// Outcome of handing the EDL to a render worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchStatus {
    Dispatched { dispatcher: String, handle: String },
    /// The EDL is persisted but no worker was started; dispatch can be retried.
    Failed(String),
}

impl DispatchStatus {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, DispatchStatus::Dispatched { .. })
    }
}

/// Result of a generation run. A failed dispatch is degraded, not an error.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub job_id: JobId,
    pub edl_key: String,
    pub edl: Edl,
    pub dropped_scenes: Vec<DroppedScene>,
    pub failed_slots: Vec<SlotFailure>,
    pub dispatch: DispatchStatus,
}

/// Script, fan-out, EDL build, persist, dispatch.
pub struct Generator {
    script: Arc<dyn ScriptProvider>,
    fanout: AssetFanout,
    store: Arc<dyn ObjectStore>,
    dispatcher: Arc<dyn JobDispatcher>,
}

impl Generator {
    pub fn new(
        script: Arc<dyn ScriptProvider>,
        fanout: AssetFanout,
        store: Arc<dyn ObjectStore>,
        dispatcher: Arc<dyn JobDispatcher>,
    ) -> Self {
        Self {
            script,
            fanout,
            store,
            dispatcher,
        }
    }

    /// Turn a topic into a persisted EDL and dispatch it for rendering.
    ///
    /// Fails only on an invalid request, a script failure, a timeline with
    /// no clips, an EDL the renderer would reject, or when the EDL cannot be
    /// persisted.
    pub async fn generate_video(&self, request: GenerateRequest) -> WorkerResult<GenerationOutcome> {
        let request = request
            .validated()
            .map_err(|e| WorkerError::validation(e.to_string()))?;

        let job_id = JobId::new();
        let logger = JobLogger::new(&job_id, "generate");
        let span = logger.create_span();
        self.run(request, job_id, logger).instrument(span).await
    }

    async fn run(
        &self,
        request: GenerateRequest,
        job_id: JobId,
        logger: JobLogger,
    ) -> WorkerResult<GenerationOutcome> {
        logger.log_start(&format!("topic '{}', target {:.0}s", request.topic, request.target_duration));

        let script = match self.script.generate(&request.topic, request.target_duration).await {
            Ok(script) => script,
            Err(e) => {
                metrics::record_job_failed("generate");
                logger.log_error(&format!("script generation failed: {}", e));
                return Err(WorkerError::ScriptFailed(e.to_string()));
            }
        };
        logger.log_progress(&format!("script '{}' with {} scenes", script.title, script.scenes.len()));

        let report = self.fanout.run(&job_id, &script).await;

        let build = EdlBuilder::new(request.output.clone()).build(&script, &report.assets);
        if !build.dropped_scenes.is_empty() {
            metrics::record_dropped_scenes(build.dropped_scenes.len());
            logger.log_warning(&format!("{} scenes dropped for missing assets", build.dropped_scenes.len()));
        }
        if build.edl.video_clips().is_empty() {
            metrics::record_job_failed("generate");
            return Err(WorkerError::NoRenderableClips(format!(
                "all {} scenes lacked assets",
                script.scenes.len()
            )));
        }

        if let Err(e) = build.edl.validate() {
            metrics::record_job_failed("generate");
            logger.log_error(&format!("built EDL is not renderable: {}", e));
            return Err(WorkerError::validation(e.to_string()));
        }

        let edl_key = JobPaths::new(&job_id).edl_key();
        self.store
            .put(&edl_key, build.edl.to_json_pretty()?, "application/json")
            .await?;
        info!(
            job_id = %job_id,
            edl_key = %edl_key,
            clips = build.edl.video_clips().len(),
            duration = build.edl.timeline.duration,
            "EDL persisted"
        );

        let dispatch = match self.dispatcher.dispatch(&job_id, &edl_key).await {
            Ok(handle) => DispatchStatus::Dispatched {
                dispatcher: self.dispatcher.name().to_string(),
                handle,
            },
            Err(e) => {
                metrics::record_dispatch_failure(self.dispatcher.name());
                warn!(job_id = %job_id, dispatcher = self.dispatcher.name(), error = %e, "Dispatch failed");
                DispatchStatus::Failed(e.to_string())
            }
        };

        metrics::record_job_completed("generate");
        logger.log_completion(&format!("EDL at {}", edl_key));

        Ok(GenerationOutcome {
            job_id,
            edl_key,
            edl: build.edl,
            dropped_scenes: build.dropped_scenes,
            failed_slots: report.failures,
            dispatch,
        })
    }
}
