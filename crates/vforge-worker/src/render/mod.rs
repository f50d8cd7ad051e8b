//! EDL render pipeline.
//!
//! One job runs strictly in order:
//! `Downloading → RenderingClips → Concatenating → [MixingAudio] → Combining → Done`.
//! Any stage may end in `Failed`. Clips whose asset cannot be fetched or
//! rendered are skipped; a failed audio mix yields a video-only output.
//! Only a job with no rendered clip at all, or a failed concat/combine/upload,
//! is fatal.

pub mod backend;
pub mod download;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn, Instrument};

use vforge_media::{AudioOutput, AudioPlacement, EncodeSettings, KenBurnsMotion, SegmentSource, SegmentSpec};
use vforge_models::{is_path_safe_id, Clip, Edl, JobId};
use vforge_storage::{content_type_for, JobPaths, ObjectStore};

use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;

pub use backend::{FfmpegBackend, MediaBackend};
pub use download::{AssetFetcher, SourceLocation};

/// Render states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Downloading,
    RenderingClips,
    Concatenating,
    MixingAudio,
    Combining,
    Done,
    Failed,
}

impl RenderStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStage::Downloading => "downloading",
            RenderStage::RenderingClips => "rendering_clips",
            RenderStage::Concatenating => "concatenating",
            RenderStage::MixingAudio => "mixing_audio",
            RenderStage::Combining => "combining",
            RenderStage::Done => "done",
            RenderStage::Failed => "failed",
        }
    }
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A video clip left out of the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedClip {
    pub clip_id: String,
    pub reason: String,
}

/// Result of a successful render.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub output_key: String,
    /// Stages visited, ending in `Done`
    pub stages: Vec<RenderStage>,
    pub rendered_clips: usize,
    pub skipped_clips: Vec<SkippedClip>,
    /// False when there was no narration or the mix failed
    pub audio_mixed: bool,
}

/// Records stage transitions and their durations.
struct StageTracker {
    visited: Vec<RenderStage>,
    current: Option<(RenderStage, Instant)>,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            visited: Vec::new(),
            current: None,
        }
    }

    fn enter(&mut self, stage: RenderStage) {
        self.finish_current();
        info!(stage = stage.as_str(), "Entering render stage");
        self.visited.push(stage);
        self.current = Some((stage, Instant::now()));
    }

    fn finish_current(&mut self) {
        if let Some((stage, started)) = self.current.take() {
            metrics::record_stage_duration(stage.as_str(), started.elapsed().as_secs_f64());
        }
    }

    fn finish(&mut self, terminal: RenderStage) -> Vec<RenderStage> {
        self.finish_current();
        self.visited.push(terminal);
        std::mem::take(&mut self.visited)
    }
}

/// Renders EDLs to a single output artifact.
pub struct RenderPipeline {
    backend: Arc<dyn MediaBackend>,
    store: Arc<dyn ObjectStore>,
    fetcher: AssetFetcher,
    work_root: PathBuf,
}

impl RenderPipeline {
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        store: Arc<dyn ObjectStore>,
        http: reqwest::Client,
        work_root: impl Into<PathBuf>,
    ) -> Self {
        let fetcher = AssetFetcher::new(store.clone(), http);
        Self {
            backend,
            store,
            fetcher,
            work_root: work_root.into(),
        }
    }

    /// Read and parse an EDL from a store key, URL, or local path.
    pub async fn load_edl(&self, location: &str) -> WorkerResult<Edl> {
        let bytes = self.fetcher.fetch_bytes(location).await?;
        Edl::from_json(&bytes).map_err(|e| WorkerError::validation(format!("EDL at {}: {}", location, e)))
    }

    /// Load the EDL at `location` and render it.
    pub async fn run_location(&self, job_id: &JobId, location: &str) -> WorkerResult<RenderOutcome> {
        let edl = self.load_edl(location).await?;
        self.run(job_id, &edl).await
    }

    /// Render `edl` and upload the result to `jobs/{jobId}/output/final.{format}`.
    ///
    /// The job's work directory is removed afterwards, on success or failure.
    pub async fn run(&self, job_id: &JobId, edl: &Edl) -> WorkerResult<RenderOutcome> {
        let logger = JobLogger::new(job_id, "render");
        let span = logger.create_span();
        let mut tracker = StageTracker::new();

        let result = async {
            if !is_path_safe_id(job_id.as_str()) {
                return Err(WorkerError::validation(format!("job id '{}' is not usable as a path", job_id)));
            }
            edl.validate().map_err(|e| WorkerError::validation(e.to_string()))?;

            let work_dir = self.work_root.join(job_id.as_str());
            let result = match tokio::fs::create_dir_all(&work_dir).await {
                Ok(()) => self.execute(job_id, edl, &work_dir, &logger, &mut tracker).await,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(job_id = %job_id, dir = %work_dir.display(), error = %e, "Failed to remove work dir");
                }
            }
            result
        }
        .instrument(span)
        .await;

        match result {
            Ok(mut outcome) => {
                outcome.stages = tracker.finish(RenderStage::Done);
                metrics::record_job_completed("render");
                logger.log_completion(&format!(
                    "{} clips rendered, {} skipped, output at {}",
                    outcome.rendered_clips,
                    outcome.skipped_clips.len(),
                    outcome.output_key
                ));
                Ok(outcome)
            }
            Err(e) => {
                let stages = tracker.finish(RenderStage::Failed);
                metrics::record_job_failed("render");
                logger.log_error(&format!("render failed after {:?}: {}", stages, e));
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        job_id: &JobId,
        edl: &Edl,
        work_dir: &Path,
        logger: &JobLogger,
        tracker: &mut StageTracker,
    ) -> WorkerResult<RenderOutcome> {
        logger.log_start(&format!(
            "{} video clips, {} audio clips, {:.1}s",
            edl.video_clips().len(),
            edl.audio_clips().len(),
            edl.timeline.duration
        ));

        tracker.enter(RenderStage::Downloading);
        let local = self.download_assets(edl, work_dir).await;

        tracker.enter(RenderStage::RenderingClips);
        let output = edl.output();
        let encoder = self
            .backend
            .video_encoder(&output.codec, edl.render_settings.gpu)
            .await;
        let final_encode = EncodeSettings::new(
            encoder,
            edl.render_settings.preset.clone(),
            edl.render_settings.quality,
        );
        let segment_encode = final_encode.for_segments();

        let mut segments = Vec::new();
        let mut skipped = Vec::new();
        for (index, clip) in edl.video_clips().iter().enumerate() {
            let segment_path = work_dir.join(format!("segment_{:03}.mkv", index));
            match self
                .render_clip(edl, clip, &local, &segment_path, &segment_encode)
                .await
            {
                Ok(()) => {
                    metrics::record_clip_rendered();
                    if let Some(actual) = self.backend.probe_duration(&segment_path).await {
                        debug!(clip_id = %clip.id, expected = clip.duration, actual, "Rendered segment");
                    }
                    segments.push(segment_path);
                }
                Err(reason) => {
                    metrics::record_clip_skipped(reason.metric_label());
                    warn!(clip_id = %clip.id, asset_id = %clip.asset_id, reason = %reason, "Skipping clip");
                    skipped.push(SkippedClip {
                        clip_id: clip.id.clone(),
                        reason: reason.to_string(),
                    });
                }
            }
        }

        if segments.is_empty() {
            return Err(WorkerError::NoRenderableClips(format!(
                "all {} clips skipped",
                edl.video_clips().len()
            )));
        }
        logger.log_progress(&format!("{} of {} clips rendered", segments.len(), edl.video_clips().len()));

        tracker.enter(RenderStage::Concatenating);
        let video_path = work_dir.join("video.mkv");
        self.backend.concat(&segments, &video_path, &final_encode).await?;

        let placements: Vec<AudioPlacement> = edl
            .audio_clips()
            .iter()
            .filter_map(|clip| match local.get(&clip.asset_id) {
                Some(path) => Some(AudioPlacement::new(path.clone(), clip.start_time)),
                None => {
                    warn!(clip_id = %clip.id, asset_id = %clip.asset_id, "Narration unavailable, leaving gap");
                    None
                }
            })
            .collect();

        let audio_path = work_dir.join("narration.m4a");
        let mixed = if placements.is_empty() {
            info!(job_id = %job_id, "No narration to mix, output will be silent");
            false
        } else {
            tracker.enter(RenderStage::MixingAudio);
            match self
                .backend
                .mix_audio(&placements, &audio_path, &output.audio_bitrate)
                .await
            {
                Ok(()) => true,
                Err(e) => {
                    logger.log_warning(&format!("audio mix failed, continuing without audio: {}", e));
                    false
                }
            }
        };

        tracker.enter(RenderStage::Combining);
        let final_path = work_dir.join(format!("final.{}", output.format));
        let audio_output = AudioOutput {
            codec: output.audio_codec.clone(),
            bitrate: output.audio_bitrate.clone(),
        };
        self.backend
            .combine(
                &video_path,
                mixed.then_some(audio_path.as_path()),
                &final_path,
                &audio_output,
            )
            .await?;

        let output_key = JobPaths::new(job_id).output_key(&output.format);
        self.store
            .put_file(&final_path, &output_key, content_type_for(&output_key))
            .await?;
        info!(job_id = %job_id, output_key = %output_key, "Uploaded final output");

        Ok(RenderOutcome {
            output_key,
            stages: Vec::new(),
            rendered_clips: segments.len(),
            skipped_clips: skipped,
            audio_mixed: mixed,
        })
    }

    /// Materialize every asset referenced by a clip. Failures are logged and
    /// leave the asset absent.
    async fn download_assets(&self, edl: &Edl, work_dir: &Path) -> HashMap<String, PathBuf> {
        let referenced: BTreeSet<&str> = edl
            .video_clips()
            .iter()
            .chain(edl.audio_clips())
            .map(|clip| clip.asset_id.as_str())
            .collect();

        let assets_dir = work_dir.join("assets");
        let mut local = HashMap::new();
        for (id, asset) in referenced.into_iter().filter_map(|id| edl.asset(id).map(|a| (id, a))) {
            if !is_path_safe_id(id) {
                warn!(asset_id = %id, "Asset id is not a plain file name, skipping download");
                continue;
            }
            let dest = assets_dir.join(format!("{}.{}", id, asset.local_extension()));
            match self.fetcher.fetch_to(&asset.source, &dest).await {
                Ok(path) => {
                    local.insert(id.to_string(), path);
                }
                Err(e) => {
                    warn!(asset_id = %id, source = %asset.source, error = %e, "Asset download failed");
                }
            }
        }
        debug!(downloaded = local.len(), "Assets materialized");
        local
    }

    async fn render_clip(
        &self,
        edl: &Edl,
        clip: &Clip,
        local: &HashMap<String, PathBuf>,
        output: &Path,
        encode: &EncodeSettings,
    ) -> Result<(), SkipReason> {
        let path = local.get(&clip.asset_id).ok_or(SkipReason::AssetUnavailable)?;
        let asset = edl.asset(&clip.asset_id).ok_or(SkipReason::AssetUnavailable)?;

        let source = if asset.kind.is_image() {
            SegmentSource::Still {
                path: path.clone(),
                ken_burns: clip.ken_burns().map(|params| KenBurnsMotion::from_params(&params)),
            }
        } else if asset.kind.is_video() {
            SegmentSource::Video {
                path: path.clone(),
                in_point: clip.in_point(),
            }
        } else {
            return Err(SkipReason::NotVisual(asset.kind.to_string()));
        };

        let out = edl.output();
        let spec = SegmentSpec {
            source,
            duration: clip.duration,
            width: out.width,
            height: out.height,
            fps: out.fps,
            fade_in: clip.fade_in(),
            fade_out: clip.fade_out(),
        };

        self.backend
            .render_segment(&spec, output, encode)
            .await
            .map_err(|e| SkipReason::RenderFailed(e.to_string()))
    }
}

#[derive(Debug)]
enum SkipReason {
    AssetUnavailable,
    NotVisual(String),
    RenderFailed(String),
}

impl SkipReason {
    fn metric_label(&self) -> &'static str {
        match self {
            SkipReason::AssetUnavailable => "asset_unavailable",
            SkipReason::NotVisual(_) => "not_visual",
            SkipReason::RenderFailed(_) => "render_failed",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AssetUnavailable => f.write_str("asset unavailable"),
            SkipReason::NotVisual(kind) => write!(f, "asset of type {} is not visual", kind),
            SkipReason::RenderFailed(e) => write!(f, "segment render failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{local_store, scene, script};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use vforge_media::{MediaError, MediaResult, VideoEncoder};
    use vforge_models::{Asset, AssetKind, AssetMap, AssetRole, EdlBuilder, OutputOptions, VisualType};

    /// Writes placeholder files and records what it was asked to do.
    #[derive(Default)]
    struct FakeBackend {
        fail_mix: bool,
        fail_segments: Vec<String>,
        segments: Mutex<Vec<SegmentSpec>>,
        combined_with_audio: Mutex<Option<bool>>,
    }

    async fn touch(path: &Path) -> MediaResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, b"media").await?;
        Ok(())
    }

    #[async_trait]
    impl MediaBackend for FakeBackend {
        async fn video_encoder(&self, _codec: &str, _use_gpu: bool) -> VideoEncoder {
            VideoEncoder::cpu("libx264")
        }

        async fn render_segment(&self, spec: &SegmentSpec, output: &Path, _encode: &EncodeSettings) -> MediaResult<()> {
            let name = spec.source.path().file_name().map(|n| n.to_string_lossy().into_owned());
            if name.is_some_and(|n| self.fail_segments.iter().any(|f| n.starts_with(f.as_str()))) {
                return Err(MediaError::ffmpeg_failed("encode failed", None, Some(1)));
            }
            self.segments.lock().unwrap().push(spec.clone());
            touch(output).await
        }

        async fn concat(&self, segments: &[PathBuf], output: &Path, _encode: &EncodeSettings) -> MediaResult<()> {
            assert!(!segments.is_empty());
            touch(output).await
        }

        async fn mix_audio(&self, _placements: &[AudioPlacement], output: &Path, _bitrate: &str) -> MediaResult<()> {
            if self.fail_mix {
                return Err(MediaError::ffmpeg_failed("amix failed", None, Some(1)));
            }
            touch(output).await
        }

        async fn combine(
            &self,
            _video: &Path,
            audio: Option<&Path>,
            output: &Path,
            _audio_output: &AudioOutput,
        ) -> MediaResult<()> {
            *self.combined_with_audio.lock().unwrap() = Some(audio.is_some());
            touch(output).await
        }
    }

    struct Fixture {
        _store_dir: tempfile::TempDir,
        work_dir: tempfile::TempDir,
        store: Arc<dyn ObjectStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let store_dir = tempfile::tempdir().unwrap();
            let store = local_store(&store_dir);
            Self {
                _store_dir: store_dir,
                work_dir: tempfile::tempdir().unwrap(),
                store,
            }
        }

        fn pipeline(&self, backend: Arc<FakeBackend>) -> RenderPipeline {
            RenderPipeline::new(backend, self.store.clone(), reqwest::Client::new(), self.work_dir.path())
        }

        /// Store the given assets under `jobs/{job}/assets/` and build an EDL over them.
        async fn edl(&self, job_id: &JobId, scenes: &[(&str, VisualType)], stored: &[&str]) -> Edl {
            let paths = JobPaths::new(job_id);
            let mut assets = AssetMap::new();
            for (id, visual_type) in scenes {
                let kind = match visual_type {
                    VisualType::Image => AssetKind::GeneratedImage,
                    VisualType::Video => AssetKind::PexelsVideo,
                };
                for (role, kind) in [(AssetRole::Visual, kind), (AssetRole::Audio, AssetKind::GeneratedAudio)] {
                    let asset_id = role.key(id);
                    let key = paths.asset_key(&asset_id, kind.default_extension());
                    if stored.contains(&asset_id.as_str()) {
                        self.store.put(&key, b"bytes".to_vec(), "application/octet-stream").await.unwrap();
                    }
                    let mut asset = Asset::new(asset_id.clone(), kind, key);
                    if kind.is_audio() {
                        asset = asset.with_duration(3.0);
                    }
                    assets.insert(asset_id, asset);
                }
            }
            let script = script(scenes.iter().map(|(id, t)| scene(id, *t)).collect());
            EdlBuilder::new(OutputOptions::default()).build(&script, &assets).edl
        }
    }

    #[tokio::test]
    async fn test_happy_path_stage_sequence() {
        let fx = Fixture::new();
        let job_id = JobId::from_string("job-ok");
        let edl = fx
            .edl(
                &job_id,
                &[("1", VisualType::Image), ("2", VisualType::Video)],
                &["visual_1", "audio_1", "visual_2", "audio_2"],
            )
            .await;
        let backend = Arc::new(FakeBackend::default());

        let outcome = fx.pipeline(backend.clone()).run(&job_id, &edl).await.unwrap();

        assert_eq!(
            outcome.stages,
            vec![
                RenderStage::Downloading,
                RenderStage::RenderingClips,
                RenderStage::Concatenating,
                RenderStage::MixingAudio,
                RenderStage::Combining,
                RenderStage::Done,
            ]
        );
        assert_eq!(outcome.rendered_clips, 2);
        assert!(outcome.audio_mixed);
        assert_eq!(outcome.output_key, "jobs/job-ok/output/final.mp4");
        assert!(fx.store.exists(&outcome.output_key).await.unwrap());
        assert!(!fx.work_dir.path().join("job-ok").exists());

        // Image clip gets a still source, video clip is trimmed footage.
        let segments = backend.segments.lock().unwrap();
        assert!(matches!(segments[0].source, SegmentSource::Still { .. }));
        assert!(matches!(segments[1].source, SegmentSource::Video { in_point, .. } if in_point == 0.0));
        assert_eq!(*backend.combined_with_audio.lock().unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_all_downloads_fail_is_fatal() {
        let fx = Fixture::new();
        let job_id = JobId::from_string("job-empty");
        let edl = fx
            .edl(&job_id, &[("1", VisualType::Image), ("2", VisualType::Image)], &[])
            .await;

        let err = fx
            .pipeline(Arc::new(FakeBackend::default()))
            .run(&job_id, &edl)
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::NoRenderableClips(_)));
        assert!(!fx.store.exists("jobs/job-empty/output/final.mp4").await.unwrap());
        assert!(!fx.work_dir.path().join("job-empty").exists());
    }

    #[tokio::test]
    async fn test_failed_mix_yields_video_only_output() {
        let fx = Fixture::new();
        let job_id = JobId::from_string("job-silent");
        let edl = fx
            .edl(&job_id, &[("1", VisualType::Image)], &["visual_1", "audio_1"])
            .await;
        let backend = Arc::new(FakeBackend {
            fail_mix: true,
            ..Default::default()
        });

        let outcome = fx.pipeline(backend.clone()).run(&job_id, &edl).await.unwrap();

        assert_eq!(outcome.stages.last(), Some(&RenderStage::Done));
        assert!(outcome.stages.contains(&RenderStage::MixingAudio));
        assert!(!outcome.audio_mixed);
        assert_eq!(*backend.combined_with_audio.lock().unwrap(), Some(false));
        assert!(fx.store.exists(&outcome.output_key).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_asset_skips_clip() {
        let fx = Fixture::new();
        let job_id = JobId::from_string("job-partial");
        let edl = fx
            .edl(
                &job_id,
                &[("1", VisualType::Image), ("2", VisualType::Image)],
                &["visual_1", "audio_1", "audio_2"],
            )
            .await;

        let outcome = fx
            .pipeline(Arc::new(FakeBackend::default()))
            .run(&job_id, &edl)
            .await
            .unwrap();

        assert_eq!(outcome.rendered_clips, 1);
        assert_eq!(outcome.skipped_clips.len(), 1);
        assert_eq!(outcome.skipped_clips[0].clip_id, edl.video_clips()[1].id);
    }

    #[tokio::test]
    async fn test_segment_render_failure_skips_clip() {
        let fx = Fixture::new();
        let job_id = JobId::from_string("job-render-fail");
        let edl = fx
            .edl(
                &job_id,
                &[("1", VisualType::Image), ("2", VisualType::Video)],
                &["visual_1", "audio_1", "visual_2", "audio_2"],
            )
            .await;
        let backend = Arc::new(FakeBackend {
            fail_segments: vec!["visual_2".to_string()],
            ..Default::default()
        });

        let outcome = fx.pipeline(backend).run(&job_id, &edl).await.unwrap();

        assert_eq!(outcome.rendered_clips, 1);
        assert!(outcome.skipped_clips[0].reason.contains("render failed"));
    }

    #[tokio::test]
    async fn test_no_narration_skips_mixing_stage() {
        let fx = Fixture::new();
        let job_id = JobId::from_string("job-mute");
        let edl = fx
            .edl(&job_id, &[("1", VisualType::Video)], &["visual_1"])
            .await;
        let backend = Arc::new(FakeBackend::default());

        let outcome = fx.pipeline(backend.clone()).run(&job_id, &edl).await.unwrap();

        assert!(!outcome.stages.contains(&RenderStage::MixingAudio));
        assert!(!outcome.audio_mixed);
        assert_eq!(*backend.combined_with_audio.lock().unwrap(), Some(false));
    }

    #[tokio::test]
    async fn test_non_contiguous_edl_rejected() {
        let fx = Fixture::new();
        let job_id = JobId::from_string("job-gap");
        let mut edl = fx
            .edl(
                &job_id,
                &[("1", VisualType::Image), ("2", VisualType::Image)],
                &["visual_1", "audio_1", "visual_2", "audio_2"],
            )
            .await;
        for track in &mut edl.timeline.tracks {
            if let Some(clip) = track.clips.get_mut(1) {
                clip.start_time += 1.0;
            }
        }

        let err = fx
            .pipeline(Arc::new(FakeBackend::default()))
            .run(&job_id, &edl)
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert!(!fx.work_dir.path().join("job-gap").exists());
    }

    #[tokio::test]
    async fn test_load_edl_from_store_key() {
        let fx = Fixture::new();
        let job_id = JobId::from_string("job-load");
        let edl = fx
            .edl(&job_id, &[("1", VisualType::Image)], &["visual_1", "audio_1"])
            .await;
        let key = JobPaths::new(&job_id).edl_key();
        fx.store
            .put(&key, edl.to_json_pretty().unwrap(), "application/json")
            .await
            .unwrap();
        fx.store
            .put("jobs/bad/edl.json", b"{\"not\": \"an edl\"}".to_vec(), "application/json")
            .await
            .unwrap();

        let pipeline = fx.pipeline(Arc::new(FakeBackend::default()));
        assert_eq!(pipeline.load_edl(&key).await.unwrap(), edl);
        assert!(pipeline.load_edl("jobs/bad/edl.json").await.unwrap_err().is_validation());

        let outcome = pipeline.run_location(&job_id, &key).await.unwrap();
        assert_eq!(outcome.rendered_clips, 1);
    }

    #[tokio::test]
    async fn test_unsafe_job_id_rejected() {
        let fx = Fixture::new();
        let edl = fx
            .edl(&JobId::from_string("job-x"), &[("1", VisualType::Image)], &["visual_1", "audio_1"])
            .await;

        let err = fx
            .pipeline(Arc::new(FakeBackend::default()))
            .run(&JobId::from_string("../outside"), &edl)
            .await
            .unwrap_err();

        assert!(err.is_validation());
        assert!(!fx.work_dir.path().parent().unwrap().join("outside").exists());
    }

    #[tokio::test]
    async fn test_asset_id_escaping_work_dir_rejected() {
        let fx = Fixture::new();
        let job_id = JobId::from_string("job-escape");
        let mut edl = fx
            .edl(&job_id, &[("1", VisualType::Image)], &["visual_1", "audio_1"])
            .await;
        let escaped = "../../../escaped";
        let mut asset = edl.assets.remove("visual_1").unwrap();
        asset.id = escaped.to_string();
        edl.assets.insert(escaped.to_string(), asset);
        edl.timeline.tracks[0].clips[0].asset_id = escaped.to_string();
        let backend = Arc::new(FakeBackend::default());

        let err = fx.pipeline(backend.clone()).run(&job_id, &edl).await.unwrap_err();

        assert!(err.is_validation());
        assert!(backend.segments.lock().unwrap().is_empty());
        assert!(!fx.work_dir.path().parent().unwrap().join("escaped.png").exists());
    }

    #[tokio::test]
    async fn test_asset_key_and_id_mismatch_rejected() {
        let fx = Fixture::new();
        let job_id = JobId::from_string("job-mismatch");
        let mut edl = fx
            .edl(&job_id, &[("1", VisualType::Image)], &["visual_1", "audio_1"])
            .await;
        edl.assets.get_mut("visual_1").unwrap().id = "img".to_string();

        let err = fx
            .pipeline(Arc::new(FakeBackend::default()))
            .run(&job_id, &edl)
            .await
            .unwrap_err();

        assert!(err.is_validation());
    }

    #[test]
    fn test_rejected_edl_counts_as_failed_render() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let err = ::metrics::with_local_recorder(&recorder, || {
            rt.block_on(async {
                let fx = Fixture::new();
                let job_id = JobId::from_string("job-invalid");
                let mut edl = fx
                    .edl(&job_id, &[("1", VisualType::Image)], &["visual_1", "audio_1"])
                    .await;
                edl.metadata.output.width = 1281;
                fx.pipeline(Arc::new(FakeBackend::default()))
                    .run(&job_id, &edl)
                    .await
                    .unwrap_err()
            })
        });

        assert!(err.is_validation());
        let rendered = handle.render();
        assert!(rendered.contains(r#"vforge_jobs_failed_total{operation="render"} 1"#), "{}", rendered);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(RenderStage::RenderingClips.as_str(), "rendering_clips");
        assert_eq!(RenderStage::MixingAudio.to_string(), "mixing_audio");
    }
}
