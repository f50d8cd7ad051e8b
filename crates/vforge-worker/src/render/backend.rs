//! Media operations used by the render pipeline.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::warn;

use vforge_media::{
    combine, concat_segments, mix_audio, nvenc_available, probe_duration, render_segment,
    resolve_video_encoder, AudioOutput, AudioPlacement, EncodeSettings, FfmpegRunner, MediaError,
    MediaResult, SegmentSpec, VideoEncoder,
};

/// The four transcoding steps of a render plus encoder selection.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Encoder for an EDL codec name, honouring the GPU preference when possible.
    async fn video_encoder(&self, codec: &str, use_gpu: bool) -> VideoEncoder;

    async fn render_segment(&self, spec: &SegmentSpec, output: &Path, encode: &EncodeSettings) -> MediaResult<()>;

    async fn concat(&self, segments: &[PathBuf], output: &Path, encode: &EncodeSettings) -> MediaResult<()>;

    async fn mix_audio(&self, placements: &[AudioPlacement], output: &Path, bitrate: &str) -> MediaResult<()>;

    async fn combine(
        &self,
        video: &Path,
        audio: Option<&Path>,
        output: &Path,
        audio_output: &AudioOutput,
    ) -> MediaResult<()>;

    /// Real duration of a rendered file, for diagnostics only.
    async fn probe_duration(&self, _path: &Path) -> Option<f64> {
        None
    }
}

/// Same settings on the CPU encoder for the same codec.
pub fn cpu_fallback(encode: &EncodeSettings) -> EncodeSettings {
    EncodeSettings {
        encoder: resolve_video_encoder(&encode.encoder.name, false, false),
        ..encode.clone()
    }
}

/// Whether a failed GPU encode is worth repeating on the CPU.
pub fn should_retry_on_cpu(encode: &EncodeSettings, error: &MediaError) -> bool {
    encode.encoder.is_gpu()
        && !matches!(
            error,
            MediaError::Timeout(_) | MediaError::FfmpegNotFound | MediaError::EmptyInput(_)
        )
}

/// FFmpeg-backed implementation.
#[derive(Debug, Clone, Default)]
pub struct FfmpegBackend {
    runner: FfmpegRunner,
}

impl FfmpegBackend {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl MediaBackend for FfmpegBackend {
    async fn video_encoder(&self, codec: &str, use_gpu: bool) -> VideoEncoder {
        let available = use_gpu && nvenc_available().await;
        if use_gpu && !available {
            warn!(codec, "GPU encoding requested but NVENC is unavailable, using CPU");
        }
        resolve_video_encoder(codec, use_gpu, available)
    }

    async fn render_segment(&self, spec: &SegmentSpec, output: &Path, encode: &EncodeSettings) -> MediaResult<()> {
        match render_segment(&self.runner, spec, output, encode).await {
            Err(e) if should_retry_on_cpu(encode, &e) => {
                warn!(encoder = %encode.encoder.name, error = %e, "GPU segment encode failed, retrying on CPU");
                render_segment(&self.runner, spec, output, &cpu_fallback(encode)).await
            }
            result => result,
        }
    }

    async fn concat(&self, segments: &[PathBuf], output: &Path, encode: &EncodeSettings) -> MediaResult<()> {
        match concat_segments(&self.runner, segments, output, encode).await {
            Err(e) if should_retry_on_cpu(encode, &e) => {
                warn!(encoder = %encode.encoder.name, error = %e, "GPU concat encode failed, retrying on CPU");
                concat_segments(&self.runner, segments, output, &cpu_fallback(encode)).await
            }
            result => result,
        }
    }

    async fn mix_audio(&self, placements: &[AudioPlacement], output: &Path, bitrate: &str) -> MediaResult<()> {
        mix_audio(&self.runner, placements, output, bitrate).await
    }

    async fn combine(
        &self,
        video: &Path,
        audio: Option<&Path>,
        output: &Path,
        audio_output: &AudioOutput,
    ) -> MediaResult<()> {
        combine(&self.runner, video, audio, output, audio_output).await
    }

    async fn probe_duration(&self, path: &Path) -> Option<f64> {
        probe_duration(path).await.ok()
    }
}
