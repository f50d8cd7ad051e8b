//! Mapping from EDL codec names to FFmpeg encoders.

use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::command::FfmpegCommand;

/// Where an encoder runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderKind {
    Cpu,
    Nvenc,
}

/// A concrete FFmpeg video encoder with its quality/preset conventions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoEncoder {
    pub name: String,
    pub kind: EncoderKind,
}

impl VideoEncoder {
    pub fn cpu(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EncoderKind::Cpu,
        }
    }

    pub fn is_gpu(&self) -> bool {
        self.kind == EncoderKind::Nvenc
    }

    /// Apply codec, preset and quality to a command.
    ///
    /// NVENC takes `-cq` rather than `-crf` and uses `p1`..`p7` presets.
    pub fn apply(&self, cmd: FfmpegCommand, preset: &str, quality: u8) -> FfmpegCommand {
        let cmd = cmd.video_codec(&self.name);
        match self.kind {
            EncoderKind::Cpu => {
                let cmd = if supports_x26x_options(&self.name) {
                    cmd.output_args(["-preset", preset])
                } else {
                    cmd
                };
                cmd.output_args(["-crf".to_string(), quality.to_string()])
            }
            EncoderKind::Nvenc => cmd.output_args([
                "-preset".to_string(),
                nvenc_preset(preset).to_string(),
                "-rc".to_string(),
                "vbr".to_string(),
                "-cq".to_string(),
                quality.to_string(),
                "-b:v".to_string(),
                "0".to_string(),
            ]),
        }
    }
}

fn supports_x26x_options(name: &str) -> bool {
    matches!(name, "libx264" | "libx265")
}

/// Resolve an EDL codec name.
///
/// `h264`/`hevc` and their aliases get an NVENC encoder when `use_gpu` and
/// `nvenc_available` are both set. Unknown names are passed through as raw
/// FFmpeg encoder names on the CPU path.
pub fn resolve_video_encoder(codec: &str, use_gpu: bool, nvenc_available: bool) -> VideoEncoder {
    let normalized = codec.trim().to_ascii_lowercase();
    let (cpu, gpu) = match normalized.as_str() {
        "h264" | "avc" | "libx264" | "h264_nvenc" => ("libx264", Some("h264_nvenc")),
        "h265" | "hevc" | "libx265" | "hevc_nvenc" => ("libx265", Some("hevc_nvenc")),
        "vp9" | "libvpx-vp9" => ("libvpx-vp9", None),
        "" => ("libx264", Some("h264_nvenc")),
        _ => return VideoEncoder::cpu(normalized),
    };

    match gpu {
        Some(name) if use_gpu && nvenc_available => VideoEncoder {
            name: name.to_string(),
            kind: EncoderKind::Nvenc,
        },
        _ => VideoEncoder::cpu(cpu),
    }
}

/// Resolve an EDL audio codec name to an FFmpeg encoder.
pub fn resolve_audio_encoder(codec: &str) -> String {
    match codec.trim().to_ascii_lowercase().as_str() {
        "" | "aac" => "aac".to_string(),
        "mp3" | "libmp3lame" => "libmp3lame".to_string(),
        "opus" | "libopus" => "libopus".to_string(),
        other => other.to_string(),
    }
}

/// Map x264-style preset names onto NVENC's `p1` (fastest) .. `p7` (slowest).
pub fn nvenc_preset(preset: &str) -> &'static str {
    match preset.trim().to_ascii_lowercase().as_str() {
        "ultrafast" | "superfast" | "veryfast" | "p1" => "p1",
        "faster" | "p2" => "p2",
        "fast" | "p3" => "p3",
        "slow" | "p5" => "p5",
        "slower" | "p6" => "p6",
        "veryslow" | "placebo" | "p7" => "p7",
        _ => "p4",
    }
}

static NVENC_AVAILABLE: OnceCell<bool> = OnceCell::const_new();

/// Whether the local FFmpeg build lists NVENC encoders. Probed once per process.
pub async fn nvenc_available() -> bool {
    *NVENC_AVAILABLE.get_or_init(probe_nvenc).await
}

async fn probe_nvenc() -> bool {
    let output = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await;

    match output {
        Ok(out) if out.status.success() => {
            let available = String::from_utf8_lossy(&out.stdout).contains("h264_nvenc");
            debug!(available, "Probed NVENC encoder availability");
            available
        }
        Ok(out) => {
            warn!(status = %out.status, "ffmpeg -encoders failed; assuming no NVENC");
            false
        }
        Err(e) => {
            warn!(error = %e, "Could not run ffmpeg to probe encoders; assuming no NVENC");
            false
        }
    }
}
