//! Final video/audio combine.

use std::path::Path;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::encoder::resolve_audio_encoder;
use crate::error::MediaResult;

/// Audio settings for the final container.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioOutput {
    pub codec: String,
    pub bitrate: String,
}

fn supports_faststart(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref(),
        Some("mp4" | "mov" | "m4v")
    )
}

/// Build the combine command.
///
/// Video is stream-copied. With audio, the output stops at the shorter
/// stream; without, the output has no audio track.
pub fn build_combine_command(
    video: impl AsRef<Path>,
    audio: Option<&Path>,
    output: impl AsRef<Path>,
    audio_output: &AudioOutput,
) -> FfmpegCommand {
    let output = output.as_ref();
    let cmd = FfmpegCommand::new(output).input(video);

    let cmd = match audio {
        Some(audio) => cmd
            .input(audio)
            .map("0:v:0")
            .map("1:a:0")
            .video_codec("copy")
            .audio_codec(resolve_audio_encoder(&audio_output.codec))
            .audio_bitrate(&audio_output.bitrate)
            .shortest(),
        None => cmd.map("0:v:0").video_codec("copy").no_audio(),
    };

    if supports_faststart(output) {
        cmd.faststart()
    } else {
        cmd
    }
}

/// Produce the final artifact.
pub async fn combine(
    runner: &FfmpegRunner,
    video: impl AsRef<Path>,
    audio: Option<&Path>,
    output: impl AsRef<Path>,
    audio_output: &AudioOutput,
) -> MediaResult<()> {
    let cmd = build_combine_command(video, audio, output, audio_output);
    debug!(with_audio = audio.is_some(), output = %cmd.output_path().display(), "Combining final output");
    runner.run(&cmd).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aac() -> AudioOutput {
        AudioOutput {
            codec: "aac".to_string(),
            bitrate: "192k".to_string(),
        }
    }

    #[test]
    fn test_combine_with_audio() {
        let args = build_combine_command("/w/video.mp4", Some(Path::new("/w/mix.m4a")), "/w/final.mp4", &aac())
            .build_args()
            .join(" ");
        assert!(args.contains("-i /w/video.mp4 -i /w/mix.m4a"));
        assert!(args.contains("-c:v copy -c:a aac -b:a 192k -shortest"));
        assert!(args.contains("-movflags +faststart"));
    }

    #[test]
    fn test_combine_video_only() {
        let args = build_combine_command("/w/video.mp4", None, "/w/final.webm", &aac())
            .build_args()
            .join(" ");
        assert!(args.contains("-c:v copy -an"));
        assert!(!args.contains("-shortest"));
        assert!(!args.contains("faststart"));
    }
}
