//! Segment concatenation via the concat demuxer.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegInput, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::filters::{concat_list_entry, SEGMENT_PIXEL_FORMAT};
use crate::segment::EncodeSettings;

/// Contents of a concat demuxer list for `segments`, in order.
pub fn concat_list(segments: &[PathBuf]) -> String {
    let mut list = String::from("ffconcat version 1.0\n");
    for segment in segments {
        list.push_str(&concat_list_entry(&segment.to_string_lossy()));
        list.push('\n');
    }
    list
}

/// Build the re-encoding concat command reading `list_path`.
pub fn build_concat_command(
    list_path: impl AsRef<Path>,
    output: impl AsRef<Path>,
    encode: &EncodeSettings,
) -> FfmpegCommand {
    let cmd = FfmpegCommand::new(output)
        .input_with(FfmpegInput::new(list_path).concat_list())
        .map("0:v:0")
        .no_audio();
    encode
        .encoder
        .apply(cmd, &encode.preset, encode.quality)
        .pixel_format(SEGMENT_PIXEL_FORMAT)
}

/// Join `segments` in order into a single video-only file.
///
/// The list file is written next to `output` and removed afterwards.
pub async fn concat_segments(
    runner: &FfmpegRunner,
    segments: &[PathBuf],
    output: impl AsRef<Path>,
    encode: &EncodeSettings,
) -> MediaResult<()> {
    if segments.is_empty() {
        return Err(MediaError::EmptyInput("concatenate"));
    }
    let output = output.as_ref();

    // The demuxer resolves relative entries against the list's directory.
    let mut absolute = Vec::with_capacity(segments.len());
    for segment in segments {
        absolute.push(fs::canonicalize(segment).await?);
    }

    let list_path = output.with_extension("concat.txt");
    fs::write(&list_path, concat_list(&absolute)).await?;
    debug!(segments = absolute.len(), output = %output.display(), "Concatenating segments");

    let result = runner
        .run(&build_concat_command(&list_path, output, encode))
        .await;
    let _ = fs::remove_file(&list_path).await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::VideoEncoder;

    #[test]
    fn test_list_preserves_order() {
        let list = concat_list(&[
            PathBuf::from("/w/seg_000.mp4"),
            PathBuf::from("/w/seg_002.mp4"),
        ]);
        assert_eq!(
            list,
            "ffconcat version 1.0\nfile '/w/seg_000.mp4'\nfile '/w/seg_002.mp4'\n"
        );
    }

    #[test]
    fn test_concat_reencodes_with_edl_settings() {
        let encode = EncodeSettings::new(VideoEncoder::cpu("libx264"), "slow", 23);
        let args = build_concat_command("/w/list.txt", "/w/video.mp4", &encode)
            .build_args()
            .join(" ");
        assert!(args.contains("-f concat -safe 0 -i /w/list.txt"));
        assert!(args.contains("-c:v libx264 -preset slow -crf 23"));
        assert!(args.contains("-an"));
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let err = concat_segments(
            &FfmpegRunner::new(),
            &[],
            "/tmp/out.mp4",
            &EncodeSettings::new(VideoEncoder::cpu("libx264"), "medium", 23),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::EmptyInput(_)));
    }
}
