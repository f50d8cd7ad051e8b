//! Narration mixing with per-clip delay offsets.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::encoder::resolve_audio_encoder;
use crate::error::{MediaError, MediaResult};
use crate::filters::{audio_mix_filter, delay_ms};

/// Codec of the intermediate mix.
pub const MIX_CODEC: &str = "aac";

/// One narration input placed at `start_time` seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioPlacement {
    pub path: PathBuf,
    pub start_time: f64,
}

impl AudioPlacement {
    pub fn new(path: impl Into<PathBuf>, start_time: f64) -> Self {
        Self {
            path: path.into(),
            start_time,
        }
    }
}

/// Build the mix command. Fails if there is nothing to mix.
pub fn build_mix_command(
    placements: &[AudioPlacement],
    output: impl AsRef<Path>,
    bitrate: &str,
) -> MediaResult<FfmpegCommand> {
    if placements.is_empty() {
        return Err(MediaError::EmptyInput("mix"));
    }

    let delays: Vec<u64> = placements.iter().map(|p| delay_ms(p.start_time)).collect();
    let cmd = placements
        .iter()
        .fold(FfmpegCommand::new(output), |cmd, p| cmd.input(&p.path));

    Ok(cmd
        .filter_complex(audio_mix_filter(&delays))
        .map("[aout]")
        .no_video()
        .audio_codec(resolve_audio_encoder(MIX_CODEC))
        .audio_bitrate(bitrate))
}

/// Mix narration into a single AAC stream.
pub async fn mix_audio(
    runner: &FfmpegRunner,
    placements: &[AudioPlacement],
    output: impl AsRef<Path>,
    bitrate: &str,
) -> MediaResult<()> {
    let cmd = build_mix_command(placements, output, bitrate)?;
    debug!(inputs = placements.len(), output = %cmd.output_path().display(), "Mixing audio");
    runner.run(&cmd).await
}
