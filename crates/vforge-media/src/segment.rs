//! Per-clip intermediate segment rendering.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegInput, FfmpegRunner};
use crate::encoder::VideoEncoder;
use crate::error::MediaResult;
use crate::filters::{
    chain, fade_in_filter, fade_out_filter, finalize_filter, hold_last_frame_filter,
    normalize_filter, SEGMENT_PIXEL_FORMAT,
};
use crate::ken_burns::{frame_count, zoompan_filter, KenBurnsMotion};

/// Quality of intermediate segments. High so the final encode dominates.
pub const SEGMENT_QUALITY: u8 = 18;

/// Encoder settings for one FFmpeg step.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    pub encoder: VideoEncoder,
    pub preset: String,
    pub quality: u8,
}

impl EncodeSettings {
    pub fn new(encoder: VideoEncoder, preset: impl Into<String>, quality: u8) -> Self {
        Self {
            encoder,
            preset: preset.into(),
            quality,
        }
    }

    /// Same encoder and preset at segment quality.
    pub fn for_segments(&self) -> Self {
        Self {
            quality: SEGMENT_QUALITY,
            ..self.clone()
        }
    }

    fn apply(&self, cmd: FfmpegCommand) -> FfmpegCommand {
        self.encoder.apply(cmd, &self.preset, self.quality)
    }
}

/// What a segment is rendered from.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentSource {
    /// Still image looped for the clip duration, optionally with pan/zoom.
    Still {
        path: PathBuf,
        ken_burns: Option<KenBurnsMotion>,
    },
    /// Video trimmed from `in_point`.
    Video { path: PathBuf, in_point: f64 },
}

impl SegmentSource {
    pub fn path(&self) -> &Path {
        match self {
            SegmentSource::Still { path, .. } | SegmentSource::Video { path, .. } => path,
        }
    }
}

/// Everything needed to render one clip to an intermediate segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSpec {
    pub source: SegmentSource,
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub fade_in: Option<f64>,
    pub fade_out: Option<f64>,
}

impl SegmentSpec {
    /// Video filter chain for this segment.
    pub fn filter(&self) -> String {
        let (w, h, fps) = (self.width, self.height, self.fps);

        let body = match &self.source {
            SegmentSource::Still {
                ken_burns: Some(motion),
                ..
            } => zoompan_filter(motion, self.duration, w, h, fps),
            SegmentSource::Still { ken_burns: None, .. } => normalize_filter(w, h, fps),
            SegmentSource::Video { .. } => chain([
                normalize_filter(w, h, fps),
                hold_last_frame_filter(self.duration),
            ]),
        };

        chain([
            body,
            finalize_filter(),
            self.fade_in.map(fade_in_filter).unwrap_or_default(),
            self.fade_out
                .map(|d| fade_out_filter(self.duration, d))
                .unwrap_or_default(),
        ])
    }

    /// Build the FFmpeg command; the segment carries no audio.
    pub fn build_command(&self, output: impl AsRef<Path>, encode: &EncodeSettings) -> FfmpegCommand {
        let input = match &self.source {
            SegmentSource::Still { path, .. } => {
                FfmpegInput::new(path).looped_still(self.fps, self.duration)
            }
            SegmentSource::Video { path, in_point } => {
                let input = FfmpegInput::new(path);
                let input = if *in_point > 0.0 { input.seek(*in_point) } else { input };
                input.duration(self.duration)
            }
        };

        let cmd = FfmpegCommand::new(output)
            .input_with(input)
            .video_filter(self.filter())
            .no_audio();
        encode
            .apply(cmd)
            .pixel_format(SEGMENT_PIXEL_FORMAT)
            .frames(frame_count(self.duration, self.fps))
    }
}

/// Render one segment.
pub async fn render_segment(
    runner: &FfmpegRunner,
    spec: &SegmentSpec,
    output: impl AsRef<Path>,
    encode: &EncodeSettings,
) -> MediaResult<()> {
    let output = output.as_ref();
    debug!(
        source = %spec.source.path().display(),
        output = %output.display(),
        duration = spec.duration,
        "Rendering segment"
    );
    runner.run(&spec.build_command(output, encode)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::resolve_video_encoder;
    use vforge_models::KenBurnsParams;

    fn spec(source: SegmentSource) -> SegmentSpec {
        SegmentSpec {
            source,
            duration: 4.0,
            width: 1920,
            height: 1080,
            fps: 30,
            fade_in: None,
            fade_out: None,
        }
    }

    fn encode() -> EncodeSettings {
        EncodeSettings::new(resolve_video_encoder("h264", false, false), "medium", 23).for_segments()
    }

    #[test]
    fn test_still_with_ken_burns() {
        let s = spec(SegmentSource::Still {
            path: PathBuf::from("/work/visual_1.png"),
            ken_burns: Some(KenBurnsMotion::from_params(&KenBurnsParams::default())),
        });
        let args = s.build_command("/work/seg_000.mp4", &encode()).build_args().join(" ");

        assert!(args.contains("-loop 1 -framerate 30 -t 4.000 -i /work/visual_1.png"));
        assert!(args.contains("zoompan="));
        assert!(args.contains("-an"));
        assert!(args.contains("-crf 18"));
        assert!(args.contains("-frames:v 120"));
    }

    #[test]
    fn test_still_without_effect_is_normalized() {
        let s = spec(SegmentSource::Still {
            path: PathBuf::from("/work/visual_1.png"),
            ken_burns: None,
        });
        let filter = s.filter();
        assert!(filter.starts_with("scale=1920:1080:force_original_aspect_ratio=decrease,pad="));
        assert!(!filter.contains("zoompan"));
    }

    #[test]
    fn test_video_trims_from_in_point() {
        let s = spec(SegmentSource::Video {
            path: PathBuf::from("/work/visual_2.mp4"),
            in_point: 1.5,
        });
        let args = s.build_command("/work/seg_001.mp4", &encode()).build_args().join(" ");
        assert!(args.contains("-ss 1.500 -t 4.000 -i /work/visual_2.mp4"));
        assert!(args.contains("tpad=stop_mode=clone:stop_duration=4.000"));

        let s = spec(SegmentSource::Video {
            path: PathBuf::from("/work/visual_2.mp4"),
            in_point: 0.0,
        });
        let args = s.build_command("/work/seg_001.mp4", &encode()).build_args().join(" ");
        assert!(!args.contains("-ss"));
    }

    #[test]
    fn test_fades_come_last() {
        let mut s = spec(SegmentSource::Still {
            path: PathBuf::from("/work/visual_1.png"),
            ken_burns: None,
        });
        s.fade_in = Some(0.5);
        s.fade_out = Some(1.0);
        let filter = s.filter();
        assert!(filter.ends_with("setsar=1,fade=t=in:st=0:d=0.500,fade=t=out:st=3.000:d=1.000"));
    }
}
