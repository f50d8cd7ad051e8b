#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for EDL rendering.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - Progress parsing from `-progress pipe:2`
//! - Optional per-invocation timeout via tokio
//! - Ken Burns pan/zoom math and `zoompan` filter construction
//! - The per-stage operations: segment, concat, audio mix, combine

pub mod audio;
pub mod command;
pub mod concat;
pub mod encoder;
pub mod error;
pub mod filters;
pub mod ken_burns;
pub mod mux;
pub mod probe;
pub mod progress;
pub mod segment;

pub use audio::{mix_audio, AudioPlacement};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegInput, FfmpegRunner};
pub use concat::concat_segments;
pub use encoder::{nvenc_available, resolve_audio_encoder, resolve_video_encoder, EncoderKind, VideoEncoder};
pub use error::{MediaError, MediaResult};
pub use ken_burns::{frame_count, prescale_dimensions, window_origin, KenBurnsMotion};
pub use mux::{combine, AudioOutput};
pub use probe::{probe_duration, probe_media, MediaInfo};
pub use progress::{FfmpegProgress, ProgressCallback};
pub use segment::{render_segment, EncodeSettings, SegmentSource, SegmentSpec, SEGMENT_QUALITY};
