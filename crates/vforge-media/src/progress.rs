//! FFmpeg `-progress pipe:2` parsing.
//!
//! FFmpeg writes `key=value` lines in blocks terminated by `progress=continue`
//! or `progress=end`. [`ProgressParser`] accumulates a block and yields one
//! snapshot per terminator. Lines that are not part of the progress protocol
//! are diagnostics and are handed back to the caller.

use serde::{Deserialize, Serialize};

/// Progress snapshot for one transcoding step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FfmpegProgress {
    pub frame: u64,
    pub fps: f64,
    /// Output position in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed relative to realtime
    pub speed: f64,
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Completed fraction of a step producing `total_secs` of output, in `[0, 1]`.
    pub fn fraction(&self, total_secs: f64) -> f64 {
        if self.is_complete {
            return 1.0;
        }
        if total_secs <= 0.0 {
            return 0.0;
        }
        (self.out_time_ms as f64 / 1000.0 / total_secs).clamp(0.0, 1.0)
    }
}

/// Callback invoked once per progress block.
pub type ProgressCallback = Box<dyn Fn(FfmpegProgress) + Send + 'static>;

/// Outcome of feeding one stderr line to the parser.
#[derive(Debug, PartialEq)]
pub enum ProgressLine {
    /// Part of a progress block, nothing to report yet.
    Partial,
    /// A block finished.
    Snapshot(FfmpegProgress),
    /// Not a progress line; FFmpeg diagnostic output.
    Diagnostic,
}

const PROGRESS_KEYS: &[&str] = &[
    "frame",
    "fps",
    "bitrate",
    "total_size",
    "out_time_us",
    "out_time_ms",
    "out_time",
    "dup_frames",
    "drop_frames",
    "speed",
    "progress",
];

/// Incremental parser for the progress protocol.
#[derive(Debug, Default)]
pub struct ProgressParser {
    current: FfmpegProgress,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, line: &str) -> ProgressLine {
        let line = line.trim();
        let Some((key, value)) = line.split_once('=') else {
            return ProgressLine::Diagnostic;
        };
        let key = key.trim();
        let value = value.trim();
        if !PROGRESS_KEYS.contains(&key) && !key.starts_with("stream_") {
            return ProgressLine::Diagnostic;
        }

        match key {
            // Despite the name, out_time_ms is in microseconds as well.
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.parse::<i64>() {
                    self.current.out_time_ms = us / 1000;
                }
            }
            "frame" => {
                if let Ok(frame) = value.parse() {
                    self.current.frame = frame;
                }
            }
            "fps" => {
                if let Ok(fps) = value.parse() {
                    self.current.fps = fps;
                }
            }
            "speed" => {
                if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                    self.current.speed = speed;
                }
            }
            "progress" => {
                self.current.is_complete = value == "end";
                return ProgressLine::Snapshot(self.current.clone());
            }
            _ => {}
        }
        ProgressLine::Partial
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_yields_snapshot() {
        let mut parser = ProgressParser::new();
        assert_eq!(parser.feed("frame=120"), ProgressLine::Partial);
        assert_eq!(parser.feed("out_time_us=4000000"), ProgressLine::Partial);
        assert_eq!(parser.feed("speed=2.5x"), ProgressLine::Partial);

        match parser.feed("progress=continue") {
            ProgressLine::Snapshot(p) => {
                assert_eq!(p.frame, 120);
                assert_eq!(p.out_time_ms, 4000);
                assert!((p.speed - 2.5).abs() < 1e-9);
                assert!(!p.is_complete);
                assert!((p.fraction(8.0) - 0.5).abs() < 1e-9);
            }
            other => panic!("expected snapshot, got {:?}", other),
        }

        match parser.feed("progress=end") {
            ProgressLine::Snapshot(p) => assert_eq!(p.fraction(8.0), 1.0),
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[test]
    fn test_diagnostics_are_not_progress() {
        let mut parser = ProgressParser::new();
        assert_eq!(
            parser.feed("[image2 @ 0x55] Could not open file : missing.png"),
            ProgressLine::Diagnostic
        );
        assert_eq!(parser.feed("Error while filtering: key=value"), ProgressLine::Diagnostic);
        assert_eq!(parser.feed("speed=N/A"), ProgressLine::Partial);
    }

    #[test]
    fn test_fraction_bounds() {
        let p = FfmpegProgress {
            out_time_ms: 12_000,
            ..Default::default()
        };
        assert_eq!(p.fraction(10.0), 1.0);
        assert_eq!(p.fraction(0.0), 0.0);
    }
}
