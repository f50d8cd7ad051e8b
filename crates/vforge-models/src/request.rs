//! Generation request and output options.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::{ModelError, ModelResult};

/// Default output width
pub const DEFAULT_WIDTH: u32 = 1920;
/// Default output height
pub const DEFAULT_HEIGHT: u32 = 1080;
/// Default output frame rate
pub const DEFAULT_FPS: u32 = 30;
/// Default container format
pub const DEFAULT_FORMAT: &str = "mp4";
/// Default video codec (EDL-level name, resolved to an encoder at render time)
pub const DEFAULT_CODEC: &str = "h264";
/// Default CRF
pub const DEFAULT_CRF: u8 = 23;
/// Default encoder preset
pub const DEFAULT_PRESET: &str = "medium";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "192k";

/// Output options used by the EDL builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OutputOptions {
    #[serde(default = "default_width")]
    #[validate(range(min = 16, max = 7680), custom(function = "validate_even"))]
    pub width: u32,
    #[serde(default = "default_height")]
    #[validate(range(min = 16, max = 4320), custom(function = "validate_even"))]
    pub height: u32,
    #[serde(default = "default_fps")]
    #[validate(range(min = 1, max = 120))]
    pub fps: u32,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<String>,
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
    #[serde(default = "default_crf")]
    #[validate(range(max = 51))]
    pub crf: u8,
    #[serde(default = "default_preset")]
    pub preset: String,
    /// GPU encoding unless explicitly disabled
    #[serde(default = "default_use_gpu")]
    pub use_gpu: bool,
}

/// Encoders require even frame dimensions for 4:2:0 output.
fn validate_even(value: u32) -> Result<(), ValidationError> {
    if value % 2 == 0 {
        Ok(())
    } else {
        Err(ValidationError::new("odd_dimension"))
    }
}

fn default_width() -> u32 {
    DEFAULT_WIDTH
}
fn default_height() -> u32 {
    DEFAULT_HEIGHT
}
fn default_fps() -> u32 {
    DEFAULT_FPS
}
fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}
fn default_codec() -> String {
    DEFAULT_CODEC.to_string()
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_use_gpu() -> bool {
    true
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fps: DEFAULT_FPS,
            format: default_format(),
            codec: default_codec(),
            bitrate: None,
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            crf: DEFAULT_CRF,
            preset: default_preset(),
            use_gpu: true,
        }
    }
}

impl OutputOptions {
    /// Disable GPU encoding.
    pub fn without_gpu(mut self) -> Self {
        self.use_gpu = false;
        self
    }
}

/// Request to turn a topic into a video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[validate(length(min = 3, max = 500))]
    pub topic: String,
    /// Target duration in seconds
    #[validate(range(min = 10.0, max = 600.0))]
    pub target_duration: f64,
    #[serde(default)]
    #[validate(nested)]
    pub output: OutputOptions,
}

impl GenerateRequest {
    pub fn new(topic: impl Into<String>, target_duration: f64) -> Self {
        Self {
            topic: topic.into(),
            target_duration,
            output: OutputOptions::default(),
        }
    }

    /// Validate at the boundary; no partial work is performed on failure.
    pub fn validated(self) -> ModelResult<Self> {
        self.validate()
            .map_err(|e| ModelError::invalid_request(e.to_string()))?;
        if self.topic.trim().is_empty() {
            return Err(ModelError::invalid_request("topic must not be blank"));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_defaults() {
        let opts = OutputOptions::default();
        assert_eq!((opts.width, opts.height, opts.fps), (1920, 1080, 30));
        assert_eq!(opts.codec, "h264");
        assert_eq!(opts.format, "mp4");
        assert_eq!(opts.crf, 23);
        assert_eq!(opts.preset, "medium");
        assert!(opts.use_gpu);
    }

    #[test]
    fn test_output_defaults_from_partial_json() {
        let opts: OutputOptions = serde_json::from_str(r#"{"width":1280,"height":720,"useGpu":false}"#).unwrap();
        assert_eq!(opts.width, 1280);
        assert_eq!(opts.fps, 30);
        assert!(!opts.use_gpu);
    }

    #[test]
    fn test_request_validation() {
        assert!(GenerateRequest::new("The history of tea", 60.0).validated().is_ok());
        assert!(GenerateRequest::new("", 60.0).validated().is_err());
        assert!(GenerateRequest::new("    ", 60.0).validated().is_err());
        assert!(GenerateRequest::new("Volcanoes", 2.0).validated().is_err());

        let mut req = GenerateRequest::new("Volcanoes", 60.0);
        req.output.fps = 0;
        assert!(req.validated().is_err());
    }

    #[test]
    fn test_odd_dimensions_rejected() {
        let mut req = GenerateRequest::new("Volcanoes", 60.0);
        req.output.width = 1281;
        assert!(matches!(req.validated(), Err(ModelError::InvalidRequest(_))));

        let mut req = GenerateRequest::new("Volcanoes", 60.0);
        req.output.height = 721;
        assert!(req.validated().is_err());

        let mut req = GenerateRequest::new("Volcanoes", 60.0);
        req.output.width = 1280;
        req.output.height = 720;
        assert!(req.validated().is_ok());
    }
}
