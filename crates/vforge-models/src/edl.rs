//! Edit Decision List: the single source of truth for rendering.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::asset::{is_path_safe_id, Asset, AssetMap};
use crate::effects::{Effect, KenBurnsParams, Transitions};
use crate::error::{ModelError, ModelResult};
use crate::request::OutputOptions;

/// Tolerance for timing comparisons (1 ms).
pub const TIMING_EPSILON: f64 = 0.001;

/// Output settings recorded in the EDL metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutputSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: String,
    pub codec: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<String>,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl From<&OutputOptions> for OutputSettings {
    fn from(opts: &OutputOptions) -> Self {
        Self {
            width: opts.width,
            height: opts.height,
            fps: opts.fps,
            format: opts.format.clone(),
            codec: opts.codec.clone(),
            bitrate: opts.bitrate.clone(),
            audio_codec: opts.audio_codec.clone(),
            audio_bitrate: opts.audio_bitrate.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EdlMetadata {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub output: OutputSettings,
}

/// Encoder settings for the render worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderSettings {
    #[serde(default)]
    pub gpu: bool,
    pub preset: String,
    /// CRF-style quality parameter
    pub quality: u8,
}

impl From<&OutputOptions> for RenderSettings {
    fn from(opts: &OutputOptions) -> Self {
        Self {
            gpu: opts.use_gpu,
            preset: opts.preset.clone(),
            quality: opts.crf,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Video => f.write_str("video"),
            TrackKind::Audio => f.write_str("audio"),
        }
    }
}

/// A timeline clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: String,
    pub asset_id: String,
    /// Seconds from timeline start
    pub start_time: f64,
    /// Seconds
    pub duration: f64,
    /// Source offset in seconds for video assets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_point: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transitions: Option<Transitions>,
}

impl Clip {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    pub fn in_point(&self) -> f64 {
        self.in_point.unwrap_or(0.0).max(0.0)
    }

    /// First Ken Burns effect on the clip, if any.
    pub fn ken_burns(&self) -> Option<KenBurnsParams> {
        self.effects.iter().find_map(Effect::as_ken_burns)
    }

    /// Fade-in duration if the clip has a renderable `in` transition.
    pub fn fade_in(&self) -> Option<f64> {
        self.transitions
            .as_ref()
            .and_then(|t| t.transition_in.as_ref())
            .filter(|t| t.is_fade())
            .map(|t| t.duration.min(self.duration))
    }

    /// Fade-out duration if the clip has a renderable `out` transition.
    pub fn fade_out(&self) -> Option<f64> {
        self.transitions
            .as_ref()
            .and_then(|t| t.transition_out.as_ref())
            .filter(|t| t.is_fade())
            .map(|t| t.duration.min(self.duration))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Track {
    #[serde(rename = "type")]
    pub kind: TrackKind,
    #[serde(default)]
    pub clips: Vec<Clip>,
}

impl Track {
    pub fn new(kind: TrackKind) -> Self {
        Self {
            kind,
            clips: Vec::new(),
        }
    }

    /// End time of the last clip, or 0 for an empty track.
    pub fn end_time(&self) -> f64 {
        self.clips.last().map(Clip::end_time).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Timeline {
    /// Seconds; sum of clip durations in presentation order
    pub duration: f64,
    pub tracks: Vec<Track>,
}

/// The EDL document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Edl {
    pub metadata: EdlMetadata,
    pub assets: AssetMap,
    pub timeline: Timeline,
    pub render_settings: RenderSettings,
}

impl Edl {
    /// Parse an EDL from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> ModelResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Pretty-printed UTF-8 JSON for persistence.
    pub fn to_json_pretty(&self) -> ModelResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn track(&self, kind: TrackKind) -> Option<&Track> {
        self.timeline.tracks.iter().find(|t| t.kind == kind)
    }

    pub fn video_clips(&self) -> &[Clip] {
        self.track(TrackKind::Video)
            .map(|t| t.clips.as_slice())
            .unwrap_or(&[])
    }

    pub fn audio_clips(&self) -> &[Clip] {
        self.track(TrackKind::Audio)
            .map(|t| t.clips.as_slice())
            .unwrap_or(&[])
    }

    pub fn asset(&self, id: &str) -> Option<&Asset> {
        self.assets.get(id)
    }

    pub fn output(&self) -> &OutputSettings {
        &self.metadata.output
    }

    /// Validate structural invariants.
    ///
    /// Gaps and overlaps are rejected: the renderer joins segments by track
    /// order and places audio by `startTime`, so non-contiguous timings cannot
    /// be honoured.
    pub fn validate(&self) -> ModelResult<()> {
        let output = &self.metadata.output;
        if output.width == 0 || output.height == 0 {
            return Err(ModelError::invalid_edl("output width/height must be positive"));
        }
        if output.width % 2 != 0 || output.height % 2 != 0 {
            return Err(ModelError::invalid_edl(format!(
                "output resolution {}x{} must have even dimensions",
                output.width, output.height
            )));
        }
        if output.fps == 0 {
            return Err(ModelError::invalid_edl("output fps must be positive"));
        }

        // Asset ids name the downloaded files in the render work directory.
        for (key, asset) in &self.assets {
            if key != &asset.id {
                return Err(ModelError::invalid_edl(format!(
                    "asset keyed '{}' declares id '{}'",
                    key, asset.id
                )));
            }
            if !is_path_safe_id(key) {
                return Err(ModelError::invalid_edl(format!("asset id '{}' is not a plain file name", key)));
            }
        }

        for kind in [TrackKind::Video, TrackKind::Audio] {
            let count = self.timeline.tracks.iter().filter(|t| t.kind == kind).count();
            if count != 1 {
                return Err(ModelError::invalid_edl(format!(
                    "expected exactly one {} track, found {}",
                    kind, count
                )));
            }
        }
        if self.timeline.tracks.len() != 2 {
            return Err(ModelError::invalid_edl(format!(
                "expected exactly two tracks, found {}",
                self.timeline.tracks.len()
            )));
        }

        for track in &self.timeline.tracks {
            let mut expected = 0.0;
            for clip in &track.clips {
                if !self.assets.contains_key(&clip.asset_id) {
                    return Err(ModelError::UnknownAsset {
                        clip_id: clip.id.clone(),
                        asset_id: clip.asset_id.clone(),
                    });
                }
                if !(clip.duration > 0.0) || !clip.duration.is_finite() {
                    return Err(ModelError::invalid_edl(format!(
                        "clip {} has non-positive duration {}",
                        clip.id, clip.duration
                    )));
                }
                if (clip.start_time - expected).abs() > TIMING_EPSILON {
                    return Err(ModelError::NonContiguous {
                        track: track.kind.to_string(),
                        clip_id: clip.id.clone(),
                        expected,
                        found: clip.start_time,
                    });
                }
                expected = clip.end_time();
            }
        }

        let video_end = self.track(TrackKind::Video).map(Track::end_time).unwrap_or(0.0);
        if (self.timeline.duration - video_end).abs() > TIMING_EPSILON {
            return Err(ModelError::invalid_edl(format!(
                "timeline duration {:.3}s does not match video track end {:.3}s",
                self.timeline.duration, video_end
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetKind;
    use crate::effects::Transition;

    fn clip(id: &str, asset_id: &str, start: f64, duration: f64) -> Clip {
        Clip {
            id: id.to_string(),
            asset_id: asset_id.to_string(),
            start_time: start,
            duration,
            in_point: None,
            effects: Vec::new(),
            transitions: None,
        }
    }

    fn sample_edl() -> Edl {
        let mut assets = AssetMap::new();
        assets.insert(
            "visual_1".into(),
            Asset::new("visual_1", AssetKind::GeneratedImage, "jobs/j/assets/visual_1.png"),
        );
        assets.insert(
            "visual_2".into(),
            Asset::new("visual_2", AssetKind::PexelsVideo, "jobs/j/assets/visual_2.mp4"),
        );
        assets.insert(
            "audio_1".into(),
            Asset::new("audio_1", AssetKind::GeneratedAudio, "jobs/j/assets/audio_1.mp3").with_duration(4.0),
        );
        assets.insert(
            "audio_2".into(),
            Asset::new("audio_2", AssetKind::GeneratedAudio, "jobs/j/assets/audio_2.mp3").with_duration(3.0),
        );

        let opts = OutputOptions::default();
        Edl {
            metadata: EdlMetadata {
                title: "Test".into(),
                description: String::new(),
                output: OutputSettings::from(&opts),
            },
            assets,
            timeline: Timeline {
                duration: 7.0,
                tracks: vec![
                    Track {
                        kind: TrackKind::Video,
                        clips: vec![clip("clip_1", "visual_1", 0.0, 4.0), clip("clip_2", "visual_2", 4.0, 3.0)],
                    },
                    Track {
                        kind: TrackKind::Audio,
                        clips: vec![
                            clip("audio_clip_1", "audio_1", 0.0, 4.0),
                            clip("audio_clip_2", "audio_2", 4.0, 3.0),
                        ],
                    },
                ],
            },
            render_settings: RenderSettings::from(&opts),
        }
    }

    #[test]
    fn test_valid_edl() {
        let edl = sample_edl();
        assert!(edl.validate().is_ok());
        assert_eq!(edl.video_clips().len(), 2);
        assert_eq!(edl.audio_clips().len(), 2);
    }

    #[test]
    fn test_unknown_asset_rejected() {
        let mut edl = sample_edl();
        edl.timeline.tracks[0].clips[1].asset_id = "visual_9".into();
        assert!(matches!(edl.validate(), Err(ModelError::UnknownAsset { .. })));
    }

    #[test]
    fn test_gap_rejected() {
        let mut edl = sample_edl();
        edl.timeline.tracks[0].clips[1].start_time = 4.5;
        edl.timeline.duration = 7.5;
        assert!(matches!(edl.validate(), Err(ModelError::NonContiguous { .. })));
    }

    #[test]
    fn test_overlap_rejected() {
        let mut edl = sample_edl();
        edl.timeline.tracks[1].clips[1].start_time = 3.0;
        assert!(matches!(edl.validate(), Err(ModelError::NonContiguous { .. })));
    }

    #[test]
    fn test_asset_id_with_path_components_rejected() {
        let mut edl = sample_edl();
        let mut asset = edl.assets.remove("visual_1").unwrap();
        asset.id = "../../../escaped".into();
        edl.assets.insert(asset.id.clone(), asset);
        edl.timeline.tracks[0].clips[0].asset_id = "../../../escaped".into();
        assert!(matches!(edl.validate(), Err(ModelError::InvalidEdl(_))));
    }

    #[test]
    fn test_asset_key_must_match_id() {
        let mut edl = sample_edl();
        edl.assets.get_mut("visual_1").unwrap().id = "img".into();
        assert!(matches!(edl.validate(), Err(ModelError::InvalidEdl(_))));
    }

    #[test]
    fn test_odd_resolution_rejected() {
        let mut edl = sample_edl();
        edl.metadata.output.width = 1281;
        assert!(matches!(edl.validate(), Err(ModelError::InvalidEdl(_))));
    }

    #[test]
    fn test_duration_mismatch_rejected() {
        let mut edl = sample_edl();
        edl.timeline.duration = 9.0;
        assert!(matches!(edl.validate(), Err(ModelError::InvalidEdl(_))));
    }

    #[test]
    fn test_missing_audio_track_rejected() {
        let mut edl = sample_edl();
        edl.timeline.tracks.pop();
        assert!(edl.validate().is_err());
    }

    #[test]
    fn test_json_shape() {
        let mut edl = sample_edl();
        edl.timeline.tracks[0].clips[1].transitions = Some(Transitions {
            transition_in: Some(Transition::dissolve(0.5)),
            transition_out: None,
        });
        let json: serde_json::Value = serde_json::from_slice(&edl.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["timeline"]["tracks"][0]["type"], "video");
        assert_eq!(json["timeline"]["tracks"][0]["clips"][1]["assetId"], "visual_2");
        assert_eq!(json["timeline"]["tracks"][0]["clips"][1]["startTime"], 4.0);
        assert_eq!(json["timeline"]["tracks"][0]["clips"][1]["transitions"]["in"]["type"], "dissolve");
        assert_eq!(json["assets"]["visual_2"]["type"], "pexels-video");
        assert_eq!(json["renderSettings"]["quality"], 23);
        assert_eq!(json["metadata"]["output"]["audioCodec"], "aac");

        let parsed = Edl::from_json(&edl.to_json_pretty().unwrap()).unwrap();
        assert_eq!(parsed, edl);
    }

    #[test]
    fn test_fade_durations_clamped_to_clip() {
        let mut c = clip("c", "visual_1", 0.0, 0.3);
        c.transitions = Some(Transitions {
            transition_in: Some(Transition::dissolve(0.5)),
            transition_out: Some(Transition::dissolve(0.2)),
        });
        assert_eq!(c.fade_in(), Some(0.3));
        assert_eq!(c.fade_out(), Some(0.2));
    }
}
