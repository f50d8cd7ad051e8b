//! Generated/fetched media assets.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Asset kind as recorded in the EDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum AssetKind {
    #[serde(alias = "image")]
    GeneratedImage,
    #[serde(alias = "video", alias = "stock-video")]
    PexelsVideo,
    #[serde(alias = "audio")]
    GeneratedAudio,
}

impl AssetKind {
    pub fn is_image(&self) -> bool {
        matches!(self, AssetKind::GeneratedImage)
    }

    pub fn is_video(&self) -> bool {
        matches!(self, AssetKind::PexelsVideo)
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, AssetKind::GeneratedAudio)
    }

    /// File extension used when the source carries none.
    pub fn default_extension(&self) -> &'static str {
        match self {
            AssetKind::GeneratedImage => "png",
            AssetKind::PexelsVideo => "mp4",
            AssetKind::GeneratedAudio => "mp3",
        }
    }

    /// MIME type used when persisting the payload.
    pub fn default_content_type(&self) -> &'static str {
        match self {
            AssetKind::GeneratedImage => "image/png",
            AssetKind::PexelsVideo => "video/mp4",
            AssetKind::GeneratedAudio => "audio/mpeg",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::GeneratedImage => "generated-image",
            AssetKind::PexelsVideo => "pexels-video",
            AssetKind::GeneratedAudio => "generated-audio",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role an asset plays for its scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AssetRole {
    Visual,
    Audio,
}

impl AssetRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetRole::Visual => "visual",
            AssetRole::Audio => "audio",
        }
    }

    /// Asset-map key for a (role, scene) pair: `"{role}_{sceneId}"`.
    pub fn key(&self, scene_id: &str) -> String {
        format!("{}_{}", self.as_str(), scene_id)
    }
}

impl fmt::Display for AssetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved asset. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Asset {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: AssetKind,
    /// URI: `http(s)://…`, `file://…`, an absolute path, or an object-store key
    pub source: String,
    /// Seconds; audio only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl Asset {
    pub fn new(id: impl Into<String>, kind: AssetKind, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            source: source.into(),
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Extension of the source path, if it has a plausible one.
    pub fn source_extension(&self) -> Option<String> {
        let path = self
            .source
            .split(['?', '#'])
            .next()
            .unwrap_or(&self.source);
        // Skip the authority of URLs so a bare host is not read as a file name.
        let path = match path.split_once("://") {
            Some((_, rest)) => rest.split_once('/')?.1,
            None => path,
        };
        let file = path.rsplit('/').next()?;
        let (stem, ext) = file.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() || ext.len() > 5 {
            return None;
        }
        if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    /// Extension for the materialized local file: the source's own, else type-inferred.
    pub fn local_extension(&self) -> String {
        self.source_extension()
            .unwrap_or_else(|| self.kind.default_extension().to_string())
    }
}

/// Mapping from asset id to asset. Ordered for stable EDL output.
pub type AssetMap = BTreeMap<String, Asset>;

/// Whether `id` can name a single file or directory without leaving its parent.
pub fn is_path_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_key() {
        assert_eq!(AssetRole::Visual.key("3"), "visual_3");
        assert_eq!(AssetRole::Audio.key("intro"), "audio_intro");
    }

    #[test]
    fn test_kind_serde_names() {
        assert_eq!(
            serde_json::to_string(&AssetKind::PexelsVideo).unwrap(),
            "\"pexels-video\""
        );
        let kind: AssetKind = serde_json::from_str("\"image\"").unwrap();
        assert!(kind.is_image());
    }

    #[test]
    fn test_local_extension() {
        let a = Asset::new("visual_1", AssetKind::GeneratedImage, "jobs/j/assets/visual_1.jpg");
        assert_eq!(a.local_extension(), "jpg");

        let a = Asset::new("audio_1", AssetKind::GeneratedAudio, "https://cdn.example.com/tts/abc");
        assert_eq!(a.local_extension(), "mp3");

        let a = Asset::new(
            "visual_2",
            AssetKind::PexelsVideo,
            "https://videos.pexels.com/video-files/123/clip.MP4?token=x",
        );
        assert_eq!(a.local_extension(), "mp4");

        let a = Asset::new("visual_3", AssetKind::PexelsVideo, "https://example.com/v1.2/stream");
        assert_eq!(a.local_extension(), "mp4");
    }

    #[test]
    fn test_path_safe_ids() {
        assert!(is_path_safe_id("visual_1"));
        assert!(is_path_safe_id("0b9e6a1c-3f2d-4c1e-9d7a-1f2e3d4c5b6a"));
        assert!(!is_path_safe_id("../escaped"));
        assert!(!is_path_safe_id("a/b"));
        assert!(!is_path_safe_id(".."));
        assert!(!is_path_safe_id(""));
    }
}
