//! Scene script produced by the script provider.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::effects::KenBurnsParams;

/// Kind of visual a scene asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum VisualType {
    Image,
    Video,
}

impl fmt::Display for VisualType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisualType::Image => f.write_str("image"),
            VisualType::Video => f.write_str("video"),
        }
    }
}

/// Optional per-scene effect hints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SceneEffects {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ken_burns: Option<KenBurnsParams>,
}

/// A single scene of the script. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// Scene identifier, unique within the script
    pub id: String,
    /// Declared duration in seconds
    pub duration: f64,
    /// Narration text (may be empty)
    #[serde(default)]
    pub narration: String,
    pub visual_type: VisualType,
    /// Stock-footage search query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    /// Prompt for image generation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
    /// Free-form description of the visual; last-resort footage query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<SceneEffects>,
}

impl Scene {
    /// Whether narration audio should be synthesized for this scene.
    pub fn has_narration(&self) -> bool {
        !self.narration.trim().is_empty()
    }

    /// Query used for stock-footage search: `searchQuery`, else `visualDescription`.
    pub fn footage_query(&self) -> Option<&str> {
        self.search_query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .or_else(|| {
                self.visual_description
                    .as_deref()
                    .filter(|q| !q.trim().is_empty())
            })
    }

    /// Ken Burns hint declared on the scene, if any.
    pub fn ken_burns(&self) -> Option<&KenBurnsParams> {
        self.effects.as_ref().and_then(|e| e.ken_burns.as_ref())
    }
}

/// Full script returned by the script provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub scenes: Vec<Scene>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_deserialize_camel_case() {
        let json = r#"{
            "id": "s1",
            "duration": 6.5,
            "narration": "Deep under the sea.",
            "visualType": "image",
            "imagePrompt": "bioluminescent jellyfish",
            "effects": {"kenBurns": {"startZoom": 1.1, "easing": "ease-in-out"}}
        }"#;
        let scene: Scene = serde_json::from_str(json).unwrap();
        assert_eq!(scene.visual_type, VisualType::Image);
        assert_eq!(scene.image_prompt.as_deref(), Some("bioluminescent jellyfish"));
        assert_eq!(scene.ken_burns().unwrap().start_zoom(), 1.1);
        assert!(scene.has_narration());
    }

    #[test]
    fn test_footage_query_falls_back_to_description() {
        let mut scene: Scene = serde_json::from_str(
            r#"{"id":"s2","duration":4,"visualType":"video","visualDescription":"city at night"}"#,
        )
        .unwrap();
        assert_eq!(scene.footage_query(), Some("city at night"));

        scene.search_query = Some("  ".to_string());
        assert_eq!(scene.footage_query(), Some("city at night"));

        scene.search_query = Some("neon street".to_string());
        assert_eq!(scene.footage_query(), Some("neon street"));
        assert!(!scene.has_narration());
    }
}
