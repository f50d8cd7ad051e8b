//! Visual effect descriptors carried by scenes and EDL clips.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Effect type tag for the pan-and-zoom effect.
pub const KEN_BURNS_EFFECT: &str = "kenBurns";

/// Default starting zoom (no zoom).
pub const DEFAULT_START_ZOOM: f64 = 1.0;
/// Default ending zoom (mild zoom-in).
pub const DEFAULT_END_ZOOM: f64 = 1.15;

/// Easing law applied to zoom and pan interpolation.
///
/// Unrecognized names deserialize to [`Easing::Linear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl Easing {
    /// Parse an easing name, falling back to linear.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "ease-in" | "easein" | "ease_in" => Easing::EaseIn,
            "ease-out" | "easeout" | "ease_out" => Easing::EaseOut,
            "ease-in-out" | "easeinout" | "ease_in_out" => Easing::EaseInOut,
            _ => Easing::Linear,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Easing::Linear => "linear",
            Easing::EaseIn => "ease-in",
            Easing::EaseOut => "ease-out",
            Easing::EaseInOut => "ease-in-out",
        }
    }
}

impl From<String> for Easing {
    fn from(value: String) -> Self {
        Easing::parse(&value)
    }
}

impl From<Easing> for String {
    fn from(value: Easing) -> Self {
        value.as_str().to_string()
    }
}

impl JsonSchema for Easing {
    fn schema_name() -> String {
        "Easing".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(gen)
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ken Burns parameters. Every field is optional and defaults safely.
///
/// Pan coordinates are normalized to `[-1, 1]` where `±1` traverses to the
/// frame edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KenBurnsParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_zoom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_zoom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_y: Option<f64>,
    #[serde(default)]
    pub easing: Easing,
}

impl KenBurnsParams {
    pub fn start_zoom(&self) -> f64 {
        self.start_zoom.unwrap_or(DEFAULT_START_ZOOM)
    }

    pub fn end_zoom(&self) -> f64 {
        self.end_zoom.unwrap_or(DEFAULT_END_ZOOM)
    }

    pub fn start_pan(&self) -> (f64, f64) {
        (self.start_x.unwrap_or(0.0), self.start_y.unwrap_or(0.0))
    }

    pub fn end_pan(&self) -> (f64, f64) {
        (self.end_x.unwrap_or(0.0), self.end_y.unwrap_or(0.0))
    }
}

/// Effect attached to an EDL clip: `{type, params}`.
///
/// Kept open-ended so hand-authored EDLs with effects this renderer does not
/// know still parse; unknown effects are ignored at render time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Effect {
    #[serde(rename = "type")]
    pub effect_type: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl Effect {
    /// Build a Ken Burns effect descriptor.
    pub fn ken_burns(params: &KenBurnsParams) -> Self {
        Self {
            effect_type: KEN_BURNS_EFFECT.to_string(),
            params: serde_json::to_value(params).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn is_ken_burns(&self) -> bool {
        self.effect_type.eq_ignore_ascii_case(KEN_BURNS_EFFECT)
            || self.effect_type.eq_ignore_ascii_case("ken_burns")
    }

    /// Ken Burns parameters if this is a Ken Burns effect.
    ///
    /// Malformed params fall back to defaults rather than failing.
    pub fn as_ken_burns(&self) -> Option<KenBurnsParams> {
        if !self.is_ken_burns() {
            return None;
        }
        if self.params.is_null() {
            return Some(KenBurnsParams::default());
        }
        Some(serde_json::from_value(self.params.clone()).unwrap_or_default())
    }
}

/// Transition kinds the renderer understands.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Dissolve,
    Fade,
    #[serde(other)]
    Unsupported,
}

/// A single edge transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Transition {
    #[serde(rename = "type")]
    pub kind: TransitionKind,
    /// Seconds
    pub duration: f64,
}

impl Transition {
    pub fn dissolve(duration: f64) -> Self {
        Self {
            kind: TransitionKind::Dissolve,
            duration,
        }
    }

    /// Whether this transition renders as a brightness fade.
    pub fn is_fade(&self) -> bool {
        matches!(self.kind, TransitionKind::Dissolve | TransitionKind::Fade) && self.duration > 0.0
    }
}

/// In/out transitions on a clip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Transitions {
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub transition_in: Option<Transition>,
    #[serde(rename = "out", default, skip_serializing_if = "Option::is_none")]
    pub transition_out: Option<Transition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_easing_fallback() {
        assert_eq!(Easing::parse("ease-in-out"), Easing::EaseInOut);
        assert_eq!(Easing::parse("EASE-OUT"), Easing::EaseOut);
        assert_eq!(Easing::parse("bounce"), Easing::Linear);

        let params: KenBurnsParams = serde_json::from_str(r#"{"easing":"wobble"}"#).unwrap();
        assert_eq!(params.easing, Easing::Linear);
    }

    #[test]
    fn test_ken_burns_defaults() {
        let params = KenBurnsParams::default();
        assert_eq!(params.start_zoom(), 1.0);
        assert_eq!(params.end_zoom(), 1.15);
        assert_eq!(params.start_pan(), (0.0, 0.0));
        assert_eq!(params.end_pan(), (0.0, 0.0));
    }

    #[test]
    fn test_effect_roundtrip_through_params() {
        let params = KenBurnsParams {
            start_zoom: Some(1.2),
            end_zoom: Some(1.0),
            end_x: Some(0.5),
            easing: Easing::EaseIn,
            ..Default::default()
        };
        let effect = Effect::ken_burns(&params);
        assert_eq!(effect.effect_type, "kenBurns");
        assert_eq!(effect.as_ken_burns(), Some(params));
    }

    #[test]
    fn test_unknown_effect_is_not_ken_burns() {
        let effect: Effect = serde_json::from_str(r#"{"type":"vignette","params":{"strength":0.3}}"#).unwrap();
        assert!(effect.as_ken_burns().is_none());
    }

    #[test]
    fn test_transition_parsing() {
        let t: Transition = serde_json::from_str(r#"{"type":"wipe","duration":0.4}"#).unwrap();
        assert_eq!(t.kind, TransitionKind::Unsupported);
        assert!(!t.is_fade());

        let t: Transition = serde_json::from_str(r#"{"type":"fade","duration":0.4}"#).unwrap();
        assert!(t.is_fade());
    }
}
