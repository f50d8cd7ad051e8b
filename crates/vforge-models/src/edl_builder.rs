//! Builds an EDL from a scene script and the resolved asset map.
//!
//! The builder is deterministic and total: scenes whose visual or narration
//! asset did not resolve are dropped (and reported), never turned into errors.

use tracing::warn;

use crate::asset::{AssetMap, AssetRole};
use crate::edl::{Clip, Edl, EdlMetadata, OutputSettings, RenderSettings, Timeline, Track, TrackKind};
use crate::effects::{Effect, Transition, Transitions};
use crate::request::OutputOptions;
use crate::script::Script;

/// Dissolve applied to the `in` edge of every clip after the first.
pub const DEFAULT_DISSOLVE_SECS: f64 = 0.5;

/// A scene left out of the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedScene {
    pub scene_id: String,
    pub missing: Vec<AssetRole>,
}

/// Builder output: the EDL plus the scenes that were dropped.
#[derive(Debug, Clone)]
pub struct EdlBuild {
    pub edl: Edl,
    pub dropped_scenes: Vec<DroppedScene>,
}

/// EDL builder.
#[derive(Debug, Clone)]
pub struct EdlBuilder {
    output: OutputOptions,
    dissolve_secs: f64,
}

impl EdlBuilder {
    pub fn new(output: OutputOptions) -> Self {
        Self {
            output,
            dissolve_secs: DEFAULT_DISSOLVE_SECS,
        }
    }

    /// Build the timeline.
    pub fn build(&self, script: &Script, assets: &AssetMap) -> EdlBuild {
        let mut video = Track::new(TrackKind::Video);
        let mut audio = Track::new(TrackKind::Audio);
        let mut dropped_scenes = Vec::new();
        let mut current_time = 0.0;

        for scene in &script.scenes {
            let visual = assets.get(&AssetRole::Visual.key(&scene.id));
            let narration = assets.get(&AssetRole::Audio.key(&scene.id));

            let (visual, narration) = match (visual, narration) {
                (Some(v), Some(n)) => (v, n),
                (v, n) => {
                    let mut missing = Vec::new();
                    if v.is_none() {
                        missing.push(AssetRole::Visual);
                    }
                    if n.is_none() {
                        missing.push(AssetRole::Audio);
                    }
                    warn!(
                        scene_id = %scene.id,
                        missing = ?missing,
                        "Dropping scene from timeline: assets unresolved"
                    );
                    dropped_scenes.push(DroppedScene {
                        scene_id: scene.id.clone(),
                        missing,
                    });
                    continue;
                }
            };

            // Narration length governs real playback time.
            let duration = narration
                .duration
                .filter(|d| d.is_finite() && *d > 0.0)
                .unwrap_or(scene.duration);

            let effects = if visual.kind.is_image() {
                let params = scene.ken_burns().cloned().unwrap_or_default();
                vec![Effect::ken_burns(&params)]
            } else {
                Vec::new()
            };

            let transitions = if video.clips.is_empty() {
                None
            } else {
                Some(Transitions {
                    transition_in: Some(Transition::dissolve(self.dissolve_secs)),
                    transition_out: None,
                })
            };

            video.clips.push(Clip {
                id: format!("clip_video_{}", scene.id),
                asset_id: visual.id.clone(),
                start_time: current_time,
                duration,
                in_point: None,
                effects,
                transitions,
            });

            audio.clips.push(Clip {
                id: format!("clip_audio_{}", scene.id),
                asset_id: narration.id.clone(),
                start_time: current_time,
                duration,
                in_point: None,
                effects: Vec::new(),
                transitions: None,
            });

            current_time += duration;
        }

        // Only assets referenced by surviving clips go into the document.
        let referenced: AssetMap = video
            .clips
            .iter()
            .chain(audio.clips.iter())
            .filter_map(|c| assets.get(&c.asset_id).map(|a| (a.id.clone(), a.clone())))
            .collect();

        let edl = Edl {
            metadata: EdlMetadata {
                title: script.title.clone(),
                description: script.description.clone(),
                output: OutputSettings::from(&self.output),
            },
            assets: referenced,
            timeline: Timeline {
                duration: current_time,
                tracks: vec![video, audio],
            },
            render_settings: RenderSettings::from(&self.output),
        };

        EdlBuild {
            edl,
            dropped_scenes,
        }
    }
}

/// Convenience wrapper returning only the EDL.
pub fn build_edl(script: &Script, assets: &AssetMap, output: &OutputOptions) -> Edl {
    EdlBuilder::new(output.clone()).build(script, assets).edl
}
