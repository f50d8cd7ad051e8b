//! Concurrent asset generation for a script.
//!
//! Every scene issues up to two slots (visual, narration). All slots run
//! concurrently and each settles independently: a failed slot leaves its key
//! out of the asset map and never cancels its siblings.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use vforge_models::{Asset, AssetKind, AssetMap, AssetRole, JobId, Scene, Script, VisualType};
use vforge_providers::{
    estimate_speech_duration, select_stock_video, ImageProvider, ProviderError, SpeechProvider,
    StockFootageProvider, VoiceConfig,
};
use vforge_storage::{content_type_for, JobPaths, ObjectStore};

use crate::error::WorkerResult;
use crate::metrics;

/// One unit of asset work.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot<'a> {
    /// Generate an image from the prompt, falling back to stock footage.
    Image { scene: &'a Scene, prompt: &'a str },
    /// Stock footage for the query.
    Footage { scene: &'a Scene, query: &'a str },
    /// Synthesized narration.
    Narration { scene: &'a Scene },
}

impl<'a> Slot<'a> {
    pub fn scene(&self) -> &'a Scene {
        match self {
            Slot::Image { scene, .. } | Slot::Footage { scene, .. } | Slot::Narration { scene } => scene,
        }
    }

    pub fn role(&self) -> AssetRole {
        match self {
            Slot::Image { .. } | Slot::Footage { .. } => AssetRole::Visual,
            Slot::Narration { .. } => AssetRole::Audio,
        }
    }

    /// Asset-map key this slot writes.
    pub fn key(&self) -> String {
        self.role().key(&self.scene().id)
    }
}

/// Slots to issue for `script`.
///
/// Image visuals need an `imagePrompt`, video visuals a `searchQuery`, and
/// narration non-blank text. Scenes lacking an input simply issue no slot.
pub fn plan_slots(script: &Script) -> Vec<Slot<'_>> {
    let mut slots = Vec::with_capacity(script.scenes.len() * 2);
    for scene in &script.scenes {
        match scene.visual_type {
            VisualType::Image => {
                if let Some(prompt) = non_blank(scene.image_prompt.as_deref()) {
                    slots.push(Slot::Image { scene, prompt });
                }
            }
            VisualType::Video => {
                if let Some(query) = non_blank(scene.search_query.as_deref()) {
                    slots.push(Slot::Footage { scene, query });
                }
            }
        }
        if scene.has_narration() {
            slots.push(Slot::Narration { scene });
        }
    }
    slots
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Which path resolved a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSource {
    Primary,
    Fallback,
}

impl SlotSource {
    fn as_str(&self) -> &'static str {
        match self {
            SlotSource::Primary => "primary",
            SlotSource::Fallback => "fallback",
        }
    }
}

/// A slot whose every path failed.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotFailure {
    pub key: String,
    pub scene_id: String,
    pub role: AssetRole,
    pub reason: String,
}

/// Gathered fan-out result.
#[derive(Debug, Clone, Default)]
pub struct FanoutReport {
    pub assets: AssetMap,
    pub failures: Vec<SlotFailure>,
}

/// Asset fan-out orchestrator.
///
/// Uploads every payload to `jobs/{jobId}/assets/{assetId}.{ext}`; the asset
/// source is the object-store key.
pub struct AssetFanout {
    images: Arc<dyn ImageProvider>,
    speech: Arc<dyn SpeechProvider>,
    footage: Arc<dyn StockFootageProvider>,
    store: Arc<dyn ObjectStore>,
    voice: VoiceConfig,
}

impl AssetFanout {
    pub fn new(
        images: Arc<dyn ImageProvider>,
        speech: Arc<dyn SpeechProvider>,
        footage: Arc<dyn StockFootageProvider>,
        store: Arc<dyn ObjectStore>,
        voice: VoiceConfig,
    ) -> Self {
        Self {
            images,
            speech,
            footage,
            store,
            voice,
        }
    }

    /// Run every slot concurrently and wait for all of them to settle.
    pub async fn run(&self, job_id: &JobId, script: &Script) -> FanoutReport {
        let paths = JobPaths::new(job_id);
        let slots = plan_slots(script);
        info!(job_id = %job_id, slots = slots.len(), scenes = script.scenes.len(), "Starting asset fan-out");

        let results = join_all(slots.iter().map(|slot| self.resolve(&paths, *slot))).await;

        let mut report = FanoutReport::default();
        for (slot, result) in slots.iter().zip(results) {
            let role = slot.role();
            match result {
                Ok((asset, source)) => {
                    metrics::record_slot(role.as_str(), source.as_str());
                    debug!(asset_id = %asset.id, kind = %asset.kind, source = source.as_str(), "Slot resolved");
                    report.assets.insert(slot.key(), asset);
                }
                Err(e) => {
                    metrics::record_slot(role.as_str(), "failed");
                    warn!(job_id = %job_id, asset_id = %slot.key(), error = %e, "Asset slot failed");
                    report.failures.push(SlotFailure {
                        key: slot.key(),
                        scene_id: slot.scene().id.clone(),
                        role,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            job_id = %job_id,
            resolved = report.assets.len(),
            failed = report.failures.len(),
            "Asset fan-out finished"
        );
        report
    }

    async fn resolve(&self, paths: &JobPaths, slot: Slot<'_>) -> WorkerResult<(Asset, SlotSource)> {
        match slot {
            Slot::Image { scene, prompt } => match self.generate_image(paths, scene, prompt).await {
                Ok(asset) => Ok((asset, SlotSource::Primary)),
                Err(primary) => {
                    warn!(scene_id = %scene.id, error = %primary, "Image generation failed, trying stock footage");
                    let Some(query) = scene.footage_query() else {
                        return Err(primary);
                    };
                    let asset = self.fetch_footage(paths, scene, query).await?;
                    Ok((asset, SlotSource::Fallback))
                }
            },
            Slot::Footage { scene, query } => {
                let asset = self.fetch_footage(paths, scene, query).await?;
                Ok((asset, SlotSource::Primary))
            }
            Slot::Narration { scene } => {
                let asset = self.synthesize(paths, scene).await?;
                Ok((asset, SlotSource::Primary))
            }
        }
    }

    async fn generate_image(&self, paths: &JobPaths, scene: &Scene, prompt: &str) -> WorkerResult<Asset> {
        let image = self.images.generate(prompt).await?;
        let id = AssetRole::Visual.key(&scene.id);
        let key = paths.asset_key(&id, image.extension());
        self.store.put(&key, image.data, &image.mime_type).await?;
        Ok(Asset::new(id, AssetKind::GeneratedImage, key))
    }

    async fn fetch_footage(&self, paths: &JobPaths, scene: &Scene, query: &str) -> WorkerResult<Asset> {
        let videos = self.footage.search(query, scene.duration).await?;
        let (video, encode) = select_stock_video(&videos, scene.duration).ok_or_else(|| ProviderError::NoResults {
            provider: "stock-footage",
            query: query.to_string(),
        })?;
        debug!(scene_id = %scene.id, video_id = video.id, quality = ?encode.quality, "Selected stock video");

        let data = self.footage.download(&encode.link).await?;
        let id = AssetRole::Visual.key(&scene.id);
        let key = paths.asset_key(&id, footage_extension(encode.file_type.as_deref()));
        self.store.put(&key, data, content_type_for(&key)).await?;
        Ok(Asset::new(id, AssetKind::PexelsVideo, key))
    }

    async fn synthesize(&self, paths: &JobPaths, scene: &Scene) -> WorkerResult<Asset> {
        let speech = self.speech.synthesize(&scene.narration, &self.voice).await?;
        let duration = speech
            .duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or_else(|| estimate_speech_duration(&scene.narration, self.voice.speaking_rate));

        let id = AssetRole::Audio.key(&scene.id);
        let key = paths.asset_key(&id, AssetKind::GeneratedAudio.default_extension());
        self.store.put(&key, speech.data, content_type_for(&key)).await?;
        Ok(Asset::new(id, AssetKind::GeneratedAudio, key).with_duration(duration))
    }
}

fn footage_extension(file_type: Option<&str>) -> &'static str {
    match file_type {
        Some("video/webm") => "webm",
        Some("video/quicktime") => "mov",
        _ => "mp4",
    }
}
