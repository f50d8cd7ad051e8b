//! Provider interfaces consumed by the orchestrator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vforge_models::Script;

use crate::config::VoiceConfig;
use crate::error::ProviderResult;

/// Generated image bytes.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl ImagePayload {
    /// File extension implied by the MIME type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        }
    }
}

/// Synthesized speech.
#[derive(Debug, Clone)]
pub struct SpeechPayload {
    /// MP3 bytes
    pub data: Vec<u8>,
    /// True duration in seconds, when the provider reports it
    pub duration: Option<f64>,
}

/// One downloadable rendition of a stock video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoEncode {
    /// Provider quality label (`hd`, `sd`, `uhd`)
    pub quality: Option<String>,
    pub link: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub file_type: Option<String>,
}

/// A stock-footage search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockVideo {
    pub id: u64,
    pub url: String,
    /// Seconds
    pub duration: f64,
    pub encodes: Vec<VideoEncode>,
}

#[async_trait]
pub trait ScriptProvider: Send + Sync {
    /// Produce a scene script for `topic` lasting about `target_duration` seconds.
    async fn generate(&self, topic: &str, target_duration: f64) -> ProviderResult<Script>;
}

#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> ProviderResult<ImagePayload>;
}

#[async_trait]
pub trait SpeechProvider: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> ProviderResult<SpeechPayload>;
}

#[async_trait]
pub trait StockFootageProvider: Send + Sync {
    /// Search for footage. `min_duration` is advisory; results are not filtered by it.
    async fn search(&self, query: &str, min_duration: f64) -> ProviderResult<Vec<StockVideo>>;

    async fn download(&self, url: &str) -> ProviderResult<Vec<u8>>;
}
