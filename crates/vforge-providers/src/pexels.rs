//! Pexels stock-footage client and selection policy.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::{join_url, require_key, PexelsConfig};
use crate::error::{ProviderError, ProviderResult};
use crate::traits::{StockFootageProvider, StockVideo, VideoEncode};

const PROVIDER: &str = "pexels";

/// Choose a video and encode from search results.
///
/// Picks the first video lasting at least `min_duration`, else the first
/// video. Within it, the first `hd` encode, else the first encode. Videos
/// without encodes are never chosen. `None` only when nothing is usable.
pub fn select_stock_video(videos: &[StockVideo], min_duration: f64) -> Option<(&StockVideo, &VideoEncode)> {
    let usable = || videos.iter().filter(|v| !v.encodes.is_empty());
    let video = usable()
        .find(|v| v.duration >= min_duration)
        .or_else(|| usable().next())?;

    let encode = video
        .encodes
        .iter()
        .find(|e| e.quality.as_deref().is_some_and(|q| q.eq_ignore_ascii_case("hd")))
        .or_else(|| video.encodes.first())?;

    Some((video, encode))
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    videos: Vec<PexelsVideo>,
}

#[derive(Debug, Deserialize)]
struct PexelsVideo {
    id: u64,
    #[serde(default)]
    url: String,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    video_files: Vec<PexelsVideoFile>,
}

#[derive(Debug, Deserialize)]
struct PexelsVideoFile {
    quality: Option<String>,
    file_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    link: String,
}

impl From<PexelsVideo> for StockVideo {
    fn from(v: PexelsVideo) -> Self {
        Self {
            id: v.id,
            url: v.url,
            duration: v.duration,
            encodes: v
                .video_files
                .into_iter()
                .map(|f| VideoEncode {
                    quality: f.quality,
                    link: f.link,
                    width: f.width,
                    height: f.height,
                    file_type: f.file_type,
                })
                .collect(),
        }
    }
}

/// Pexels video search and download.
pub struct PexelsClient {
    http: Client,
    config: PexelsConfig,
}

impl PexelsClient {
    pub fn new(http: Client, config: PexelsConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl StockFootageProvider for PexelsClient {
    async fn search(&self, query: &str, min_duration: f64) -> ProviderResult<Vec<StockVideo>> {
        require_key(PROVIDER, &self.config.api_key)?;
        let url = join_url(&self.config.base_url, "videos/search");

        let response = self
            .http
            .get(&url)
            .header("Authorization", &self.config.api_key)
            .query(&[
                ("query", query.to_string()),
                ("per_page", self.config.per_page.to_string()),
                ("orientation", "landscape".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(PROVIDER, response).await);
        }

        let body: SearchResponse = response.json().await?;
        let videos: Vec<StockVideo> = body.videos.into_iter().map(StockVideo::from).collect();
        debug!(query, min_duration, results = videos.len(), "Pexels search");

        if videos.is_empty() {
            return Err(ProviderError::NoResults {
                provider: PROVIDER,
                query: query.to_string(),
            });
        }
        Ok(videos)
    }

    async fn download(&self, url: &str) -> ProviderResult<Vec<u8>> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::from_response(PROVIDER, response).await);
        }
        Ok(response.bytes().await?.to_vec())
    }
}
