//! Google Text-to-Speech client.

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{join_url, require_key, TtsConfig, VoiceConfig};
use crate::error::{ProviderError, ProviderResult};
use crate::traits::{SpeechPayload, SpeechProvider};

const PROVIDER: &str = "google-tts";

/// Words per minute at speaking rate 1.0.
pub const WORDS_PER_MINUTE: f64 = 150.0;

/// Estimated narration length: `words / (150 * rate) * 60` seconds.
pub fn estimate_speech_duration(text: &str, speaking_rate: f64) -> f64 {
    let words = text.split_whitespace().count() as f64;
    let rate = if speaking_rate > 0.0 { speaking_rate } else { 1.0 };
    words / (WORDS_PER_MINUTE * rate) * 60.0
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    speaking_rate: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// Google Cloud Text-to-Speech (`v1/text:synthesize`), MP3 output.
pub struct GoogleTtsClient {
    http: Client,
    config: TtsConfig,
}

impl GoogleTtsClient {
    pub fn new(http: Client, config: TtsConfig) -> Self {
        Self { http, config }
    }

    /// Voice configured for this client.
    pub fn voice(&self) -> &VoiceConfig {
        &self.config.voice
    }
}

#[async_trait]
impl SpeechProvider for GoogleTtsClient {
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> ProviderResult<SpeechPayload> {
        require_key(PROVIDER, &self.config.api_key)?;
        let url = join_url(&self.config.base_url, "v1/text:synthesize");

        let request = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &voice.language_code,
                name: &voice.voice_name,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
                speaking_rate: voice.speaking_rate,
            },
        };

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(PROVIDER, response).await);
        }

        let body: SynthesizeResponse = response.json().await?;
        let data = base64::engine::general_purpose::STANDARD
            .decode(body.audio_content.as_bytes())
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        if data.is_empty() {
            return Err(ProviderError::Decode("empty audio content".to_string()));
        }
        debug!(bytes = data.len(), "Synthesized narration");

        // The API does not report duration.
        Ok(SpeechPayload { data, duration: None })
    }
}
