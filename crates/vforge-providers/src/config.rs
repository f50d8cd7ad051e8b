//! Provider configuration.

use std::time::Duration;

use crate::error::{ProviderError, ProviderResult};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TTS_BASE_URL: &str = "https://texttospeech.googleapis.com";
pub const DEFAULT_PEXELS_BASE_URL: &str = "https://api.pexels.com";

/// Script models tried in order until one returns a usable script.
pub const DEFAULT_SCRIPT_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.5-flash-lite", "gemini-2.5-pro"];
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

/// Gemini (script and image) settings.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub script_models: Vec<String>,
    pub image_model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            script_models: DEFAULT_SCRIPT_MODELS.iter().map(|m| m.to_string()).collect(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
        }
    }
}

/// Voice used for narration.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceConfig {
    pub voice_name: String,
    pub language_code: String,
    /// 1.0 is normal speed
    pub speaking_rate: f64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice_name: "en-US-Neural2-D".to_string(),
            language_code: "en-US".to_string(),
            speaking_rate: 1.0,
        }
    }
}

/// Google Text-to-Speech settings.
#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub api_key: String,
    pub base_url: String,
    pub voice: VoiceConfig,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_TTS_BASE_URL.to_string(),
            voice: VoiceConfig::default(),
        }
    }
}

/// Pexels settings.
#[derive(Debug, Clone)]
pub struct PexelsConfig {
    pub api_key: String,
    pub base_url: String,
    /// Results requested per search
    pub per_page: u32,
}

impl Default for PexelsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_PEXELS_BASE_URL.to_string(),
            per_page: 15,
        }
    }
}

/// All provider settings.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub gemini: GeminiConfig,
    pub tts: TtsConfig,
    pub pexels: PexelsConfig,
    /// Per-request HTTP timeout
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            tts: TtsConfig::default(),
            pexels: PexelsConfig::default(),
            timeout: Duration::from_secs(120),
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl ProviderConfig {
    /// Create config from environment variables.
    ///
    /// Missing API keys are left empty; the clients report
    /// [`ProviderError::NotConfigured`] on first use.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let script_models = std::env::var("GEMINI_SCRIPT_MODELS")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|models| !models.is_empty())
            .unwrap_or(defaults.gemini.script_models);

        Self {
            gemini: GeminiConfig {
                api_key: env_or("GEMINI_API_KEY", ""),
                base_url: env_or("GEMINI_BASE_URL", DEFAULT_GEMINI_BASE_URL),
                script_models,
                image_model: env_or("GEMINI_IMAGE_MODEL", DEFAULT_IMAGE_MODEL),
            },
            tts: TtsConfig {
                api_key: env_or("TTS_API_KEY", &env_or("GEMINI_API_KEY", "")),
                base_url: env_or("TTS_BASE_URL", DEFAULT_TTS_BASE_URL),
                voice: VoiceConfig {
                    voice_name: env_or("TTS_VOICE_NAME", &defaults.tts.voice.voice_name),
                    language_code: env_or("TTS_LANGUAGE_CODE", &defaults.tts.voice.language_code),
                    speaking_rate: std::env::var("TTS_SPEAKING_RATE")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .filter(|r: &f64| *r > 0.0)
                        .unwrap_or(defaults.tts.voice.speaking_rate),
                },
            },
            pexels: PexelsConfig {
                api_key: env_or("PEXELS_API_KEY", ""),
                base_url: env_or("PEXELS_BASE_URL", DEFAULT_PEXELS_BASE_URL),
                per_page: defaults.pexels.per_page,
            },
            timeout: Duration::from_secs(
                std::env::var("PROVIDER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.timeout.as_secs()),
            ),
        }
    }

    /// Shared HTTP client with the configured timeout.
    pub fn http_client(&self) -> ProviderResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(ProviderError::Network)
    }
}

pub(crate) fn require_key(provider: &'static str, key: &str) -> ProviderResult<()> {
    if key.trim().is_empty() {
        return Err(ProviderError::not_configured(provider, "API key is empty"));
    }
    Ok(())
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProviderConfig::default();
        assert_eq!(config.gemini.script_models.len(), 3);
        assert_eq!(config.tts.voice.speaking_rate, 1.0);
        assert_eq!(config.pexels.base_url, "https://api.pexels.com");
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://h/", "/v1/x"), "http://h/v1/x");
        assert_eq!(join_url("http://h", "v1/x"), "http://h/v1/x");
    }

    #[test]
    fn test_require_key() {
        assert!(require_key("pexels", "").is_err());
        assert!(require_key("pexels", "abc").is_ok());
    }
}
