//! External content providers.
//!
//! This crate provides:
//! - Provider traits for scripts, images, speech and stock footage
//! - Gemini script (with model fallback) and image clients
//! - Google Text-to-Speech client
//! - Pexels search/download client and the stock-video selection policy

pub mod config;
pub mod error;
pub mod gemini;
pub mod pexels;
pub mod traits;
pub mod tts;

pub use config::{GeminiConfig, PexelsConfig, ProviderConfig, TtsConfig, VoiceConfig};
pub use error::{ProviderError, ProviderResult};
pub use gemini::{parse_script, GeminiImageClient, GeminiScriptClient};
pub use pexels::{select_stock_video, PexelsClient};
pub use traits::{
    ImagePayload, ImageProvider, ScriptProvider, SpeechPayload, SpeechProvider, StockFootageProvider,
    StockVideo, VideoEncode,
};
pub use tts::{estimate_speech_duration, GoogleTtsClient};
