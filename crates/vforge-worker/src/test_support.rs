//! Fakes shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use vforge_models::{JobId, Scene, Script, VisualType};
use vforge_providers::{
    ImagePayload, ImageProvider, ProviderError, ProviderResult, ScriptProvider, SpeechPayload,
    SpeechProvider, StockFootageProvider, StockVideo, VideoEncode, VoiceConfig,
};
use vforge_queue::{JobDispatcher, QueueError, QueueResult};
use vforge_storage::{LocalStore, LocalStoreConfig, ObjectStore};

pub struct FakeImages {
    pub fail: bool,
}

#[async_trait]
impl ImageProvider for FakeImages {
    async fn generate(&self, _prompt: &str) -> ProviderResult<ImagePayload> {
        if self.fail {
            return Err(ProviderError::Api {
                provider: "fake-image",
                status: 429,
                body: "quota".to_string(),
            });
        }
        Ok(ImagePayload {
            data: b"png".to_vec(),
            mime_type: "image/png".to_string(),
        })
    }
}

pub struct FakeSpeech {
    pub duration: Option<f64>,
}

#[async_trait]
impl SpeechProvider for FakeSpeech {
    async fn synthesize(&self, _text: &str, _voice: &VoiceConfig) -> ProviderResult<SpeechPayload> {
        Ok(SpeechPayload {
            data: b"mp3".to_vec(),
            duration: self.duration,
        })
    }
}

pub struct FakeFootage {
    pub empty: bool,
}

#[async_trait]
impl StockFootageProvider for FakeFootage {
    async fn search(&self, query: &str, _min_duration: f64) -> ProviderResult<Vec<StockVideo>> {
        if self.empty {
            return Err(ProviderError::NoResults {
                provider: "fake-footage",
                query: query.to_string(),
            });
        }
        Ok(vec![StockVideo {
            id: 7,
            url: "https://example.com/7".to_string(),
            duration: 30.0,
            encodes: vec![VideoEncode {
                quality: Some("hd".to_string()),
                link: "https://cdn.example.com/7.mp4".to_string(),
                width: Some(1920),
                height: Some(1080),
                file_type: Some("video/mp4".to_string()),
            }],
        }])
    }

    async fn download(&self, _url: &str) -> ProviderResult<Vec<u8>> {
        Ok(b"mp4".to_vec())
    }
}

/// A 5 s scene with every optional input filled in.
pub fn scene(id: &str, visual_type: VisualType) -> Scene {
    Scene {
        id: id.to_string(),
        duration: 5.0,
        narration: "three short words".to_string(),
        visual_type,
        search_query: Some(format!("query {}", id)),
        image_prompt: Some(format!("prompt {}", id)),
        visual_description: None,
        effects: None,
    }
}

pub fn script(scenes: Vec<Scene>) -> Script {
    Script {
        title: "T".to_string(),
        description: String::new(),
        scenes,
    }
}

pub fn local_store(dir: &TempDir) -> Arc<dyn ObjectStore> {
    Arc::new(LocalStore::new(LocalStoreConfig {
        root: dir.path().to_path_buf(),
    }))
}

pub struct FakeScript {
    script: Option<Script>,
    pub calls: AtomicUsize,
}

impl FakeScript {
    pub fn returning(script: Script) -> Self {
        Self {
            script: Some(script),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            script: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ScriptProvider for FakeScript {
    async fn generate(&self, _topic: &str, _target_duration: f64) -> ProviderResult<Script> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .clone()
            .ok_or_else(|| ProviderError::malformed("no JSON in response"))
    }
}

#[derive(Default)]
pub struct FakeDispatcher {
    pub fail: bool,
    pub calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl JobDispatcher for FakeDispatcher {
    async fn dispatch(&self, job_id: &JobId, edl_location: &str) -> QueueResult<String> {
        if self.fail {
            return Err(QueueError::connection_failed("redis unreachable"));
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((job_id.to_string(), edl_location.to_string()));
        }
        Ok("1-0".to_string())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
