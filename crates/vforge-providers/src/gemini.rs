//! Gemini clients for script and image generation.

use std::collections::HashSet;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vforge_models::{is_path_safe_id, Script};

use crate::config::{join_url, require_key, GeminiConfig};
use crate::error::{ProviderError, ProviderResult};
use crate::traits::{ImagePayload, ImageProvider, ScriptProvider};

const PROVIDER: &str = "gemini";

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
}

impl GeminiRequest {
    fn prompt(text: String, generation_config: GenerationConfig) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text }],
            }],
            generation_config,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

impl GeminiResponse {
    fn parts(&self) -> impl Iterator<Item = &ResponsePart> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
    }
}

async fn generate_content(
    http: &Client,
    config: &GeminiConfig,
    model: &str,
    request: &GeminiRequest,
) -> ProviderResult<GeminiResponse> {
    require_key(PROVIDER, &config.api_key)?;
    let url = join_url(&config.base_url, &format!("v1beta/models/{}:generateContent", model));

    let response = http
        .post(&url)
        .query(&[("key", config.api_key.as_str())])
        .json(request)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(ProviderError::from_response(PROVIDER, response).await);
    }
    Ok(response.json().await?)
}

/// Strip a surrounding markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

/// Parse and sanity-check a script returned as model text.
pub fn parse_script(text: &str) -> ProviderResult<Script> {
    let script: Script = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| ProviderError::malformed(format!("script JSON did not parse: {}", e)))?;

    if script.scenes.is_empty() {
        return Err(ProviderError::malformed("script has no scenes"));
    }
    let mut seen = HashSet::new();
    for scene in &script.scenes {
        if scene.id.trim().is_empty() {
            return Err(ProviderError::malformed("scene with empty id"));
        }
        // Scene ids become asset ids, store keys and file names.
        if !is_path_safe_id(&scene.id) {
            return Err(ProviderError::malformed(format!("scene id '{}' is not a plain identifier", scene.id)));
        }
        if !seen.insert(scene.id.as_str()) {
            return Err(ProviderError::malformed(format!("duplicate scene id '{}'", scene.id)));
        }
        if !(scene.duration.is_finite() && scene.duration > 0.0) {
            return Err(ProviderError::malformed(format!(
                "scene '{}' has non-positive duration",
                scene.id
            )));
        }
    }
    Ok(script)
}

fn script_prompt(topic: &str, target_duration: f64) -> String {
    format!(
        r#"You are writing a narrated explainer video about: "{topic}".
The total runtime should be about {target_duration:.0} seconds.

Return ONLY a single JSON object with this schema:
{{
  "title": "Video title",
  "description": "One-paragraph description",
  "scenes": [
    {{
      "id": "1",
      "duration": 6,
      "narration": "What the narrator says during this scene",
      "visualType": "image",
      "imagePrompt": "Detailed prompt for a still image (image scenes)",
      "searchQuery": "Short stock-footage search query (always set)",
      "visualDescription": "What the viewer sees",
      "effects": {{ "kenBurns": {{ "startZoom": 1.0, "endZoom": 1.15, "easing": "ease-in-out" }} }}
    }}
  ]
}}

Rules:
- Scene ids are unique strings.
- visualType is "image" or "video".
- Durations are in seconds and sum to roughly {target_duration:.0}.
- Narration should take about as long to read aloud as the scene lasts.
"#
    )
}

/// Script generation with an ordered model fallback list.
pub struct GeminiScriptClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiScriptClient {
    pub fn new(http: Client, config: GeminiConfig) -> Self {
        Self { http, config }
    }

    async fn call_model(&self, model: &str, prompt: &str) -> ProviderResult<Script> {
        let request = GeminiRequest::prompt(
            prompt.to_string(),
            GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                ..Default::default()
            },
        );
        let response = generate_content(&self.http, &self.config, model, &request).await?;

        let text = response
            .parts()
            .find_map(|p| p.text.as_deref())
            .ok_or_else(|| ProviderError::malformed("no text in Gemini response"))?;
        parse_script(text)
    }
}

#[async_trait]
impl ScriptProvider for GeminiScriptClient {
    async fn generate(&self, topic: &str, target_duration: f64) -> ProviderResult<Script> {
        let prompt = script_prompt(topic, target_duration);
        let mut last_error = None;

        for model in &self.config.script_models {
            info!("Attempting script generation with model: {}", model);
            match self.call_model(model, &prompt).await {
                Ok(script) => {
                    info!(scenes = script.scenes.len(), "Got script from {}", model);
                    return Ok(script);
                }
                Err(e) => {
                    warn!("Script generation failed with model {}: {}", model, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ProviderError::not_configured(PROVIDER, "no script models configured")))
    }
}

/// Image generation returning inline image data.
pub struct GeminiImageClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiImageClient {
    pub fn new(http: Client, config: GeminiConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl ImageProvider for GeminiImageClient {
    async fn generate(&self, prompt: &str) -> ProviderResult<ImagePayload> {
        let request = GeminiRequest::prompt(
            format!("Generate a 16:9 photographic image. {}", prompt),
            GenerationConfig {
                response_modalities: Some(vec!["TEXT".to_string(), "IMAGE".to_string()]),
                ..Default::default()
            },
        );
        let response = generate_content(&self.http, &self.config, &self.config.image_model, &request).await?;

        // Refusals come back as text-only responses.
        let inline = response
            .parts()
            .find_map(|p| p.inline_data.as_ref())
            .ok_or_else(|| ProviderError::Decode("no image data in Gemini response".to_string()))?;

        let data = base64::engine::general_purpose::STANDARD
            .decode(inline.data.as_bytes())
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        debug!(bytes = data.len(), mime = %inline.mime_type, "Decoded generated image");

        Ok(ImagePayload {
            data,
            mime_type: inline.mime_type.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SCRIPT: &str = r#"{"title":"Tea","description":"A history","scenes":[
        {"id":"1","duration":5,"narration":"Tea began in China.","visualType":"image","imagePrompt":"tea leaves"},
        {"id":"2","duration":7,"narration":"It spread west.","visualType":"video","searchQuery":"tea ship"}
    ]}"#;

    fn text_response(text: &str) -> serde_json::Value {
        json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
    }

    fn config(server: &MockServer, models: &[&str]) -> GeminiConfig {
        GeminiConfig {
            api_key: "test-key".to_string(),
            base_url: server.uri(),
            script_models: models.iter().map(|m| m.to_string()).collect(),
            image_model: "img-model".to_string(),
        }
    }

    #[test]
    fn test_parse_script_strips_fences() {
        let script = parse_script(&format!("```json\n{}\n```", SCRIPT)).unwrap();
        assert_eq!(script.scenes.len(), 2);
        assert_eq!(script.title, "Tea");
    }

    #[test]
    fn test_parse_script_rejects_bad_output() {
        assert!(matches!(parse_script("not json"), Err(ProviderError::MalformedOutput(_))));
        assert!(matches!(
            parse_script(r#"{"title":"x","scenes":[]}"#),
            Err(ProviderError::MalformedOutput(_))
        ));
        assert!(matches!(
            parse_script(r#"{"title":"x","scenes":[{"id":"1","duration":0,"visualType":"image"}]}"#),
            Err(ProviderError::MalformedOutput(_))
        ));
        assert!(matches!(
            parse_script(
                r#"{"title":"x","scenes":[{"id":"1","duration":2,"visualType":"image"},{"id":"1","duration":2,"visualType":"video"}]}"#
            ),
            Err(ProviderError::MalformedOutput(_))
        ));
        assert!(matches!(
            parse_script(r#"{"title":"x","scenes":[{"id":"../1","duration":2,"visualType":"image"}]}"#),
            Err(ProviderError::MalformedOutput(_))
        ));
    }

    #[tokio::test]
    async fn test_script_falls_back_to_next_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/first:generateContent"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/second:generateContent"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response(SCRIPT)))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiScriptClient::new(Client::new(), config(&server, &["first", "second"]));
        let script = client.generate("tea", 12.0).await.unwrap();
        assert_eq!(script.scenes[1].search_query.as_deref(), Some("tea ship"));
    }

    #[tokio::test]
    async fn test_script_malformed_when_all_models_return_garbage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("Sorry, I can't help.")))
            .mount(&server)
            .await;

        let client = GeminiScriptClient::new(Client::new(), config(&server, &["a", "b"]));
        let err = client.generate("tea", 30.0).await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let server = MockServer::start().await;
        let mut cfg = config(&server, &["a"]);
        cfg.api_key.clear();
        let err = GeminiScriptClient::new(Client::new(), cfg)
            .generate("tea", 30.0)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured { .. }));
    }

    #[tokio::test]
    async fn test_image_decodes_inline_data() {
        let server = MockServer::start().await;
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"\x89PNG fake");
        Mock::given(method("POST"))
            .and(path("/v1beta/models/img-model:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [
                    {"text": "Here is your image"},
                    {"inlineData": {"mimeType": "image/png", "data": encoded}}
                ]}}]
            })))
            .mount(&server)
            .await;

        let client = GeminiImageClient::new(Client::new(), config(&server, &[]));
        let image = client.generate("tea leaves").await.unwrap();
        assert_eq!(image.data, b"\x89PNG fake");
        assert_eq!(image.extension(), "png");
    }

    #[tokio::test]
    async fn test_image_refusal_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_response("I cannot draw that.")))
            .mount(&server)
            .await;

        let client = GeminiImageClient::new(Client::new(), config(&server, &[]));
        assert!(matches!(
            client.generate("forbidden").await,
            Err(ProviderError::Decode(_))
        ));
    }
}
