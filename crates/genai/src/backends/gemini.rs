/// Gemini API backend integration
///
/// Text and image outputs go through `generateContent`; videos are submitted
/// to the Veo model with `predictLongRunning` and polled by operation name.
use super::{BackendConfig, BackendType, GenerationBackend};
use crate::error::ServiceError;
use crate::payload::{ContentRequest, ImagePayload, VideoOperation, VideoRequest};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Gemini API backend
pub struct GeminiBackend {
    api_base: String,
    api_key: String,
    text_model: String,
    image_model: String,
    video_model: String,
    client: reqwest::Client,
}

impl GeminiBackend {
    /// Create new Gemini backend
    pub fn new(config: BackendConfig) -> Result<Self, ServiceError> {
        let api_key = config
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ServiceError::Configuration("Gemini API key is required.".to_string()))?;
        for model in [&config.text_model, &config.image_model, &config.video_model] {
            if model.trim().is_empty() {
                return Err(ServiceError::Configuration(
                    "Gemini model name is required.".to_string(),
                ));
            }
        }

        let mut builder = reqwest::Client::builder().connect_timeout(Duration::from_secs(20));
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|err| ServiceError::Configuration(format!("HTTP client setup failed: {err}")))?;

        Ok(Self {
            api_base: config
                .api_url
                .unwrap_or_else(|| GEMINI_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.trim().to_string(),
            text_model: config.text_model.trim().to_string(),
            image_model: config.image_model.trim().to_string(),
            video_model: config.video_model.trim().to_string(),
            client,
        })
    }

    fn model_endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.api_base, model, method)
    }

    async fn post_json(&self, url: &str, payload: &Value) -> Result<Value, ServiceError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(payload)
            .send()
            .await?;
        read_json(response).await
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &ContentRequest,
        want_image: bool,
    ) -> Result<GenerateContentResponse, ServiceError> {
        let payload = content_payload(request, want_image);
        debug!(model, images = request.images.len(), "gemini generateContent");
        let body = self
            .post_json(&self.model_endpoint(model, "generateContent"), &payload)
            .await?;
        serde_json::from_value(body)
            .map_err(|err| ServiceError::invalid_response(format!("Invalid Gemini response JSON: {err}")))
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn name(&self) -> &str {
        "Gemini"
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Gemini
    }

    async fn generate_text(&self, request: ContentRequest) -> Result<String, ServiceError> {
        let response = self.generate_content(&self.text_model, &request, false).await?;
        extract_text(&response).ok_or_else(|| ServiceError::no_payload("Gemini returned no text."))
    }

    async fn generate_image(&self, request: ContentRequest) -> Result<ImagePayload, ServiceError> {
        let response = self.generate_content(&self.image_model, &request, true).await?;
        extract_image(&response)?.ok_or_else(|| ServiceError::no_payload("Gemini returned no image."))
    }

    async fn start_video(&self, request: VideoRequest) -> Result<VideoOperation, ServiceError> {
        let payload = json!({
            "instances": [{
                "prompt": request.prompt,
                "image": {
                    "bytesBase64Encoded": request.image.to_base64(),
                    "mimeType": request.image.mime_type,
                }
            }],
            "parameters": { "sampleCount": 1 }
        });
        let body = self
            .post_json(&self.model_endpoint(&self.video_model, "predictLongRunning"), &payload)
            .await?;
        parse_operation(body)
    }

    async fn poll_video(&self, operation: &VideoOperation) -> Result<VideoOperation, ServiceError> {
        let url = format!("{}/v1beta/{}", self.api_base, operation.name.trim_start_matches('/'));
        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;
        parse_operation(read_json(response).await?)
    }

    async fn fetch_media(&self, uri: &str) -> Result<Vec<u8>, ServiceError> {
        // Download links are time-limited and need the key on the query string.
        let response = self
            .client
            .get(uri)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message: format!("Failed to fetch video: {}", status.canonical_reason().unwrap_or("")),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, ServiceError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| ServiceError::transport(format!("Read Gemini response failed: {err}")))?;
    if !status.is_success() {
        return Err(ServiceError::Api {
            status: status.as_u16(),
            message: api_error_message(&body),
        });
    }
    serde_json::from_str(&body)
        .map_err(|err| ServiceError::invalid_response(format!("Invalid Gemini response JSON: {err}")))
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

fn content_payload(request: &ContentRequest, want_image: bool) -> Value {
    let mut parts: Vec<Value> = request
        .images
        .iter()
        .map(|image| {
            json!({
                "inlineData": { "mimeType": image.mime_type, "data": image.to_base64() }
            })
        })
        .collect();
    parts.push(json!({ "text": request.prompt }));

    let mut payload = json!({ "contents": [{ "role": "user", "parts": parts }] });
    if want_image {
        payload["generationConfig"] = json!({ "responseModalities": ["IMAGE", "TEXT"] });
    }
    payload
}

fn extract_text(response: &GenerateContentResponse) -> Option<String> {
    let text = response
        .candidates
        .first()?
        .content
        .as_ref()?
        .parts
        .iter()
        .filter_map(|p| p.text.as_deref())
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

fn extract_image(response: &GenerateContentResponse) -> Result<Option<ImagePayload>, ServiceError> {
    let inline = response
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .and_then(|content| content.parts.iter().find_map(|p| p.inline_data.as_ref()));
    match inline {
        Some(data) => {
            let mime = data.mime_type.clone().unwrap_or_else(|| "image/png".to_string());
            ImagePayload::from_base64(mime, &data.data).map(Some)
        }
        None => Ok(None),
    }
}

fn parse_operation(body: Value) -> Result<VideoOperation, ServiceError> {
    let raw: OperationResponse = serde_json::from_value(body)
        .map_err(|err| ServiceError::invalid_response(format!("Invalid operation JSON: {err}")))?;
    let error = raw.error.map(|e| {
        e.message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "Unknown error during video generation.".to_string())
    });
    let video_uri = raw
        .response
        .and_then(|r| r.generate_video_response)
        .and_then(|r| r.generated_samples.into_iter().next())
        .and_then(|s| s.video)
        .and_then(|v| v.uri);
    Ok(VideoOperation {
        name: raw.name,
        done: raw.done,
        error,
        video_uri,
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
    #[serde(default, rename = "inlineData")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    #[serde(default, rename = "mimeType")]
    mime_type: Option<String>,
    data: String,
}

#[derive(Debug, Deserialize)]
struct OperationResponse {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<OperationError>,
    #[serde(default)]
    response: Option<OperationResult>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OperationResult {
    #[serde(default, rename = "generateVideoResponse")]
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Deserialize)]
struct GenerateVideoResponse {
    #[serde(default, rename = "generatedSamples")]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Deserialize)]
struct GeneratedSample {
    #[serde(default)]
    video: Option<VideoRef>,
}

#[derive(Debug, Deserialize)]
struct VideoRef {
    #[serde(default)]
    uri: Option<String>,
}
