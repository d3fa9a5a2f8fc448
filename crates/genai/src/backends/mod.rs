/// Generation backends abstraction
///
/// Provides a unified interface over the services that produce content:
/// - Gemini REST API (text, image and Veo video models)
/// - Scripted mock backend for tests and offline dry runs

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

pub use gemini::GeminiBackend;
pub use mock::MockBackend;

use crate::error::ServiceError;
use crate::payload::{ContentRequest, ImagePayload, VideoOperation, VideoRequest};

/// Backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Google Gemini API
    #[default]
    Gemini,
    /// Scripted in-process backend
    Mock,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::Mock => write!(f, "mock"),
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "mock" => Ok(Self::Mock),
            other => Err(format!("unknown backend '{other}'")),
        }
    }
}

/// Low-level generation backend. Prompts are already composed by the caller.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Backend name
    fn name(&self) -> &str;

    /// Backend type
    fn backend_type(&self) -> BackendType;

    /// Text completion over optional inline images
    async fn generate_text(&self, request: ContentRequest) -> Result<String, ServiceError>;

    /// Image output over optional inline images
    async fn generate_image(&self, request: ContentRequest) -> Result<ImagePayload, ServiceError>;

    /// Submit an image-to-video job
    async fn start_video(&self, request: VideoRequest) -> Result<VideoOperation, ServiceError>;

    /// Fetch the current state of a video job
    async fn poll_video(&self, operation: &VideoOperation) -> Result<VideoOperation, ServiceError>;

    /// Download generated media from a URI returned by the service
    async fn fetch_media(&self, uri: &str) -> Result<Vec<u8>, ServiceError>;
}

pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_VIDEO_MODEL: &str = "veo-2.0-generate-001";

/// Backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend type
    #[serde(default)]
    pub backend_type: BackendType,

    /// API base URL (defaults to the public endpoint)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// API key; normally supplied through the environment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_text_model")]
    pub text_model: String,

    #[serde(default = "default_image_model")]
    pub image_model: String,

    #[serde(default = "default_video_model")]
    pub video_model: String,

    /// Per-request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_text_model() -> String {
    DEFAULT_TEXT_MODEL.to_string()
}

fn default_image_model() -> String {
    DEFAULT_IMAGE_MODEL.to_string()
}

fn default_video_model() -> String {
    DEFAULT_VIDEO_MODEL.to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(BackendType::Gemini)
    }
}

impl BackendConfig {
    /// Create new backend config
    pub fn new(backend_type: BackendType) -> Self {
        Self {
            backend_type,
            api_url: None,
            api_key: None,
            text_model: default_text_model(),
            image_model: default_image_model(),
            video_model: default_video_model(),
            timeout_secs: Some(120),
        }
    }

    /// With API endpoint
    pub fn with_api_url(mut self, url: String) -> Self {
        self.api_url = Some(url);
        self
    }

    /// With API key
    pub fn with_api_key(mut self, key: String) -> Self {
        self.api_key = Some(key);
        self
    }

    /// With timeout
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Fill the API key from `GEMINI_API_KEY`, then `API_KEY`, unless one is set
    pub fn with_env_api_key(mut self) -> Self {
        if self.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            self.api_key = ["GEMINI_API_KEY", "API_KEY"]
                .iter()
                .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()));
        }
        self
    }

    /// Save configuration to JSON
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Load configuration from JSON
    pub fn load(path: &Path) -> Result<Self, std::io::Error> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Backend factory for creating backend instances
pub struct BackendFactory;

impl BackendFactory {
    /// Create backend from config
    pub fn create(config: BackendConfig) -> Result<Arc<dyn GenerationBackend>, ServiceError> {
        match config.backend_type {
            BackendType::Gemini => Ok(Arc::new(GeminiBackend::new(config)?)),
            BackendType::Mock => Ok(Arc::new(MockBackend::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_config() {
        let config = BackendConfig::new(BackendType::Gemini)
            .with_api_url("http://localhost:8080".to_string())
            .with_timeout(30);

        assert_eq!(config.backend_type, BackendType::Gemini);
        assert_eq!(config.api_url, Some("http://localhost:8080".to_string()));
        assert_eq!(config.timeout_secs, Some(30));
        assert_eq!(config.image_model, DEFAULT_IMAGE_MODEL);
    }

    #[test]
    fn test_backend_type_display() {
        assert_eq!(BackendType::Gemini.to_string(), "gemini");
        assert_eq!(BackendType::Mock.to_string(), "mock");
        assert_eq!("MOCK".parse::<BackendType>().unwrap(), BackendType::Mock);
    }

    #[test]
    fn test_config_defaults_from_sparse_json() {
        let config: BackendConfig = serde_json::from_str(r#"{"backend_type":"mock"}"#).unwrap();
        assert_eq!(config.backend_type, BackendType::Mock);
        assert_eq!(config.video_model, DEFAULT_VIDEO_MODEL);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_explicit_key_wins_over_env() {
        let config = BackendConfig::new(BackendType::Gemini)
            .with_api_key("explicit".to_string())
            .with_env_api_key();
        assert_eq!(config.api_key.as_deref(), Some("explicit"));
    }

    #[test]
    fn test_factory_builds_mock() {
        let backend = BackendFactory::create(BackendConfig::new(BackendType::Mock)).unwrap();
        assert_eq!(backend.backend_type(), BackendType::Mock);
    }
}
