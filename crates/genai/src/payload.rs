use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Encoded image bytes plus their MIME type.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// PNG payload; generated images are always PNG.
    pub fn png(data: Vec<u8>) -> Self {
        Self::new("image/png", data)
    }

    pub fn from_base64(mime_type: impl Into<String>, encoded: &str) -> Result<Self, ServiceError> {
        let data = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|err| ServiceError::invalid_response(format!("invalid base64 image: {err}")))?;
        Ok(Self::new(mime_type, data))
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Multimodal request: inline images followed by one text part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRequest {
    pub images: Vec<ImagePayload>,
    pub prompt: String,
}

impl ContentRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            images: Vec::new(),
            prompt: prompt.into(),
        }
    }

    pub fn with_images(images: Vec<ImagePayload>, prompt: impl Into<String>) -> Self {
        Self {
            images,
            prompt: prompt.into(),
        }
    }
}

/// Image-to-video request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    pub prompt: String,
    pub image: ImagePayload,
}

/// Snapshot of a long-running video operation as last reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoOperation {
    /// Backend operation name, used for polling
    pub name: String,
    pub done: bool,
    /// Error message when the operation finished unsuccessfully
    pub error: Option<String>,
    /// Download URI of the first generated video
    pub video_uri: Option<String>,
}

impl VideoOperation {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            error: None,
            video_uri: None,
        }
    }

    pub fn succeeded(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: true,
            error: None,
            video_uri: Some(uri.into()),
        }
    }

    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: true,
            error: Some(message.into()),
            video_uri: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_decode() {
        let payload = ImagePayload::from_base64("image/png", "aGVsbG8=").unwrap();
        assert_eq!(payload.data, b"hello");
        assert_eq!(payload.to_base64(), "aGVsbG8=");
        assert!(ImagePayload::from_base64("image/png", "not base64!").is_err());
    }

    #[test]
    fn test_debug_hides_bytes() {
        let payload = ImagePayload::png(vec![0; 1024]);
        let debug = format!("{payload:?}");
        assert!(debug.contains("1024"));
        assert!(!debug.contains("0, 0"));
    }
}
