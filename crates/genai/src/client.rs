use std::sync::Arc;

use tracing::{debug, info};

use crate::backends::GenerationBackend;
use crate::error::ServiceError;
use crate::options::{AnimationStyle, AspectRatio, OutputType, VideoDuration};
use crate::payload::{ContentRequest, ImagePayload, VideoOperation, VideoRequest};
use crate::prompts;

/// The operations the studio consumes, composed over a backend.
///
/// Nothing here retries: a failure is returned once and the caller decides
/// whether to trigger the operation again.
#[derive(Clone)]
pub struct GenerationClient {
    backend: Arc<dyn GenerationBackend>,
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> Arc<dyn GenerationBackend> {
        Arc::clone(&self.backend)
    }

    pub async fn remove_background(&self, image: &ImagePayload) -> Result<ImagePayload, ServiceError> {
        info!(backend = self.backend.name(), "removing background");
        let request = ContentRequest::with_images(vec![image.clone()], prompts::BACKGROUND_REMOVAL_PROMPT);
        self.backend
            .generate_image(request)
            .await
            .map_err(|err| no_payload_as(err, "Failed to remove background."))
    }

    /// Concept text for the given references or topic. Without either, the
    /// fixed need-input message is returned and the backend is not called.
    pub async fn generate_concept(
        &self,
        images: &[ImagePayload],
        output_type: OutputType,
        topic: Option<&str>,
    ) -> Result<String, ServiceError> {
        let Some(prompt) = prompts::concept_prompt(!images.is_empty(), output_type, topic) else {
            debug!("concept requested without images or topic");
            return Ok(prompts::NEED_INPUT_MESSAGE.to_string());
        };
        info!(backend = self.backend.name(), images = images.len(), "generating concept");
        self.backend
            .generate_text(ContentRequest::with_images(images.to_vec(), prompt))
            .await
    }

    pub async fn generate_image(
        &self,
        prompt: &str,
        output_type: OutputType,
        references: &[ImagePayload],
        aspect_ratio: AspectRatio,
    ) -> Result<ImagePayload, ServiceError> {
        let text = prompts::generation_prompt(prompt, output_type, !references.is_empty(), aspect_ratio.value());
        info!(
            backend = self.backend.name(),
            references = references.len(),
            %aspect_ratio,
            "generating image"
        );
        self.backend
            .generate_image(ContentRequest::with_images(references.to_vec(), text))
            .await
            .map_err(|err| no_payload_as(err, "Image generation failed."))
    }

    pub async fn refine_image(&self, base: &ImagePayload, instruction: &str) -> Result<ImagePayload, ServiceError> {
        info!(backend = self.backend.name(), "refining image");
        let request = ContentRequest::with_images(vec![base.clone()], prompts::refinement_prompt(instruction));
        self.backend
            .generate_image(request)
            .await
            .map_err(|err| no_payload_as(err, "Image refinement failed."))
    }

    /// Submit an image-to-video job. The returned operation must be polled.
    pub async fn start_video(
        &self,
        prompt: &str,
        image: &ImagePayload,
        duration: VideoDuration,
        style: AnimationStyle,
    ) -> Result<VideoOperation, ServiceError> {
        info!(backend = self.backend.name(), %duration, %style, "starting video generation");
        let request = VideoRequest {
            prompt: prompts::video_prompt(prompt, duration, style),
            image: image.clone(),
        };
        self.backend.start_video(request).await
    }

    pub async fn poll_video(&self, operation: &VideoOperation) -> Result<VideoOperation, ServiceError> {
        self.backend.poll_video(operation).await
    }

    pub async fn fetch_video(&self, uri: &str) -> Result<Vec<u8>, ServiceError> {
        self.backend.fetch_media(uri).await
    }
}

fn no_payload_as(err: ServiceError, message: &str) -> ServiceError {
    match err {
        ServiceError::NoPayload(_) => ServiceError::no_payload(message),
        other => other,
    }
}
