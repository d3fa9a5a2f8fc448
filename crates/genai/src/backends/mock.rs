/// Scripted in-process backend.
///
/// Each operation pops the next scripted result from its own queue and falls
/// back to a canned success once the queue is empty. Every call is recorded
/// so callers can assert how many remote calls an operation made.
use super::{BackendType, GenerationBackend};
use crate::error::ServiceError;
use crate::payload::{ContentRequest, ImagePayload, VideoOperation, VideoRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

pub const MOCK_CONCEPT: &str = "A moody, rain-soaked neon skyline framing a lone figure.";
pub const MOCK_VIDEO_URI: &str = "mock://videos/0.mp4";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockCallKind {
    Text,
    Image,
    StartVideo,
    PollVideo,
    FetchMedia,
}

/// A call observed by the mock backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub kind: MockCallKind,
    /// Prompt text, operation name or URI depending on the call
    pub detail: String,
    pub image_count: usize,
}

/// Holds one call open until the test releases it.
#[derive(Debug, Default)]
pub struct MockGate {
    entered: Notify,
    release: Notify,
}

impl MockGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Wait until the gated call has started
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let the gated call return
    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[derive(Default)]
struct Scripts {
    texts: VecDeque<Result<String, ServiceError>>,
    images: VecDeque<Result<ImagePayload, ServiceError>>,
    video_starts: VecDeque<Result<VideoOperation, ServiceError>>,
    polls: VecDeque<Result<VideoOperation, ServiceError>>,
    media: VecDeque<Result<Vec<u8>, ServiceError>>,
}

#[derive(Default)]
pub struct MockBackend {
    scripts: Mutex<Scripts>,
    calls: Mutex<Vec<MockCall>>,
    gate: Mutex<Option<Arc<MockGate>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text(&self, result: Result<String, ServiceError>) -> &Self {
        self.scripts.lock().texts.push_back(result);
        self
    }

    pub fn push_image(&self, result: Result<ImagePayload, ServiceError>) -> &Self {
        self.scripts.lock().images.push_back(result);
        self
    }

    pub fn push_video_start(&self, result: Result<VideoOperation, ServiceError>) -> &Self {
        self.scripts.lock().video_starts.push_back(result);
        self
    }

    pub fn push_poll(&self, result: Result<VideoOperation, ServiceError>) -> &Self {
        self.scripts.lock().polls.push_back(result);
        self
    }

    pub fn push_media(&self, result: Result<Vec<u8>, ServiceError>) -> &Self {
        self.scripts.lock().media.push_back(result);
        self
    }

    /// Gate the next call; it blocks after being recorded until released.
    pub fn gate_next_call(&self) -> Arc<MockGate> {
        let gate = MockGate::new();
        *self.gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn count_of(&self, kind: MockCallKind) -> usize {
        self.calls.lock().iter().filter(|c| c.kind == kind).count()
    }

    async fn record(&self, kind: MockCallKind, detail: &str, image_count: usize) {
        self.calls.lock().push(MockCall {
            kind,
            detail: detail.to_string(),
            image_count,
        });
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    fn name(&self) -> &str {
        "Mock"
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Mock
    }

    async fn generate_text(&self, request: ContentRequest) -> Result<String, ServiceError> {
        self.record(MockCallKind::Text, &request.prompt, request.images.len())
            .await;
        let next = self.scripts.lock().texts.pop_front();
        next.unwrap_or_else(|| Ok(MOCK_CONCEPT.to_string()))
    }

    async fn generate_image(&self, request: ContentRequest) -> Result<ImagePayload, ServiceError> {
        self.record(MockCallKind::Image, &request.prompt, request.images.len())
            .await;
        let next = self.scripts.lock().images.pop_front();
        next.unwrap_or_else(|| Ok(ImagePayload::png(b"mock-image".to_vec())))
    }

    async fn start_video(&self, request: VideoRequest) -> Result<VideoOperation, ServiceError> {
        self.record(MockCallKind::StartVideo, &request.prompt, 1).await;
        let next = self.scripts.lock().video_starts.pop_front();
        next.unwrap_or_else(|| Ok(VideoOperation::pending("operations/mock-0")))
    }

    async fn poll_video(&self, operation: &VideoOperation) -> Result<VideoOperation, ServiceError> {
        self.record(MockCallKind::PollVideo, &operation.name, 0).await;
        let next = self.scripts.lock().polls.pop_front();
        next.unwrap_or_else(|| Ok(VideoOperation::succeeded(operation.name.clone(), MOCK_VIDEO_URI)))
    }

    async fn fetch_media(&self, uri: &str) -> Result<Vec<u8>, ServiceError> {
        self.record(MockCallKind::FetchMedia, uri, 0).await;
        let next = self.scripts.lock().media.pop_front();
        next.unwrap_or_else(|| Ok(b"mock-video".to_vec()))
    }
}
