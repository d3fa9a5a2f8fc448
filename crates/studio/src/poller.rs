/// Long-running video generation
///
/// `Idle -> Requested -> Polling -> {Succeeded, Failed}`. The job is polled at
/// a fixed interval through an injectable [`Sleeper`]. A failed poll request
/// is terminal; nothing is retried.
use async_trait::async_trait;
use genai::{AnimationStyle, GenerationClient, ImagePayload, ServiceError, VideoDuration};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Result, StudioError};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PollPhase {
    Idle,
    Requested,
    Polling,
    Succeeded,
    Failed,
}

impl PollPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollPhase::Succeeded | PollPhase::Failed)
    }
}

/// Waits between poll attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested delays and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
    }
}

/// Inputs of one image-to-video request
#[derive(Debug, Clone)]
pub struct VideoJob {
    pub prompt: String,
    pub image: ImagePayload,
    pub duration: VideoDuration,
    pub style: AnimationStyle,
}

pub struct VideoPoller<'a> {
    sleeper: &'a dyn Sleeper,
    interval: Duration,
    phase: PollPhase,
    transitions: Vec<PollPhase>,
    polls: u32,
}

impl<'a> VideoPoller<'a> {
    pub fn new(sleeper: &'a dyn Sleeper, interval: Duration) -> Self {
        Self {
            sleeper,
            interval,
            phase: PollPhase::Idle,
            transitions: vec![PollPhase::Idle],
            polls: 0,
        }
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    /// Every phase entered so far, starting with `Idle`. Each poll that
    /// reports the job as unfinished re-enters `Polling`.
    pub fn transitions(&self) -> &[PollPhase] {
        &self.transitions
    }

    pub fn poll_count(&self) -> u32 {
        self.polls
    }

    /// Submit the job, poll it to completion and download the video bytes.
    pub async fn run(&mut self, client: &GenerationClient, job: &VideoJob) -> Result<Vec<u8>> {
        if self.phase != PollPhase::Idle {
            return Err(StudioError::invalid("video poller has already been started"));
        }
        self.enter(PollPhase::Requested);

        let mut operation = match client
            .start_video(&job.prompt, &job.image, job.duration, job.style)
            .await
        {
            Ok(op) => op,
            Err(err) => return Err(self.fail(err.into())),
        };
        info!(operation = %operation.name, "video generation accepted");
        self.enter(PollPhase::Polling);

        while !operation.done {
            self.sleeper.sleep(self.interval).await;
            self.polls += 1;
            debug!(operation = %operation.name, attempt = self.polls, "polling video operation");
            operation = match client.poll_video(&operation).await {
                Ok(next) => next,
                Err(err) => return Err(self.fail(poll_error(err))),
            };
            if !operation.done {
                self.enter(PollPhase::Polling);
            }
        }

        if let Some(message) = operation.error {
            return Err(self.fail(StudioError::Service(format!("Video generation failed: {message}"))));
        }
        let Some(uri) = operation.video_uri else {
            return Err(self.fail(StudioError::Service(
                "Video generation failed to produce a valid link.".to_string(),
            )));
        };

        match client.fetch_video(&uri).await {
            Ok(bytes) => {
                self.enter(PollPhase::Succeeded);
                info!(bytes = bytes.len(), polls = self.polls, "video downloaded");
                Ok(bytes)
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    fn enter(&mut self, phase: PollPhase) {
        self.phase = phase;
        self.transitions.push(phase);
    }

    fn fail(&mut self, err: StudioError) -> StudioError {
        debug!(error = %err, polls = self.polls, "video operation failed");
        self.enter(PollPhase::Failed);
        err
    }
}

fn poll_error(err: ServiceError) -> StudioError {
    match StudioError::from(err) {
        StudioError::Transport(msg) => {
            StudioError::Transport(format!("Polling for video generation status failed: {msg}"))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genai::backends::mock::{MockBackend, MockCallKind};
    use genai::VideoOperation;
    use std::sync::Arc;

    fn job() -> VideoJob {
        VideoJob {
            prompt: "sunset".to_string(),
            image: ImagePayload::png(b"img".to_vec()),
            duration: VideoDuration::default(),
            style: AnimationStyle::default(),
        }
    }

    fn setup() -> (Arc<MockBackend>, GenerationClient) {
        let backend = Arc::new(MockBackend::new());
        (backend.clone(), GenerationClient::new(backend))
    }

    #[tokio::test]
    async fn test_start_failure_is_terminal() {
        let (backend, client) = setup();
        backend.push_video_start(Err(ServiceError::Api {
            status: 400,
            message: "bad image".to_string(),
        }));
        let sleeper = RecordingSleeper::new();
        let mut poller = VideoPoller::new(&sleeper, DEFAULT_POLL_INTERVAL);

        let err = poller.run(&client, &job()).await.unwrap_err();
        assert!(matches!(err, StudioError::Service(_)));
        assert_eq!(
            poller.transitions(),
            &[PollPhase::Idle, PollPhase::Requested, PollPhase::Failed]
        );
        assert_eq!(backend.count_of(MockCallKind::PollVideo), 0);
    }

    #[tokio::test]
    async fn test_done_on_submit_skips_polling() {
        let (backend, client) = setup();
        backend.push_video_start(Ok(VideoOperation::succeeded("op", "mock://v")));
        let sleeper = RecordingSleeper::new();
        let mut poller = VideoPoller::new(&sleeper, DEFAULT_POLL_INTERVAL);

        let bytes = poller.run(&client, &job()).await.unwrap();
        assert_eq!(bytes, b"mock-video");
        assert_eq!(poller.poll_count(), 0);
        assert!(sleeper.slept().is_empty());
        assert_eq!(backend.calls().last().unwrap().detail, "mock://v");
    }

    #[tokio::test]
    async fn test_transport_fault_while_polling_is_not_retried() {
        let (backend, client) = setup();
        backend.push_poll(Err(ServiceError::transport("connection reset")));
        let sleeper = RecordingSleeper::new();
        let mut poller = VideoPoller::new(&sleeper, DEFAULT_POLL_INTERVAL);

        let err = poller.run(&client, &job()).await.unwrap_err();
        assert!(matches!(err, StudioError::Transport(ref m) if m.starts_with("Polling for video")));
        assert_eq!(poller.phase(), PollPhase::Failed);
        assert_eq!(backend.count_of(MockCallKind::PollVideo), 1);
    }

    #[tokio::test]
    async fn test_missing_link_fails() {
        let (backend, client) = setup();
        backend.push_poll(Ok(VideoOperation {
            name: "op".to_string(),
            done: true,
            error: None,
            video_uri: None,
        }));
        let sleeper = RecordingSleeper::new();
        let mut poller = VideoPoller::new(&sleeper, DEFAULT_POLL_INTERVAL);

        let err = poller.run(&client, &job()).await.unwrap_err();
        assert_eq!(
            err,
            StudioError::Service("Video generation failed to produce a valid link.".to_string())
        );
        assert_eq!(backend.count_of(MockCallKind::FetchMedia), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_after_successful_poll() {
        let (backend, client) = setup();
        backend.push_media(Err(ServiceError::transport("expired link")));
        let sleeper = RecordingSleeper::new();
        let mut poller = VideoPoller::new(&sleeper, DEFAULT_POLL_INTERVAL);

        let err = poller.run(&client, &job()).await.unwrap_err();
        assert!(matches!(err, StudioError::Transport(_)));
        assert_eq!(poller.transitions().last(), Some(&PollPhase::Failed));
        assert!(!poller.transitions().contains(&PollPhase::Succeeded));
    }

    #[test]
    fn test_recording_sleeper_does_not_wait() {
        let sleeper = RecordingSleeper::new();
        tokio_test::block_on(async {
            sleeper.sleep(Duration::from_secs(3600)).await;
            TokioSleeper.sleep(Duration::ZERO).await;
        });
        assert_eq!(sleeper.slept(), vec![Duration::from_secs(3600)]);
        assert!(PollPhase::Failed.is_terminal());
        assert!(!PollPhase::Polling.is_terminal());
    }

    #[tokio::test]
    async fn test_poller_runs_once() {
        let (_backend, client) = setup();
        let sleeper = RecordingSleeper::new();
        let mut poller = VideoPoller::new(&sleeper, DEFAULT_POLL_INTERVAL);
        poller.run(&client, &job()).await.unwrap();
        assert!(poller.run(&client, &job()).await.unwrap_err().is_invalid_request());
    }
}
