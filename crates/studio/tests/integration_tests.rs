/// Studio session: end-to-end workflow tests against the scripted backend
use chrono::{TimeZone, Utc};
use genai::backends::mock::{MockBackend, MockCallKind, MOCK_VIDEO_URI};
use genai::{GenerationClient, ImagePayload, OutputType, ServiceError, VideoOperation};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use studio::*;

fn setup() -> (Arc<MockBackend>, Arc<RecordingSleeper>, Studio) {
    let backend = Arc::new(MockBackend::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let studio = Studio::new(GenerationClient::new(backend.clone())).with_sleeper(sleeper.clone());
    (backend, sleeper, studio)
}

fn png(name: &str, millis: i64) -> UploadSource {
    UploadSource::new(
        name,
        "image/png",
        Utc.timestamp_millis_opt(millis).unwrap(),
        format!("bytes of {name}").into_bytes(),
    )
}

fn video_job() -> VideoJob {
    VideoJob {
        prompt: "a lighthouse".to_string(),
        image: ImagePayload::png(b"frame".to_vec()),
        duration: Default::default(),
        style: Default::default(),
    }
}

#[tokio::test]
async fn test_upload_then_generate_without_concept() {
    let (backend, _sleeper, studio) = setup();
    backend.push_image(Ok(ImagePayload::png(b"X".to_vec())));
    studio.set_output_type(OutputType::WeddingCard);

    studio.add_uploads(vec![png("portrait.png", 1_700_000_000_000)]);
    assert_eq!(studio.step(), WorkflowStep::Configure);

    let id = studio.request_generation().await.unwrap();

    let history = studio.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, id);
    assert_eq!(history[0].image.data, b"X");
    assert_eq!(history[0].prompt, "Generated Wedding Card from reference image(s).");
    assert_eq!(studio.state().selected, Some(id));
    assert_eq!(studio.step(), WorkflowStep::Review);

    // The processed image went out as a reference.
    assert_eq!(backend.calls()[0].image_count, 1);
}

#[tokio::test]
async fn test_refinement_of_selected_artifact() {
    let (backend, _sleeper, studio) = setup();
    studio.set_concept("P");
    let a = studio.request_generation().await.unwrap();
    assert!(studio.select(&a));

    backend.push_image(Ok(ImagePayload::png(b"darker".to_vec())));
    studio.set_refinement("make it darker");
    let b = studio.request_refinement().await.unwrap();

    let history = studio.history();
    assert_eq!(history.len(), 2);
    let refined = &history[1];
    assert_eq!(refined.id, b);
    assert_eq!(refined.prompt, "Refined from original prompt \"P\" with: make it darker");
    assert_eq!(refined.image.data, b"darker");

    let state = studio.state();
    assert_eq!(state.selected, Some(b));
    assert!(state.refinement.is_empty());

    // The refinement call carried the selected artifact's image.
    let call = backend.calls().pop().unwrap();
    assert_eq!(call.kind, MockCallKind::Image);
    assert_eq!(call.image_count, 1);
    assert!(call.detail.contains("make it darker"));
}

#[tokio::test]
async fn test_successful_operations_append_one_and_select_it() {
    let (_backend, _sleeper, studio) = setup();
    studio.add_uploads(vec![png("a.png", 1)]);

    let mut expected = 0;
    for round in 0..3 {
        let id = match round {
            0 => studio.request_generation().await.unwrap(),
            1 => studio.request_variation().await.unwrap(),
            _ => {
                studio.set_refinement("more contrast");
                studio.request_refinement().await.unwrap()
            }
        };
        expected += 1;
        assert_eq!(studio.history().len(), expected);
        assert_eq!(studio.selected().unwrap().id, id);
        assert_eq!(studio.history().last().unwrap().id, id);
    }
}

#[tokio::test]
async fn test_generation_with_nothing_makes_no_calls() {
    let (backend, _sleeper, studio) = setup();

    let err = studio.request_generation().await.unwrap_err();
    assert!(err.is_invalid_request());
    assert_eq!(err.user_message("generate the image"), workflow::NEED_IMAGE_OR_CONCEPT);
    assert_eq!(backend.call_count(), 0);
    assert!(studio.history().is_empty());
    assert!(!studio.is_busy());
    assert_eq!(studio.step(), WorkflowStep::Upload);
}

#[tokio::test]
async fn test_whitespace_concept_counts_as_present() {
    let (backend, _sleeper, studio) = setup();
    studio.set_concept("   ");

    let id = studio.request_generation().await.unwrap();
    assert_eq!(backend.count_of(MockCallKind::Image), 1);
    assert_eq!(studio.selected().unwrap().id, id);
    assert_eq!(studio.step(), WorkflowStep::Review);
}

#[test]
fn test_random_upload_sequences_never_cascade() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let pool: Vec<UploadSource> = (0..6).map(|i| png(&format!("img{i}.png"), i)).collect();

    for _ in 0..50 {
        let (_backend, _sleeper, studio) = setup();
        let mut added = BTreeSet::new();
        let mut uploads: Vec<String> = Vec::new();
        let mut processed: Vec<String> = Vec::new();

        for _ in 0..40 {
            let source = &pool[rng.gen_range(0..pool.len())];
            let id = source.id();
            match rng.gen_range(0..3) {
                0 => {
                    studio.add_uploads(vec![source.clone()]);
                    added.insert(id.clone());
                    for list in [&mut uploads, &mut processed] {
                        if !list.contains(&id) {
                            list.push(id.clone());
                        }
                    }
                }
                1 => {
                    assert_eq!(studio.remove_upload(&id), uploads.contains(&id));
                    uploads.retain(|u| u != &id);
                }
                _ => {
                    assert_eq!(studio.remove_processed(&id), processed.contains(&id));
                    processed.retain(|p| p != &id);
                }
            }

            assert_eq!(studio.upload_ids(), uploads);
            assert_eq!(studio.processed_ids(), processed);
            assert!(studio.processed_ids().iter().all(|id| added.contains(id)));
            assert_eq!(studio.outstanding_resources(), uploads.len() + processed.len());
        }

        studio.reset();
        assert_eq!(studio.outstanding_resources(), 0);
    }
}

#[tokio::test]
async fn test_reset_releases_every_handle() {
    let (_backend, _sleeper, studio) = setup();
    studio.add_uploads(vec![png("a.png", 1), png("b.png", 2)]);
    studio.request_background_removal("a.png-1").await.unwrap();
    studio.request_generation().await.unwrap();
    studio.request_video().await.unwrap();
    assert_eq!(studio.outstanding_resources(), 5);

    studio.reset();
    let state = studio.state();
    assert_eq!(state.outstanding_resources, 0);
    assert!(state.uploads.is_empty());
    assert!(state.processed.is_empty());
    assert!(state.history.is_empty());
    assert!(state.selected.is_none());
    assert!(state.video.is_none());
    assert_eq!(state.step, WorkflowStep::Upload);

    // Idempotent.
    studio.reset();
    assert_eq!(studio.outstanding_resources(), 0);
}

#[tokio::test]
async fn test_gallery_survives_reset() {
    let (_backend, _sleeper, studio) = setup();
    studio.set_concept("keep me");
    let first = studio.request_generation().await.unwrap();
    let second = studio.request_variation().await.unwrap();
    studio.promote_to_gallery(&first).unwrap();
    studio.promote_to_gallery(&second).unwrap();

    studio.reset();

    let gallery = studio.gallery();
    assert_eq!(gallery.len(), 2);
    assert_eq!(gallery[0].id, second);
    assert_eq!(gallery[1].id, first);
    assert!(studio.history().is_empty());
}

#[tokio::test]
async fn test_poller_two_pending_reports_then_success() {
    let backend = Arc::new(MockBackend::new());
    backend
        .push_video_start(Ok(VideoOperation::pending("operations/v1")))
        .push_poll(Ok(VideoOperation::pending("operations/v1")))
        .push_poll(Ok(VideoOperation::succeeded("operations/v1", MOCK_VIDEO_URI)));
    let client = GenerationClient::new(backend.clone());
    let sleeper = RecordingSleeper::new();
    let mut poller = VideoPoller::new(&sleeper, Duration::from_secs(10));

    let bytes = poller.run(&client, &video_job()).await.unwrap();

    assert_eq!(bytes, b"mock-video");
    assert_eq!(
        poller.transitions(),
        &[
            PollPhase::Idle,
            PollPhase::Requested,
            PollPhase::Polling,
            PollPhase::Polling,
            PollPhase::Succeeded
        ]
    );
    assert_eq!(poller.poll_count(), 2);
    assert_eq!(sleeper.slept(), vec![Duration::from_secs(10); 2]);
    assert_eq!(backend.count_of(MockCallKind::FetchMedia), 1);
}

#[tokio::test]
async fn test_poller_error_on_first_poll() {
    let backend = Arc::new(MockBackend::new());
    backend.push_poll(Ok(VideoOperation::failed("operations/mock-0", "quota exceeded")));
    let client = GenerationClient::new(backend.clone());
    let sleeper = RecordingSleeper::new();
    let mut poller = VideoPoller::new(&sleeper, Duration::from_secs(10));

    let err = poller.run(&client, &video_job()).await.unwrap_err();

    assert!(matches!(err, StudioError::Service(ref m) if m.contains("quota exceeded")));
    assert_eq!(
        poller.transitions(),
        &[PollPhase::Idle, PollPhase::Requested, PollPhase::Polling, PollPhase::Failed]
    );
    assert_eq!(backend.count_of(MockCallKind::PollVideo), 1);
    assert_eq!(backend.count_of(MockCallKind::FetchMedia), 0);
}

#[tokio::test]
async fn test_studio_video_yields_one_artifact() {
    let (backend, sleeper, studio) = setup();
    backend
        .push_poll(Ok(VideoOperation::pending("operations/mock-0")))
        .push_poll(Ok(VideoOperation::succeeded("operations/mock-0", MOCK_VIDEO_URI)));
    studio.set_concept("waves");
    let id = studio.request_generation().await.unwrap();

    let video = studio.request_video().await.unwrap();

    assert_eq!(video.artifact_id, id);
    assert_eq!(studio.video(), Some(video.clone()));
    assert_eq!(studio.resolve(&video.handle).unwrap().bytes, b"mock-video");
    assert_eq!(sleeper.slept(), vec![Duration::from_secs(10); 2]);
    assert_eq!(studio.outstanding_resources(), 1);
    assert!(!studio.is_busy());
}

#[tokio::test]
async fn test_video_fetch_failure_keeps_previous_state() {
    let (backend, _sleeper, studio) = setup();
    studio.set_concept("waves");
    studio.request_generation().await.unwrap();
    backend.push_media(Err(ServiceError::transport("link expired")));

    let err = studio.request_video().await.unwrap_err();
    assert!(matches!(err, StudioError::Transport(_)));
    assert!(studio.video().is_none());
    assert_eq!(studio.outstanding_resources(), 0);
    assert!(err.user_message("generate the video").starts_with("Sorry, we couldn't generate the video."));
}

#[tokio::test]
async fn test_reset_during_generation_discards_result() {
    let (backend, _sleeper, studio) = setup();
    studio.add_uploads(vec![png("a.png", 1)]);
    let gate = backend.gate_next_call();

    let task = {
        let studio = studio.clone();
        tokio::spawn(async move { studio.request_generation().await })
    };
    gate.entered().await;

    let busy = studio.state().busy;
    assert!(busy.busy);
    assert_eq!(busy.message, "Creating your masterpiece...");

    studio.reset();
    // The in-flight call still owns the busy flag.
    assert!(matches!(
        studio.request_concept().await,
        Err(StudioError::Busy(_))
    ));

    gate.release();
    let result = task.await.unwrap();
    assert_eq!(result, Err(StudioError::Stale));

    let state = studio.state();
    assert!(!state.busy.busy);
    assert!(state.history.is_empty());
    assert!(state.selected.is_none());
    assert_eq!(state.step, WorkflowStep::Upload);
    assert_eq!(state.outstanding_resources, 0);
    assert_eq!(backend.count_of(MockCallKind::Image), 1);
}

#[tokio::test]
async fn test_failure_after_reset_is_discarded() {
    let (backend, _sleeper, studio) = setup();
    studio.add_uploads(vec![png("a.png", 1)]);
    backend.push_image(Err(ServiceError::transport("offline")));
    let gate = backend.gate_next_call();

    let task = {
        let studio = studio.clone();
        tokio::spawn(async move { studio.request_generation().await })
    };
    gate.entered().await;
    studio.reset();
    gate.release();

    assert_eq!(task.await.unwrap(), Err(StudioError::Stale));
    let state = studio.state();
    assert!(!state.busy.busy);
    assert!(state.history.is_empty());
    assert_eq!(state.outstanding_resources, 0);
}

#[tokio::test]
async fn test_video_poll_failure_after_reset_is_discarded() {
    let (backend, sleeper, studio) = setup();
    studio.set_concept("a lighthouse");
    studio.request_generation().await.unwrap();
    backend.push_poll(Err(ServiceError::transport("connection reset")));
    let gate = backend.gate_next_call();

    let task = {
        let studio = studio.clone();
        tokio::spawn(async move { studio.request_video().await })
    };
    gate.entered().await;
    studio.reset();
    gate.release();

    assert_eq!(task.await.unwrap(), Err(StudioError::Stale));
    assert_eq!(backend.count_of(MockCallKind::PollVideo), 1);
    assert_eq!(backend.count_of(MockCallKind::FetchMedia), 0);
    assert_eq!(sleeper.slept().len(), 1);
    assert!(!studio.is_busy());
    assert!(studio.video().is_none());
    assert_eq!(studio.outstanding_resources(), 0);
}

#[tokio::test]
async fn test_removed_image_ignores_background_result() {
    let (backend, _sleeper, studio) = setup();
    studio.add_uploads(vec![png("a.png", 1)]);
    let gate = backend.gate_next_call();

    let task = {
        let studio = studio.clone();
        tokio::spawn(async move { studio.request_background_removal("a.png-1").await })
    };
    gate.entered().await;
    assert!(studio.remove_processed("a.png-1"));
    gate.release();

    task.await.unwrap().unwrap();
    assert!(studio.processed_ids().is_empty());
    assert_eq!(studio.upload_ids(), vec!["a.png-1"]);
    assert_eq!(studio.outstanding_resources(), 1);
}

#[tokio::test]
async fn test_busy_rejects_second_operation() {
    let (backend, _sleeper, studio) = setup();
    studio.set_concept("one at a time");
    let gate = backend.gate_next_call();

    let task = {
        let studio = studio.clone();
        tokio::spawn(async move { studio.request_generation().await })
    };
    gate.entered().await;

    let err = studio.request_generation().await.unwrap_err();
    assert_eq!(err, StudioError::Busy("Creating your masterpiece...".to_string()));
    assert!(err.is_invalid_request());

    gate.release();
    task.await.unwrap().unwrap();
    assert_eq!(backend.count_of(MockCallKind::Image), 1);
    assert_eq!(studio.history().len(), 1);
    assert!(!studio.is_busy());
}

#[tokio::test]
async fn test_dropped_operation_releases_busy() {
    let (backend, _sleeper, studio) = setup();
    studio.set_concept("abandoned");
    let gate = backend.gate_next_call();

    let task = {
        let studio = studio.clone();
        tokio::spawn(async move { studio.request_generation().await })
    };
    gate.entered().await;
    assert!(studio.is_busy());

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());
    assert!(!studio.is_busy());
    assert!(studio.history().is_empty());
}
