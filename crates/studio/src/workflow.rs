/// The studio session: uploads, generated artifacts, the live video and the
/// busy flag, driven through one owned state object.
///
/// Every remote operation follows the same shape. Preconditions are checked
/// and the busy flag is raised under the session lock, the lock is released
/// for the remote call, and the result is applied under the lock again only
/// if the session epoch has not moved. `reset` bumps the epoch, so a result
/// that lands after a reset is dropped instead of being mixed into the new
/// session.
use chrono::{DateTime, Utc};
use genai::prompts;
use genai::{AnimationStyle, AspectRatio, GenerationClient, ImagePayload, OutputType, VideoDuration};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{SessionDefaults, StudioConfig};
use crate::download::Download;
use crate::error::{Result, StudioError};
use crate::history::{ArtifactHistory, ArtifactId, ArtifactIdGenerator, Gallery, GeneratedArtifact};
use crate::poller::{Sleeper, TokioSleeper, VideoJob, VideoPoller, DEFAULT_POLL_INTERVAL};
use crate::resources::{Resource, ResourceHandle, ResourceManager, VideoArtifact, VideoSlot};
use crate::suggestions::{self, REFINEMENT_SUGGESTIONS};
use crate::uploads::{ImageSet, StudioImage, UploadSource};

pub const NEED_IMAGE_OR_CONCEPT: &str = "Please upload an image or write a creative concept first.";
pub const NEED_SELECTION: &str = "Select a generated image first.";
pub const NEED_REFINEMENT: &str = "Describe how the image should be refined first.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WorkflowStep {
    Upload = 1,
    Configure = 2,
    Review = 3,
}

impl WorkflowStep {
    pub const ALL: [WorkflowStep; 3] = [WorkflowStep::Upload, WorkflowStep::Configure, WorkflowStep::Review];

    pub fn number(&self) -> u8 {
        *self as u8
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Upload => "Upload Your Image",
            Self::Configure => "Configure & Ideate",
            Self::Review => "Generate & Refine",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Upload => "Start by uploading one or more images.",
            Self::Configure => "Set your design parameters and get creative ideas.",
            Self::Review => "Bring your vision to life and make adjustments.",
        }
    }
}

/// Remote operations the studio runs under the busy flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    RemoveBackground,
    Concept,
    Generation,
    Variation,
    Refinement,
    Video,
}

impl Operation {
    /// Status shown while the operation runs
    pub fn busy_message(&self) -> &'static str {
        match self {
            Self::RemoveBackground => "Removing background...",
            Self::Concept => "Generating creative concepts...",
            Self::Generation => "Creating your masterpiece...",
            Self::Variation => "Crafting a new variation...",
            Self::Refinement => "Refining your image...",
            Self::Video => "Generating video... This can take a few minutes.",
        }
    }

    /// Verb phrase for failure notifications, see [`StudioError::user_message`]
    pub fn action(&self) -> &'static str {
        match self {
            Self::RemoveBackground => "remove the background",
            Self::Concept => "generate ideas",
            Self::Generation => "generate the image",
            Self::Variation => "generate a variation",
            Self::Refinement => "refine the image",
            Self::Video => "generate the video",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyFlag {
    pub busy: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSummary {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub preview: ResourceHandle,
}

impl From<&StudioImage> for ImageSummary {
    fn from(image: &StudioImage) -> Self {
        Self {
            id: image.id.clone(),
            name: image.name.clone(),
            mime_type: image.payload.mime_type.clone(),
            preview: image.preview.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub id: ArtifactId,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
}

impl From<&GeneratedArtifact> for ArtifactSummary {
    fn from(artifact: &GeneratedArtifact) -> Self {
        Self {
            id: artifact.id.clone(),
            prompt: artifact.prompt.clone(),
            created_at: artifact.created_at,
        }
    }
}

/// Serializable view of the whole session for front ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub step: WorkflowStep,
    pub busy: BusyFlag,
    pub uploads: Vec<ImageSummary>,
    pub processed: Vec<ImageSummary>,
    pub history: Vec<ArtifactSummary>,
    pub selected: Option<ArtifactId>,
    pub gallery: Vec<ArtifactSummary>,
    pub video: Option<VideoArtifact>,
    pub topic: String,
    pub concept: String,
    pub refinement: String,
    pub aspect_ratio: AspectRatio,
    pub output_type: OutputType,
    pub video_duration: VideoDuration,
    pub animation_style: AnimationStyle,
    pub suggestions_open: bool,
    pub start_over_confirm_open: bool,
    pub gallery_open: bool,
    pub outstanding_resources: usize,
}

struct Session {
    epoch: u64,
    step: WorkflowStep,
    busy: BusyFlag,
    uploads: ImageSet,
    processed: ImageSet,
    history: ArtifactHistory,
    gallery: Gallery,
    video: VideoSlot,
    resources: ResourceManager,
    ids: ArtifactIdGenerator,
    topic: String,
    concept: String,
    refinement: String,
    aspect_ratio: AspectRatio,
    output_type: OutputType,
    video_duration: VideoDuration,
    animation_style: AnimationStyle,
    suggestions_open: bool,
    start_over_confirm_open: bool,
    gallery_open: bool,
    defaults: SessionDefaults,
}

impl Session {
    fn new(defaults: SessionDefaults) -> Self {
        Self {
            epoch: 0,
            step: WorkflowStep::Upload,
            busy: BusyFlag::default(),
            uploads: ImageSet::new(),
            processed: ImageSet::new(),
            history: ArtifactHistory::new(),
            gallery: Gallery::new(),
            video: VideoSlot::default(),
            resources: ResourceManager::new(),
            ids: ArtifactIdGenerator::default(),
            topic: String::new(),
            concept: String::new(),
            refinement: String::new(),
            aspect_ratio: defaults.aspect_ratio,
            output_type: defaults.output_type,
            video_duration: defaults.video_duration,
            animation_style: defaults.animation_style,
            suggestions_open: false,
            start_over_confirm_open: false,
            gallery_open: false,
            defaults,
        }
    }

    fn add_upload(&mut self, source: &UploadSource) {
        let id = source.id();
        for processed in [false, true] {
            let image = StudioImage {
                id: id.clone(),
                name: source.name.clone(),
                payload: source.payload(),
                preview: self.resources.allocate(source.bytes.clone(), source.mime_type.clone()),
            };
            let set = if processed { &mut self.processed } else { &mut self.uploads };
            if let Some(replaced) = set.insert(image) {
                debug!(id = %replaced.id, processed, "upload replaced an existing entry");
                self.resources.revoke(&replaced.preview);
            }
        }
    }

    fn remove_from(&mut self, processed: bool, id: &str) -> bool {
        let set = if processed { &mut self.processed } else { &mut self.uploads };
        match set.remove(id) {
            Some(image) => {
                self.resources.revoke(&image.preview);
                true
            }
            None => false,
        }
    }

    fn clear_video(&mut self) {
        self.video.clear(&mut self.resources);
    }

    fn replace_video(&mut self, video: VideoArtifact) {
        self.video.replace(&mut self.resources, video);
    }

    fn selected_artifact(&self) -> Result<GeneratedArtifact> {
        self.history
            .selected()
            .cloned()
            .ok_or_else(|| StudioError::invalid(NEED_SELECTION))
    }

    fn record_artifact(&mut self, image: ImagePayload, prompt: String) -> ArtifactId {
        let created_at = Utc::now();
        let id = self.ids.next_id(created_at);
        self.history.append_selected(GeneratedArtifact {
            id,
            image,
            prompt,
            created_at,
        })
    }

    fn reset(&mut self) {
        self.epoch += 1;
        for image in self.uploads.drain().into_iter().chain(self.processed.drain()) {
            self.resources.revoke(&image.preview);
        }
        self.history.clear();
        self.clear_video();
        self.topic.clear();
        self.concept.clear();
        self.refinement.clear();
        self.suggestions_open = false;
        self.start_over_confirm_open = false;
        self.aspect_ratio = self.defaults.aspect_ratio;
        self.output_type = self.defaults.output_type;
        self.step = WorkflowStep::Upload;
    }

    fn snapshot(&self) -> WorkflowState {
        WorkflowState {
            step: self.step,
            busy: self.busy.clone(),
            uploads: self.uploads.iter().map(ImageSummary::from).collect(),
            processed: self.processed.iter().map(ImageSummary::from).collect(),
            history: self.history.iter().map(ArtifactSummary::from).collect(),
            selected: self.history.selected_id().cloned(),
            gallery: self.gallery.iter().map(ArtifactSummary::from).collect(),
            video: self.video.get().cloned(),
            topic: self.topic.clone(),
            concept: self.concept.clone(),
            refinement: self.refinement.clone(),
            aspect_ratio: self.aspect_ratio,
            output_type: self.output_type,
            video_duration: self.video_duration,
            animation_style: self.animation_style,
            suggestions_open: self.suggestions_open,
            start_over_confirm_open: self.start_over_confirm_open,
            gallery_open: self.gallery_open,
            outstanding_resources: self.resources.outstanding(),
        }
    }
}

/// Owns the busy flag for one in-flight operation and lowers it on drop,
/// including when the operation's future is dropped mid-call.
struct BusyTicket {
    session: Arc<Mutex<Session>>,
    epoch: u64,
    operation: Operation,
}

impl Drop for BusyTicket {
    fn drop(&mut self) {
        let mut session = self.session.lock();
        session.busy = BusyFlag::default();
        debug!(operation = ?self.operation, "busy flag released");
    }
}

/// Handle to a studio session. Clones share the same session.
#[derive(Clone)]
pub struct Studio {
    client: GenerationClient,
    session: Arc<Mutex<Session>>,
    sleeper: Arc<dyn Sleeper>,
    poll_interval: Duration,
}

impl Studio {
    pub fn new(client: GenerationClient) -> Self {
        Self {
            client,
            session: Arc::new(Mutex::new(Session::new(SessionDefaults::default()))),
            sleeper: Arc::new(TokioSleeper),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Build a studio with the configured defaults and poll interval.
    pub fn with_config(client: GenerationClient, config: &StudioConfig) -> Self {
        Self::new(client)
            .with_defaults(config.defaults)
            .with_poll_interval(config.poll_interval())
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Replace the option defaults; applied immediately and on every reset.
    pub fn with_defaults(self, defaults: SessionDefaults) -> Self {
        {
            let mut session = self.session.lock();
            session.defaults = defaults;
            session.aspect_ratio = defaults.aspect_ratio;
            session.output_type = defaults.output_type;
            session.video_duration = defaults.video_duration;
            session.animation_style = defaults.animation_style;
        }
        self
    }

    pub fn client(&self) -> &GenerationClient {
        &self.client
    }

    pub fn state(&self) -> WorkflowState {
        self.session.lock().snapshot()
    }

    pub fn step(&self) -> WorkflowStep {
        self.session.lock().step
    }

    pub fn is_busy(&self) -> bool {
        self.session.lock().busy.busy
    }

    pub fn outstanding_resources(&self) -> usize {
        self.session.lock().resources.outstanding()
    }

    /// Copy of the bytes behind a live handle
    pub fn resolve(&self, handle: &ResourceHandle) -> Result<Resource> {
        self.session.lock().resources.resolve(handle).cloned()
    }

    pub fn history(&self) -> Vec<GeneratedArtifact> {
        self.session.lock().history.iter().cloned().collect()
    }

    pub fn selected(&self) -> Option<GeneratedArtifact> {
        self.session.lock().history.selected().cloned()
    }

    pub fn gallery(&self) -> Vec<GeneratedArtifact> {
        self.session.lock().gallery.iter().cloned().collect()
    }

    pub fn video(&self) -> Option<VideoArtifact> {
        self.session.lock().video.get().cloned()
    }

    // ---- uploads ----

    /// Accept image files into both the uploaded and processed collections.
    /// Sources that are not `image/*` are skipped. Returns the accepted count.
    pub fn add_uploads(&self, sources: Vec<UploadSource>) -> usize {
        let mut session = self.session.lock();
        let mut accepted = 0;
        for source in &sources {
            if !source.is_image() {
                debug!(name = %source.name, mime = %source.mime_type, "skipping non-image upload");
                continue;
            }
            session.add_upload(source);
            accepted += 1;
        }
        if accepted > 0 && session.step < WorkflowStep::Configure {
            session.step = WorkflowStep::Configure;
        }
        info!(accepted, skipped = sources.len() - accepted, "uploads added");
        accepted
    }

    /// Remove an uploaded image. The processed copy is left alone.
    pub fn remove_upload(&self, id: &str) -> bool {
        self.session.lock().remove_from(false, id)
    }

    /// Remove a processed image. The uploaded original is left alone.
    pub fn remove_processed(&self, id: &str) -> bool {
        self.session.lock().remove_from(true, id)
    }

    pub fn upload_ids(&self) -> Vec<String> {
        self.session.lock().uploads.ids()
    }

    pub fn processed_ids(&self) -> Vec<String> {
        self.session.lock().processed.ids()
    }

    pub fn processed_image(&self, id: &str) -> Option<StudioImage> {
        self.session.lock().processed.get(id).cloned()
    }

    // ---- remote operations ----

    /// Replace a processed image's content with a background-free version.
    /// The entry keeps its id and position. If it was removed while the call
    /// ran, the result is dropped.
    pub async fn request_background_removal(&self, id: &str) -> Result<()> {
        let (ticket, image) = self.begin(Operation::RemoveBackground, |session| {
            session
                .processed
                .get(id)
                .map(|image| image.payload.clone())
                .ok_or_else(|| StudioError::invalid(format!("no processed image with id {id}")))
        })?;

        let cut = self
            .client
            .remove_background(&image)
            .await
            .map_err(|err| self.failed(&ticket, err.into()))?;

        self.finish(&ticket, |session| {
            if !session.processed.contains(id) {
                debug!(%id, "processed image removed during background removal; result dropped");
                return Ok(());
            }
            let preview = session.resources.allocate(cut.data.clone(), cut.mime_type.clone());
            if let Some(old) = session.processed.replace_content(id, cut, preview) {
                session.resources.revoke(&old);
            }
            info!(%id, "background removed");
            Ok(())
        })
    }

    /// Fill the concept field from the processed images, output type and topic.
    pub async fn request_concept(&self) -> Result<String> {
        let (ticket, (images, output_type, topic)) = self.begin(Operation::Concept, |session| {
            Ok((session.processed.payloads(), session.output_type, session.topic.clone()))
        })?;

        let concept = self
            .client
            .generate_concept(&images, output_type, Some(topic.as_str()))
            .await
            .map_err(|err| self.failed(&ticket, err.into()))?;

        self.finish(&ticket, |session| {
            session.concept = concept.clone();
            info!(chars = concept.len(), "concept ready");
            Ok(concept)
        })
    }

    /// Generate a new artifact from the processed images and/or the concept.
    pub async fn request_generation(&self) -> Result<ArtifactId> {
        let (ticket, (concept, output_type, references, aspect_ratio)) = self.begin(Operation::Generation, |session| {
            if session.processed.is_empty() && session.concept.is_empty() {
                return Err(StudioError::invalid(NEED_IMAGE_OR_CONCEPT));
            }
            session.clear_video();
            session.step = WorkflowStep::Review;
            Ok((
                session.concept.clone(),
                session.output_type,
                session.processed.payloads(),
                session.aspect_ratio,
            ))
        })?;

        let image = self
            .client
            .generate_image(&concept, output_type, &references, aspect_ratio)
            .await
            .map_err(|err| self.failed(&ticket, err.into()))?;

        self.finish(&ticket, |session| {
            let prompt = if concept.trim().is_empty() {
                prompts::fallback_artifact_prompt(output_type)
            } else {
                concept
            };
            let id = session.record_artifact(image, prompt);
            info!(%id, "image generated");
            Ok(id)
        })
    }

    /// Generate again from the selected artifact's prompt.
    pub async fn request_variation(&self) -> Result<ArtifactId> {
        let (ticket, (source, output_type, references, aspect_ratio)) = self.begin(Operation::Variation, |session| {
            let source = session.selected_artifact()?;
            session.clear_video();
            Ok((source, session.output_type, session.processed.payloads(), session.aspect_ratio))
        })?;

        let image = self
            .client
            .generate_image(&source.prompt, output_type, &references, aspect_ratio)
            .await
            .map_err(|err| self.failed(&ticket, err.into()))?;

        self.finish(&ticket, |session| {
            let id = session.record_artifact(image, source.prompt);
            info!(%id, source = %source.id, "variation generated");
            Ok(id)
        })
    }

    /// Edit the selected artifact with the refinement instruction.
    pub async fn request_refinement(&self) -> Result<ArtifactId> {
        let (ticket, (source, instruction)) = self.begin(Operation::Refinement, |session| {
            let source = session.selected_artifact()?;
            if session.refinement.trim().is_empty() {
                return Err(StudioError::invalid(NEED_REFINEMENT));
            }
            session.clear_video();
            Ok((source, session.refinement.clone()))
        })?;

        let image = self
            .client
            .refine_image(&source.image, &instruction)
            .await
            .map_err(|err| self.failed(&ticket, err.into()))?;

        self.finish(&ticket, |session| {
            let prompt = prompts::refined_artifact_prompt(&source.prompt, &instruction);
            let id = session.record_artifact(image, prompt);
            session.refinement.clear();
            info!(%id, source = %source.id, "image refined");
            Ok(id)
        })
    }

    /// Animate the selected artifact. Holds the busy flag until the video is
    /// downloaded or the job fails.
    pub async fn request_video(&self) -> Result<VideoArtifact> {
        let (ticket, (artifact_id, job)) = self.begin(Operation::Video, |session| {
            let source = session.selected_artifact()?;
            Ok((
                source.id,
                VideoJob {
                    prompt: source.prompt,
                    image: source.image,
                    duration: session.video_duration,
                    style: session.animation_style,
                },
            ))
        })?;

        let mut poller = VideoPoller::new(self.sleeper.as_ref(), self.poll_interval);
        let bytes = poller
            .run(&self.client, &job)
            .await
            .map_err(|err| self.failed(&ticket, err))?;

        self.finish(&ticket, |session| {
            let handle = session.resources.allocate(bytes, "video/mp4");
            let video = VideoArtifact { handle, artifact_id };
            session.replace_video(video.clone());
            info!(artifact = %video.artifact_id, polls = poller.poll_count(), "video ready");
            Ok(video)
        })
    }

    // ---- selection & gallery ----

    /// Point the selection at an artifact; unknown ids are ignored.
    pub fn select(&self, id: &ArtifactId) -> bool {
        self.session.lock().history.select(id)
    }

    pub fn promote_to_gallery(&self, id: &ArtifactId) -> Result<()> {
        let mut session = self.session.lock();
        let artifact = session
            .history
            .get(id)
            .cloned()
            .ok_or_else(|| StudioError::invalid(format!("no generated image with id {id}")))?;
        session.gallery.promote(&artifact);
        info!(%id, "saved to gallery");
        Ok(())
    }

    // ---- inputs ----

    pub fn set_topic(&self, topic: impl Into<String>) {
        self.session.lock().topic = topic.into();
    }

    pub fn set_concept(&self, concept: impl Into<String>) {
        self.session.lock().concept = concept.into();
    }

    pub fn set_refinement(&self, instruction: impl Into<String>) {
        self.session.lock().refinement = instruction.into();
    }

    pub fn set_aspect_ratio(&self, ratio: AspectRatio) {
        self.session.lock().aspect_ratio = ratio;
    }

    pub fn set_output_type(&self, output_type: OutputType) {
        self.session.lock().output_type = output_type;
    }

    pub fn set_video_duration(&self, duration: VideoDuration) {
        self.session.lock().video_duration = duration;
    }

    pub fn set_animation_style(&self, style: AnimationStyle) {
        self.session.lock().animation_style = style;
    }

    // ---- overlays ----

    pub fn set_suggestions_open(&self, open: bool) {
        self.session.lock().suggestions_open = open;
    }

    /// Copy a canned suggestion into the refinement field and close the list.
    pub fn apply_suggestion(&self, index: usize) -> Result<String> {
        let suggestion = suggestions::choose(&REFINEMENT_SUGGESTIONS, index)
            .ok_or_else(|| StudioError::invalid(format!("no refinement suggestion at index {index}")))?;
        let mut session = self.session.lock();
        session.refinement = suggestion.to_string();
        session.suggestions_open = false;
        Ok(suggestion.to_string())
    }

    pub fn set_gallery_open(&self, open: bool) {
        self.session.lock().gallery_open = open;
    }

    pub fn request_start_over(&self) {
        self.session.lock().start_over_confirm_open = true;
    }

    pub fn cancel_start_over(&self) {
        self.session.lock().start_over_confirm_open = false;
    }

    pub fn confirm_start_over(&self) {
        self.reset();
    }

    /// Return to an empty session. The gallery and the video settings are
    /// kept. An operation still in flight keeps the busy flag until it
    /// returns, and its result is discarded.
    pub fn reset(&self) {
        let mut session = self.session.lock();
        session.reset();
        info!(
            epoch = session.epoch,
            outstanding = session.resources.outstanding(),
            "session reset"
        );
    }

    // ---- downloads ----

    /// Download a generated image from the history or the gallery.
    pub fn download_artifact(&self, id: &ArtifactId) -> Result<Download> {
        let session = self.session.lock();
        session
            .history
            .get(id)
            .or_else(|| session.gallery.iter().find(|a| &a.id == id))
            .map(Download::artifact)
            .ok_or_else(|| StudioError::invalid(format!("no generated image with id {id}")))
    }

    pub fn download_processed(&self, id: &str) -> Result<Download> {
        let session = self.session.lock();
        session
            .processed
            .get(id)
            .map(Download::processed)
            .ok_or_else(|| StudioError::invalid(format!("no processed image with id {id}")))
    }

    pub fn download_video(&self) -> Result<Download> {
        let session = self.session.lock();
        let video = session
            .video
            .get()
            .ok_or_else(|| StudioError::invalid("no video has been generated"))?;
        Download::video(&session.resources, video)
    }

    // ---- operation plumbing ----

    /// Check-and-set the busy flag and run the precondition under one lock.
    fn begin<T>(
        &self,
        op: Operation,
        prepare: impl FnOnce(&mut Session) -> Result<T>,
    ) -> Result<(BusyTicket, T)> {
        let mut session = self.session.lock();
        if session.busy.busy {
            debug!(operation = ?op, running = %session.busy.message, "rejected while busy");
            return Err(StudioError::Busy(session.busy.message.clone()));
        }
        let prepared = prepare(&mut *session)?;
        session.busy = BusyFlag {
            busy: true,
            message: op.busy_message().to_string(),
        };
        let ticket = BusyTicket {
            session: Arc::clone(&self.session),
            epoch: session.epoch,
            operation: op,
        };
        drop(session);
        info!(operation = ?op, "operation started");
        Ok((ticket, prepared))
    }

    /// Apply a result unless the session was reset since `begin`.
    fn finish<T>(&self, ticket: &BusyTicket, apply: impl FnOnce(&mut Session) -> Result<T>) -> Result<T> {
        let mut session = self.session.lock();
        if session.epoch != ticket.epoch {
            warn!(operation = ?ticket.operation, "session was reset during the operation; result discarded");
            return Err(StudioError::Stale);
        }
        apply(&mut *session)
    }

    /// Report a failed remote call. A failure that lands after a reset is
    /// dropped like a late result.
    fn failed(&self, ticket: &BusyTicket, err: StudioError) -> StudioError {
        if self.session.lock().epoch != ticket.epoch {
            debug!(operation = ?ticket.operation, error = %err, "operation failed after a reset; error discarded");
            return StudioError::Stale;
        }
        warn!(operation = ?ticket.operation, error = %err, "operation failed");
        err
    }
}
