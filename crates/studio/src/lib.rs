/// Creative generation studio
///
/// Headless session core for an upload, ideate, generate and refine
/// workflow: uploaded and processed reference images, an append-only
/// history of generated artifacts with a selection pointer, a gallery of
/// saved copies, and one live image-to-video result. Remote work goes
/// through a [`genai::GenerationClient`].

pub mod config;
pub mod download;
pub mod error;
pub mod history;
pub mod poller;
pub mod resources;
pub mod suggestions;
pub mod uploads;
pub mod workflow;

pub use config::{SessionDefaults, StudioConfig};
pub use download::Download;
pub use error::{Result, StudioError};
pub use history::{ArtifactHistory, ArtifactId, Gallery, GeneratedArtifact};
pub use poller::{PollPhase, RecordingSleeper, Sleeper, TokioSleeper, VideoJob, VideoPoller};
pub use resources::{Resource, ResourceHandle, ResourceManager, VideoArtifact, VideoSlot};
pub use suggestions::REFINEMENT_SUGGESTIONS;
pub use uploads::{ImageSet, StudioImage, UploadSource};
pub use workflow::{BusyFlag, Operation, Studio, WorkflowState, WorkflowStep};
