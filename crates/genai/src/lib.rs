/// Generation service client
///
/// Wraps a generative backend (Gemini, or a scripted mock) behind the five
/// operations the studio workflow consumes: background removal, concept text,
/// image generation, image refinement and long-running video generation.

pub mod backends;
pub mod client;
pub mod error;
pub mod options;
pub mod payload;
pub mod prompts;

pub use backends::{BackendConfig, BackendFactory, BackendType, GenerationBackend};
pub use client::GenerationClient;
pub use error::ServiceError;
pub use options::{AnimationStyle, AspectRatio, OutputType, VideoDuration};
pub use payload::{ContentRequest, ImagePayload, VideoOperation, VideoRequest};
