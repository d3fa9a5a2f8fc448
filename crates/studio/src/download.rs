/// Save actions for generated artifacts, processed images and the live video.
use genai::ImagePayload;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::history::GeneratedArtifact;
use crate::resources::{ResourceHandle, ResourceManager, VideoArtifact};
use crate::uploads::StudioImage;

#[derive(Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Download {
    pub fn from_payload(filename: impl Into<String>, payload: &ImagePayload) -> Self {
        Self {
            filename: filename.into(),
            mime_type: payload.mime_type.clone(),
            bytes: payload.data.clone(),
        }
    }

    /// Copy the bytes behind a live handle. Fails for a revoked handle.
    pub fn from_handle(
        filename: impl Into<String>,
        resources: &ResourceManager,
        handle: &ResourceHandle,
    ) -> Result<Self> {
        let resource = resources.resolve(handle)?;
        Ok(Self {
            filename: filename.into(),
            mime_type: resource.mime_type.clone(),
            bytes: resource.bytes.clone(),
        })
    }

    pub fn artifact(artifact: &GeneratedArtifact) -> Self {
        Self::from_payload(format!("ai-creation-{}.png", artifact.id), &artifact.image)
    }

    pub fn processed(image: &StudioImage) -> Self {
        Self::from_payload(format!("processed-{}", image.name), &image.payload)
    }

    pub fn video(resources: &ResourceManager, video: &VideoArtifact) -> Result<Self> {
        Self::from_handle(
            format!("ai-video-{}.mp4", video.artifact_id),
            resources,
            &video.handle,
        )
    }

    /// Write into `dir` under the download's file name.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

impl std::fmt::Debug for Download {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Download")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}
