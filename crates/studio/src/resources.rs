/// Transient binary resources (upload previews, generated video) addressed
/// by revocable handles, the way a browser hands out object URLs.
///
/// Every handle is revoked exactly once: revoking an absent or already
/// revoked handle is a no-op, so `allocated_count() - revoked_count()` is
/// always the number of live handles.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, StudioError};
use crate::history::ArtifactId;

/// Opaque reference to transient bytes held by a [`ResourceManager`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHandle {
    id: u64,
    url: String,
}

impl ResourceHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// `blob:`-style URL a front end can hand to its media elements
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Debug, Clone)]
pub struct Resource {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct ResourceManager {
    next_id: u64,
    live: HashMap<u64, Resource>,
    allocated: u64,
    revoked: u64,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, bytes: Vec<u8>, mime_type: impl Into<String>) -> ResourceHandle {
        self.next_id += 1;
        self.allocated += 1;
        let handle = ResourceHandle {
            id: self.next_id,
            url: format!("blob:genstudio/{}", Uuid::new_v4()),
        };
        let mime_type = mime_type.into();
        debug!(handle = handle.id, %mime_type, bytes = bytes.len(), "allocated resource");
        self.live.insert(handle.id, Resource { mime_type, bytes });
        handle
    }

    /// Release a handle. Returns false when it was already gone.
    pub fn revoke(&mut self, handle: &ResourceHandle) -> bool {
        if self.live.remove(&handle.id).is_some() {
            self.revoked += 1;
            debug!(handle = handle.id, "revoked resource");
            true
        } else {
            false
        }
    }

    /// Store `new` in `slot`, revoking whatever occupied it.
    pub fn replace(&mut self, slot: &mut Option<ResourceHandle>, new: Option<ResourceHandle>) {
        if let Some(old) = slot.take() {
            if new.as_ref() != Some(&old) {
                self.revoke(&old);
            }
        }
        *slot = new;
    }

    pub fn resolve(&self, handle: &ResourceHandle) -> Result<&Resource> {
        self.live
            .get(&handle.id)
            .ok_or_else(|| StudioError::Resource(format!("handle {} was already revoked", handle.url)))
    }

    pub fn is_live(&self, handle: &ResourceHandle) -> bool {
        self.live.contains_key(&handle.id)
    }

    pub fn outstanding(&self) -> usize {
        self.live.len()
    }

    pub fn allocated_count(&self) -> u64 {
        self.allocated
    }

    pub fn revoked_count(&self) -> u64 {
        self.revoked
    }
}

/// Generated video held through a resource handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoArtifact {
    pub handle: ResourceHandle,
    pub artifact_id: ArtifactId,
}

/// The single live video. `replace` and `clear` are the only paths that
/// release its handle.
#[derive(Debug, Default)]
pub struct VideoSlot {
    current: Option<VideoArtifact>,
}

impl VideoSlot {
    pub fn get(&self) -> Option<&VideoArtifact> {
        self.current.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    pub fn replace(&mut self, resources: &mut ResourceManager, video: VideoArtifact) {
        let mut handle = self.current.take().map(|v| v.handle);
        resources.replace(&mut handle, Some(video.handle.clone()));
        self.current = Some(video);
    }

    pub fn clear(&mut self, resources: &mut ResourceManager) {
        let mut handle = self.current.take().map(|v| v.handle);
        resources.replace(&mut handle, None);
    }
}
