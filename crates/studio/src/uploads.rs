/// Uploaded reference images and their processed working copies.
use chrono::{DateTime, Utc};
use genai::ImagePayload;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::resources::ResourceHandle;

/// A file offered for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadSource {
    pub name: String,
    pub mime_type: String,
    pub last_modified: DateTime<Utc>,
    pub bytes: Vec<u8>,
}

impl UploadSource {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        last_modified: DateTime<Utc>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            last_modified,
            bytes,
        }
    }

    /// Read a file from disk, sniffing its MIME type from the content and
    /// falling back to the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let modified = std::fs::metadata(path)?.modified()?;
        let mime_type = image::guess_format(&bytes)
            .or_else(|_| image::ImageFormat::from_path(path))
            .map(|format| format.to_mime_type().to_string())
            .unwrap_or_else(|_| "application/octet-stream".to_string());
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(name, mime_type, DateTime::<Utc>::from(modified), bytes))
    }

    /// `<name>-<lastModifiedMillis>`; stable across repeated uploads of the same file.
    pub fn id(&self) -> String {
        format!("{}-{}", self.name, self.last_modified.timestamp_millis())
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn payload(&self) -> ImagePayload {
        ImagePayload::new(self.mime_type.clone(), self.bytes.clone())
    }
}

impl std::fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSource")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("last_modified", &self.last_modified)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// An image in the uploaded or processed collection. Each entry owns its
/// preview handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudioImage {
    pub id: String,
    /// Original file name
    pub name: String,
    pub payload: ImagePayload,
    pub preview: ResourceHandle,
}

/// Ordered image collection keyed by id.
#[derive(Debug, Default)]
pub struct ImageSet {
    items: Vec<StudioImage>,
}

impl ImageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append, or replace in place when the id is already present.
    /// Returns the replaced entry so its handle can be revoked.
    pub fn insert(&mut self, image: StudioImage) -> Option<StudioImage> {
        match self.items.iter_mut().find(|i| i.id == image.id) {
            Some(existing) => Some(std::mem::replace(existing, image)),
            None => {
                self.items.push(image);
                None
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<StudioImage> {
        let idx = self.items.iter().position(|i| i.id == id)?;
        Some(self.items.remove(idx))
    }

    /// Swap an entry's content, keeping its id and position. Returns the old
    /// preview handle.
    pub fn replace_content(
        &mut self,
        id: &str,
        payload: ImagePayload,
        preview: ResourceHandle,
    ) -> Option<ResourceHandle> {
        let image = self.items.iter_mut().find(|i| i.id == id)?;
        image.payload = payload;
        Some(std::mem::replace(&mut image.preview, preview))
    }

    pub fn get(&self, id: &str) -> Option<&StudioImage> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StudioImage> {
        self.items.iter()
    }

    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(|i| i.id.clone()).collect()
    }

    pub fn payloads(&self) -> Vec<ImagePayload> {
        self.items.iter().map(|i| i.payload.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn drain(&mut self) -> Vec<StudioImage> {
        std::mem::take(&mut self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceManager;
    use chrono::TimeZone;

    fn source(name: &str, millis: i64) -> UploadSource {
        UploadSource::new(
            name,
            "image/png",
            Utc.timestamp_millis_opt(millis).unwrap(),
            name.as_bytes().to_vec(),
        )
    }

    fn image(resources: &mut ResourceManager, src: &UploadSource) -> StudioImage {
        StudioImage {
            id: src.id(),
            name: src.name.clone(),
            payload: src.payload(),
            preview: resources.allocate(src.bytes.clone(), src.mime_type.clone()),
        }
    }

    #[test]
    fn test_id_from_name_and_mtime() {
        assert_eq!(source("cat.png", 1234).id(), "cat.png-1234");
    }

    #[test]
    fn test_mime_filter() {
        let mut src = source("notes.txt", 1);
        src.mime_type = "text/plain".to_string();
        assert!(!src.is_image());
        assert!(source("a.png", 1).is_image());
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut resources = ResourceManager::new();
        let mut set = ImageSet::new();
        let a = source("a.png", 1);
        let b = source("b.png", 2);
        assert!(set.insert(image(&mut resources, &a)).is_none());
        assert!(set.insert(image(&mut resources, &b)).is_none());
        let replaced = set.insert(image(&mut resources, &a)).unwrap();
        assert_eq!(replaced.id, a.id());
        assert_eq!(set.ids(), vec![a.id(), b.id()]);
    }

    #[test]
    fn test_replace_content_keeps_id() {
        let mut resources = ResourceManager::new();
        let mut set = ImageSet::new();
        let a = source("a.png", 1);
        let original = image(&mut resources, &a);
        let old_handle = original.preview.clone();
        set.insert(original);

        let new_handle = resources.allocate(b"cut".to_vec(), "image/png");
        let returned = set
            .replace_content(&a.id(), ImagePayload::png(b"cut".to_vec()), new_handle.clone())
            .unwrap();
        assert_eq!(returned, old_handle);
        let entry = set.get(&a.id()).unwrap();
        assert_eq!(entry.payload.data, b"cut");
        assert_eq!(entry.preview, new_handle);
        assert!(set.replace_content("missing", ImagePayload::png(vec![]), new_handle).is_none());
    }

    #[test]
    fn test_from_path_sniffs_mime() {
        let dir = std::env::temp_dir().join(format!("genstudio-upload-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pixel.bin");
        // PNG signature is enough for format detection.
        std::fs::write(&path, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0]).unwrap();
        let src = UploadSource::from_path(&path).unwrap();
        assert_eq!(src.mime_type, "image/png");
        assert_eq!(src.name, "pixel.bin");
        assert!(src.id().starts_with("pixel.bin-"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
