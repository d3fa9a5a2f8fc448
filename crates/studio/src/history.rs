/// Generated artifacts: the append-only working history with its selection
/// pointer, and the gallery of explicitly saved copies.
use chrono::{DateTime, Utc};
use genai::ImagePayload;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactId(String);

impl ArtifactId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ArtifactId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ArtifactId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Issues `gen-<millis>` ids, bumping the timestamp so ids never repeat
/// within a process even when two artifacts land in the same millisecond.
#[derive(Debug, Default)]
pub struct ArtifactIdGenerator {
    last_millis: i64,
}

impl ArtifactIdGenerator {
    pub fn next_id(&mut self, now: DateTime<Utc>) -> ArtifactId {
        let millis = now.timestamp_millis().max(self.last_millis + 1);
        self.last_millis = millis;
        ArtifactId(format!("gen-{millis}"))
    }
}

/// Image produced by a generation, variation or refinement. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub id: ArtifactId,
    pub image: ImagePayload,
    /// Prompt recorded for traceability and reused by variations
    pub prompt: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ArtifactHistory {
    items: Vec<GeneratedArtifact>,
    selected: Option<ArtifactId>,
}

impl ArtifactHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append in creation order; duplicates are kept as-is.
    pub fn append(&mut self, artifact: GeneratedArtifact) {
        self.items.push(artifact);
    }

    /// Append and point the selection at the new artifact.
    pub fn append_selected(&mut self, artifact: GeneratedArtifact) -> ArtifactId {
        let id = artifact.id.clone();
        self.append(artifact);
        self.selected = Some(id.clone());
        id
    }

    /// Move the selection; ignored for unknown ids.
    pub fn select(&mut self, id: &ArtifactId) -> bool {
        if self.get(id).is_some() {
            self.selected = Some(id.clone());
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: &ArtifactId) -> Option<&GeneratedArtifact> {
        self.items.iter().find(|a| &a.id == id)
    }

    /// Selected artifact; a pointer to a missing id counts as no selection.
    pub fn selected(&self) -> Option<&GeneratedArtifact> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }

    pub fn selected_id(&self) -> Option<&ArtifactId> {
        self.selected().map(|a| &a.id)
    }

    pub fn latest(&self) -> Option<&GeneratedArtifact> {
        self.items.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratedArtifact> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.selected = None;
    }
}

/// Saved artifacts, most recent first. Not affected by session reset.
#[derive(Debug, Default)]
pub struct Gallery {
    entries: VecDeque<GeneratedArtifact>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn promote(&mut self, artifact: &GeneratedArtifact) {
        self.entries.push_front(artifact.clone());
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeneratedArtifact> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
