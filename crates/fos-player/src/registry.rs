//! Track Registry
//!
//! Catalog of selectable tracks for the current video. Embedded entries
//! are keyed by native text-track index and registered at most once;
//! uploaded entries accumulate, one per upload. Entries are never
//! overwritten, only dropped wholesale by [`TrackRegistry::reset`].

use std::fmt;

/// Track identifier: `none`, `embedded-<index>` or `uploaded-<stamp>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(String);

impl TrackId {
    pub const NONE: &'static str = "none";

    pub fn none() -> Self {
        Self(Self::NONE.to_string())
    }

    pub fn embedded(index: usize) -> Self {
        Self(format!("embedded-{}", index))
    }

    pub fn uploaded(stamp: u64) -> Self {
        Self(format!("uploaded-{}", stamp))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_none(&self) -> bool {
        self.0 == Self::NONE
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Where a track's cues come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOrigin {
    /// Native text track at this index
    Embedded { index: usize },
    /// Converted resource attached through the `<track>` element
    Uploaded { url: String },
}

/// Track descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
    pub id: TrackId,
    pub label: String,
    pub origin: TrackOrigin,
}

/// Result of registering an embedded track
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Added(TrackId),
    /// An entry for that index already existed; nothing changed
    Duplicate(TrackId),
}

impl Registration {
    pub fn id(&self) -> &TrackId {
        match self {
            Self::Added(id) | Self::Duplicate(id) => id,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added(_))
    }
}

/// Track registry
#[derive(Debug, Default)]
pub struct TrackRegistry {
    entries: Vec<TrackDescriptor>,
    last_stamp: u64,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entry. Returns the resource URLs of uploaded entries
    /// so the caller can release them.
    pub fn reset(&mut self) -> Vec<String> {
        self.entries
            .drain(..)
            .filter_map(|entry| match entry.origin {
                TrackOrigin::Uploaded { url } => Some(url),
                TrackOrigin::Embedded { .. } => None,
            })
            .collect()
    }

    /// Register an uploaded track under a fresh id
    pub fn add_uploaded(&mut self, label: &str, url: &str) -> TrackId {
        let stamp = self.next_stamp();
        let id = TrackId::uploaded(stamp);
        self.entries.push(TrackDescriptor {
            id: id.clone(),
            label: label.to_string(),
            origin: TrackOrigin::Uploaded { url: url.to_string() },
        });
        tracing::debug!(%id, label, "registered uploaded track");
        id
    }

    /// Register an embedded track; idempotent per index
    pub fn add_embedded(&mut self, index: usize, label: &str) -> Registration {
        if let Some(existing) = self.embedded_entry(index) {
            return Registration::Duplicate(existing.id.clone());
        }
        let id = TrackId::embedded(index);
        self.entries.push(TrackDescriptor {
            id: id.clone(),
            label: label.to_string(),
            origin: TrackOrigin::Embedded { index },
        });
        tracing::debug!(%id, label, "registered embedded track");
        Registration::Added(id)
    }

    pub fn get(&self, id: &str) -> Option<&TrackDescriptor> {
        self.entries.iter().find(|e| e.id.as_str() == id)
    }

    fn embedded_entry(&self, index: usize) -> Option<&TrackDescriptor> {
        self.entries
            .iter()
            .find(|e| e.origin == TrackOrigin::Embedded { index })
    }

    pub fn contains_embedded(&self, index: usize) -> bool {
        self.embedded_entry(index).is_some()
    }

    /// Entries in registration order
    pub fn entries(&self) -> &[TrackDescriptor] {
        &self.entries
    }

    pub fn embedded(&self) -> impl Iterator<Item = &TrackDescriptor> {
        self.entries
            .iter()
            .filter(|e| matches!(e.origin, TrackOrigin::Embedded { .. }))
    }

    pub fn has_embedded(&self) -> bool {
        self.embedded().next().is_some()
    }

    /// Embedded entry with the lowest native index
    pub fn first_embedded(&self) -> Option<&TrackDescriptor> {
        self.embedded().min_by_key(|e| match e.origin {
            TrackOrigin::Embedded { index } => index,
            TrackOrigin::Uploaded { .. } => usize::MAX,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wall-clock millis, bumped past the previous stamp so ids stay unique
    fn next_stamp(&mut self) -> u64 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        self.last_stamp = now.max(self.last_stamp + 1);
        self.last_stamp
    }
}
