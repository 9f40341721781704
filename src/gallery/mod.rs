//! Bounded, date-ordered collection of image references
//!
//! The gallery is a plain value: the cache builds a new one per ingestion and
//! swaps it in, so readers never observe a half-sorted gallery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

pub mod snapshot;

pub use snapshot::SnapshotStore;

/// Unique identifier of an image: SHA256 of its url, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageKey(String);

impl ImageKey {
    pub fn from_url(url: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let hash = hasher.finalize();
        Self(format!("{hash:x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An image url with its date and any extra fields from the source payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageReference {
    pub url: String,
    pub date: DateTime<Utc>,
    /// Passthrough fields, preserved verbatim
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl ImageReference {
    pub fn new<S: Into<String>>(url: S, date: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            date,
            metadata: Map::new(),
        }
    }

    pub fn with_metadata<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn key(&self) -> ImageKey {
        ImageKey::from_url(&self.url)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GalleryEntry {
    pub key: ImageKey,
    pub reference: ImageReference,
}

/// Ordered image references, oldest first.
///
/// After [`Gallery::normalize`] entries are sorted by date, ties broken by url,
/// and the gallery holds at most the requested number of entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a normalized gallery from references, later duplicates winning
    pub fn from_references<I>(references: I, max_images: usize) -> Self
    where
        I: IntoIterator<Item = ImageReference>,
    {
        let mut gallery = Self::new();
        for reference in references {
            gallery.upsert(reference);
        }
        gallery.normalize(max_images);
        gallery
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&GalleryEntry> {
        self.entries.get(position)
    }

    pub fn contains(&self, key: &ImageKey) -> bool {
        self.entries.iter().any(|entry| &entry.key == key)
    }

    pub fn find(&self, key: &ImageKey) -> Option<&ImageReference> {
        self.entries
            .iter()
            .find(|entry| &entry.key == key)
            .map(|entry| &entry.reference)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GalleryEntry> {
        self.entries.iter()
    }

    /// Insert a reference, replacing any entry with the same url
    pub fn upsert(&mut self, reference: ImageReference) -> ImageKey {
        let key = reference.key();
        match self.entries.iter_mut().find(|entry| entry.key == key) {
            Some(existing) => existing.reference = reference,
            None => self.entries.push(GalleryEntry {
                key: key.clone(),
                reference,
            }),
        }
        key
    }

    /// Sort ascending by date (url as tiebreaker) and drop the oldest entries
    /// beyond `max_images`. Returns the number of evicted entries.
    pub fn normalize(&mut self, max_images: usize) -> usize {
        self.entries.sort_by(|a, b| {
            a.reference
                .date
                .cmp(&b.reference.date)
                .then_with(|| a.reference.url.cmp(&b.reference.url))
        });

        let excess = self.entries.len().saturating_sub(max_images);
        self.entries.drain(..excess);
        excess
    }
}
