//! Versioned JSON persistence for the gallery
//!
//! Layout:
//!
//! ```json
//! { "version": 1, "saved_at": "...", "images": { "<sha256>": { "url": "...", "date": "...", ... } } }
//! ```
//!
//! Files are replaced atomically through a temp file in the same directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use super::{Gallery, ImageKey, ImageReference};
use crate::errors::{SnapshotError, SnapshotResult};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDocument {
    version: u32,
    saved_at: DateTime<Utc>,
    images: BTreeMap<ImageKey, ImageReference>,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot, `Ok(None)` when no file exists
    pub fn load(&self, max_images: usize) -> SnapshotResult<Option<Gallery>> {
        let contents = match std::fs::read(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SnapshotError::io(&self.path, e)),
        };

        let document: SnapshotDocument =
            serde_json::from_slice(&contents).map_err(|source| SnapshotError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        if document.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                path: self.path.clone(),
                found: document.version,
                expected: SNAPSHOT_VERSION,
            });
        }

        if let Some((key, _)) = document
            .images
            .iter()
            .find(|(key, reference)| **key != reference.key())
        {
            return Err(SnapshotError::KeyMismatch {
                path: self.path.clone(),
                key: key.to_string(),
            });
        }

        let gallery = Gallery::from_references(document.images.into_values(), max_images);
        debug!(
            "Loaded {} image references from {}",
            gallery.len(),
            self.path.display()
        );
        Ok(Some(gallery))
    }

    /// Atomically replace the snapshot with `gallery`
    pub fn save(&self, gallery: &Gallery) -> SnapshotResult<()> {
        let document = SnapshotDocument {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            images: gallery
                .iter()
                .map(|entry| (entry.key.clone(), entry.reference.clone()))
                .collect(),
        };
        let contents = serde_json::to_vec_pretty(&document).map_err(|source| {
            SnapshotError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| SnapshotError::io(&dir, e))?;

        let mut temp = NamedTempFile::new_in(&dir).map_err(|e| SnapshotError::io(&dir, e))?;
        temp.write_all(&contents)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| SnapshotError::io(temp.path(), e))?;
        temp.persist(&self.path)
            .map_err(|e| SnapshotError::io(&self.path, e.error))?;

        debug!(
            "Persisted {} image references to {}",
            gallery.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Restore the gallery at startup.
    ///
    /// A missing file yields an empty gallery that is written immediately. An
    /// unreadable file yields an empty gallery and is left in place until the
    /// next successful save overwrites it.
    pub fn load_or_init(&self, max_images: usize) -> SnapshotResult<Gallery> {
        match self.load(max_images) {
            Ok(Some(gallery)) => {
                info!(
                    "Restored {} image references from {}",
                    gallery.len(),
                    self.path.display()
                );
                Ok(gallery)
            }
            Ok(None) => {
                let gallery = Gallery::new();
                self.save(&gallery)?;
                info!("Created empty gallery snapshot at {}", self.path.display());
                Ok(gallery)
            }
            Err(e) if e.is_unreadable_content() => {
                warn!("Ignoring unreadable gallery snapshot: {}", e);
                Ok(Gallery::new())
            }
            Err(e) => Err(e),
        }
    }
}
