//! Rotating image cache backing the camera entity
//!
//! Owns the gallery and the rotation pointer. Ingests are serialized by a
//! mutation lock and publish a new `Arc<Gallery>` only after it is on disk;
//! the state lock is held just long enough to swap the gallery or move the
//! pointer. Readers take one consistent `(gallery, pointer)` snapshot per call.
//! URL validation and the snapshot write both run outside the state lock, so a
//! slow batch never blocks rotation or reads.

use bytes::Bytes;
use futures::{StreamExt, stream};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, error, info};

use crate::config::PhotosConfig;
use crate::errors::{SnapshotError, SnapshotResult};
use crate::fetcher::{ImageFetcher, parse_image_url};
use crate::gallery::{Gallery, ImageReference, SnapshotStore};

/// The image the camera currently shows
#[derive(Debug, Clone, PartialEq)]
pub enum CurrentImage {
    /// A gallery entry at `position` in date order
    Entry {
        position: usize,
        reference: ImageReference,
    },
    /// No gallery image selected, the placeholder is shown
    Default { url: String },
}

impl CurrentImage {
    pub fn url(&self) -> &str {
        match self {
            Self::Entry { reference, .. } => &reference.url,
            Self::Default { url } => url,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default { .. })
    }
}

/// Sent to subscribers whenever the rotation moves
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateChanged {
    pub pointer: usize,
    pub url: String,
}

/// Outcome of one ingested batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub accepted: usize,
    pub rejected: usize,
    pub evicted: usize,
    pub size: usize,
}

#[derive(Debug, Clone)]
struct RotationState {
    gallery: Arc<Gallery>,
    /// In `0..=gallery.len()`; `gallery.len()` selects the placeholder
    pointer: usize,
}

impl RotationState {
    fn current(&self, default_url: &str) -> CurrentImage {
        match self.gallery.get(self.pointer) {
            Some(entry) => CurrentImage::Entry {
                position: self.pointer,
                reference: entry.reference.clone(),
            },
            None => CurrentImage::Default {
                url: default_url.to_string(),
            },
        }
    }
}

pub struct RotatingImageCache {
    fetcher: Arc<dyn ImageFetcher>,
    store: SnapshotStore,
    max_images: usize,
    default_url: String,
    validation_concurrency: usize,
    mutation: Mutex<()>,
    state: RwLock<RotationState>,
    changes: broadcast::Sender<StateChanged>,
}

impl RotatingImageCache {
    pub fn new(
        config: &PhotosConfig,
        fetcher: Arc<dyn ImageFetcher>,
        store: SnapshotStore,
        gallery: Gallery,
    ) -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            fetcher,
            store,
            max_images: config.max_images,
            default_url: config.default_image_url.clone(),
            validation_concurrency: config.validation_concurrency.max(1),
            mutation: Mutex::new(()),
            state: RwLock::new(RotationState {
                gallery: Arc::new(gallery),
                pointer: 0,
            }),
            changes,
        }
    }

    /// Restore the gallery from `config.snapshot_path` (creating it if absent)
    pub fn open(config: &PhotosConfig, fetcher: Arc<dyn ImageFetcher>) -> SnapshotResult<Self> {
        let store = SnapshotStore::new(&config.snapshot_path);
        let gallery = store.load_or_init(config.max_images)?;
        Ok(Self::new(config, fetcher, store, gallery))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChanged> {
        self.changes.subscribe()
    }

    pub fn default_url(&self) -> &str {
        &self.default_url
    }

    pub async fn gallery(&self) -> Arc<Gallery> {
        self.state.read().await.gallery.clone()
    }

    pub async fn pointer(&self) -> usize {
        self.state.read().await.pointer
    }

    /// Validate, merge and persist a batch of image descriptors.
    ///
    /// Descriptors whose url fails validation are logged and skipped. The new
    /// gallery is only published once it has been written to disk; a write
    /// failure leaves the previous gallery in place and is returned.
    pub async fn ingest(&self, batch: Vec<ImageReference>) -> SnapshotResult<IngestReport> {
        let submitted = batch.len();
        let fetcher = &self.fetcher;

        let accepted: Vec<ImageReference> = stream::iter(batch)
            .map(|reference| async move {
                let checked = match parse_image_url(&reference.url) {
                    Ok(_) => fetcher.check(&reference.url).await,
                    Err(e) => Err(e),
                };
                match checked {
                    Ok(()) => Some(reference),
                    Err(e) => {
                        error!("Skipping image: {}", e);
                        None
                    }
                }
            })
            .buffered(self.validation_concurrency)
            .filter_map(|reference| async move { reference })
            .collect()
            .await;

        let _mutation = self.mutation.lock().await;
        let current = self.gallery().await;
        let mut next = (*current).clone();
        let accepted_count = accepted.len();
        for reference in accepted {
            next.upsert(reference);
        }
        let evicted = next.normalize(self.max_images);
        let next = Arc::new(next);

        self.persist(next.clone()).await?;

        let size = next.len();
        {
            let mut state = self.state.write().await;
            state.pointer = state.pointer.min(size);
            state.gallery = next;
        }

        let report = IngestReport {
            accepted: accepted_count,
            rejected: submitted - accepted_count,
            evicted,
            size,
        };
        debug!("Ingested image batch: {:?}", report);
        Ok(report)
    }

    async fn persist(&self, gallery: Arc<Gallery>) -> SnapshotResult<()> {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || store.save(&gallery))
            .await
            .map_err(|e| SnapshotError::io(self.store.path(), std::io::Error::other(e.to_string())))?
    }

    /// Move to the next gallery image, wrapping around.
    ///
    /// Returns false without notifying subscribers when the gallery is empty.
    pub async fn advance_rotation(&self) -> bool {
        let changed = {
            let mut state = self.state.write().await;
            debug!(
                "Number of images available for rotation: {}",
                state.gallery.len()
            );
            if state.gallery.is_empty() {
                return false;
            }
            state.pointer = (state.pointer + 1) % state.gallery.len();
            StateChanged {
                pointer: state.pointer,
                url: state.current(&self.default_url).url().to_string(),
            }
        };

        // No subscribers is not an error
        let _ = self.changes.send(changed);
        true
    }

    /// The image selected by the rotation pointer, or the placeholder
    pub async fn current_reference(&self) -> CurrentImage {
        self.state.read().await.current(&self.default_url)
    }

    /// Download the bytes for `current`, falling back to the placeholder.
    ///
    /// Returns `None` only when the placeholder itself cannot be fetched.
    pub async fn fetch_bytes(&self, current: &CurrentImage) -> Option<Bytes> {
        match current {
            CurrentImage::Entry { reference, .. } => {
                match self.fetcher.fetch(&reference.url).await {
                    Ok(bytes) => return Some(bytes),
                    Err(e) => error!("{}", e),
                }
            }
            CurrentImage::Default { .. } => {
                debug!("No custom image urls, serving default image");
            }
        }

        match self.fetcher.fetch(&self.default_url).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                error!("Default image unavailable: {}", e);
                None
            }
        }
    }

    pub async fn log_summary(&self) {
        let state = self.state.read().await;
        info!(
            "Photo gallery ready: {} image(s), snapshot at {}",
            state.gallery.len(),
            self.store.path().display()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{FetchError, SnapshotError};
    use crate::fetcher::MockImageFetcher;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    const DEFAULT_URL: &str = "https://placeholder.example.com/none.png";

    fn photos_config(dir: &TempDir, max_images: usize) -> PhotosConfig {
        PhotosConfig {
            max_images,
            default_image_url: DEFAULT_URL.to_string(),
            snapshot_path: dir.path().join("img_urls.json"),
            ..PhotosConfig::default()
        }
    }

    fn image(url: &str, seconds: i64) -> ImageReference {
        ImageReference::new(url, Utc.timestamp_opt(seconds, 0).unwrap())
    }

    fn accepting_fetcher() -> MockImageFetcher {
        let mut fetcher = MockImageFetcher::new();
        fetcher.expect_check().returning(|_| Ok(()));
        fetcher
    }

    fn open_cache(dir: &TempDir, max_images: usize, fetcher: MockImageFetcher) -> RotatingImageCache {
        RotatingImageCache::open(&photos_config(dir, max_images), Arc::new(fetcher)).unwrap()
    }

    async fn gallery_urls(cache: &RotatingImageCache) -> Vec<String> {
        let gallery = cache.gallery().await;
        gallery.iter().map(|e| e.reference.url.clone()).collect()
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failing_urls_are_excluded_and_logged() {
        let temp_dir = TempDir::new().unwrap();
        let mut fetcher = MockImageFetcher::new();
        fetcher.expect_check().returning(|url| {
            if url.contains("broken") {
                Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                })
            } else {
                Ok(())
            }
        });
        let cache = open_cache(&temp_dir, 10, fetcher);

        let report = cache
            .ingest(vec![
                image("https://example.com/a.jpg", 1),
                image("https://example.com/broken.jpg", 2),
                image("https://example.com/c.jpg", 3),
            ])
            .await
            .unwrap();

        assert_eq!(report.accepted, 2);
        assert_eq!(report.rejected, 1);
        assert_eq!(
            gallery_urls(&cache).await,
            vec!["https://example.com/a.jpg", "https://example.com/c.jpg"]
        );
        assert!(logs_contain("did not return a valid image"));
    }

    #[tokio::test]
    async fn test_malformed_urls_never_reach_the_network() {
        let temp_dir = TempDir::new().unwrap();
        let mut fetcher = MockImageFetcher::new();
        fetcher
            .expect_check()
            .withf(|url: &str| url == "https://example.com/ok.jpg")
            .times(1)
            .returning(|_| Ok(()));
        let cache = open_cache(&temp_dir, 10, fetcher);

        let report = cache
            .ingest(vec![
                image("ftp://example.com/a.jpg", 1),
                image("https://example.com/ok.jpg", 2),
            ])
            .await
            .unwrap();

        assert_eq!(report.rejected, 1);
        assert_eq!(report.size, 1);
    }

    #[tokio::test]
    async fn test_reingestion_is_idempotent_and_last_write_wins() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 10, accepting_fetcher());

        cache
            .ingest(vec![image("https://example.com/a.jpg", 5).with_metadata("caption", json!("old"))])
            .await
            .unwrap();
        let report = cache
            .ingest(vec![image("https://example.com/a.jpg", 5).with_metadata("caption", json!("new"))])
            .await
            .unwrap();

        assert_eq!(report.size, 1);
        let gallery = cache.gallery().await;
        assert_eq!(gallery.get(0).unwrap().reference.metadata["caption"], json!("new"));
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 2, accepting_fetcher());

        let report = cache
            .ingest(vec![
                image("https://example.com/1.jpg", 1),
                image("https://example.com/2.jpg", 2),
                image("https://example.com/3.jpg", 3),
            ])
            .await
            .unwrap();

        assert_eq!(report.evicted, 1);
        assert_eq!(
            gallery_urls(&cache).await,
            vec!["https://example.com/2.jpg", "https://example.com/3.jpg"]
        );
    }

    #[tokio::test]
    async fn test_rotation_wraps_around() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 10, accepting_fetcher());
        cache
            .ingest(vec![
                image("https://example.com/1.jpg", 1),
                image("https://example.com/2.jpg", 2),
                image("https://example.com/3.jpg", 3),
            ])
            .await
            .unwrap();

        assert!(cache.advance_rotation().await);
        assert!(cache.advance_rotation().await);
        assert_eq!(cache.pointer().await, 2);

        assert!(cache.advance_rotation().await);
        assert_eq!(cache.pointer().await, 0);
        assert_eq!(cache.current_reference().await.url(), "https://example.com/1.jpg");
    }

    #[tokio::test]
    async fn test_empty_rotation_is_silent_noop() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 10, MockImageFetcher::new());
        let mut changes = cache.subscribe();

        assert!(!cache.advance_rotation().await);

        assert_eq!(cache.pointer().await, 0);
        assert!(matches!(
            changes.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_rotation_notifies_subscribers() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 10, accepting_fetcher());
        cache
            .ingest(vec![
                image("https://example.com/1.jpg", 1),
                image("https://example.com/2.jpg", 2),
            ])
            .await
            .unwrap();
        let mut changes = cache.subscribe();

        cache.advance_rotation().await;

        assert_eq!(
            changes.try_recv().unwrap(),
            StateChanged {
                pointer: 1,
                url: "https://example.com/2.jpg".to_string()
            }
        );
    }

    #[test]
    fn test_pointer_at_size_selects_placeholder() {
        let gallery = Gallery::from_references(
            vec![image("https://example.com/1.jpg", 1), image("https://example.com/2.jpg", 2)],
            10,
        );
        let state = RotationState {
            pointer: gallery.len(),
            gallery: Arc::new(gallery),
        };

        let current = state.current(DEFAULT_URL);
        assert!(current.is_default());
        assert_eq!(current.url(), DEFAULT_URL);
    }

    #[tokio::test]
    async fn test_empty_gallery_serves_placeholder() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 10, MockImageFetcher::new());

        assert_eq!(
            cache.current_reference().await,
            CurrentImage::Default {
                url: DEFAULT_URL.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_falls_back_to_placeholder_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let mut fetcher = accepting_fetcher();
        fetcher.expect_fetch().returning(|url| {
            if url == DEFAULT_URL {
                Ok(Bytes::from_static(b"placeholder"))
            } else {
                Err(FetchError::Status {
                    url: url.to_string(),
                    status: 500,
                })
            }
        });
        let cache = open_cache(&temp_dir, 10, fetcher);
        cache
            .ingest(vec![image("https://example.com/1.jpg", 1)])
            .await
            .unwrap();

        let current = cache.current_reference().await;
        assert!(!current.is_default());
        let bytes = cache.fetch_bytes(&current).await;

        assert_eq!(bytes, Some(Bytes::from_static(b"placeholder")));
    }

    #[tokio::test]
    async fn test_unreachable_placeholder_yields_none() {
        let temp_dir = TempDir::new().unwrap();
        let mut fetcher = MockImageFetcher::new();
        fetcher.expect_fetch().returning(|url| {
            Err(FetchError::Timeout {
                url: url.to_string(),
            })
        });
        let cache = open_cache(&temp_dir, 10, fetcher);

        let current = cache.current_reference().await;
        assert_eq!(cache.fetch_bytes(&current).await, None);
    }

    #[tokio::test]
    async fn test_accepted_images_are_persisted_before_return() {
        let temp_dir = TempDir::new().unwrap();
        let cache = open_cache(&temp_dir, 10, accepting_fetcher());
        cache
            .ingest(vec![image("https://example.com/1.jpg", 1).with_metadata("activity_id", json!(7))])
            .await
            .unwrap();

        let reopened = open_cache(&temp_dir, 10, MockImageFetcher::new());

        assert_eq!(*reopened.gallery().await, *cache.gallery().await);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_previous_gallery() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let config = PhotosConfig {
            snapshot_path: blocker.join("img_urls.json"),
            ..photos_config(&temp_dir, 10)
        };
        let cache = RotatingImageCache::new(
            &config,
            Arc::new(accepting_fetcher()),
            SnapshotStore::new(&config.snapshot_path),
            Gallery::new(),
        );

        let result = cache.ingest(vec![image("https://example.com/1.jpg", 1)]).await;

        assert!(matches!(result, Err(SnapshotError::Io { .. })));
        assert!(cache.gallery().await.is_empty());
    }
}
