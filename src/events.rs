//! In-process event bus carrying image URL updates
//!
//! The cache only exposes `ingest`; this module subscribes to the bus and
//! forwards payloads so the cache stays free of bus types. Every subscriber
//! gets its own unbounded queue, so a slow ingest never loses events.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::cache::RotatingImageCache;
use crate::gallery::ImageReference;

pub const IMG_UPDATE_EVENT: &str = "activity_photo_cam_img_update";

/// Payload of the "image URLs updated" event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrlsUpdated {
    pub img_urls: Vec<ImageReference>,
}

#[derive(Debug, Clone)]
pub enum HostEvent {
    ImageUrlsUpdated(ImageUrlsUpdated),
}

impl HostEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::ImageUrlsUpdated(_) => IMG_UPDATE_EVENT,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<HostEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event, returning how many listeners received it
    pub fn publish(&self, event: HostEvent) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Receivers that were dropped are pruned here
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());

        if subscribers.is_empty() {
            debug!("No listeners for event {}", event.name());
        }
        subscribers.len()
    }

    /// Every event published after this call is delivered to the receiver
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<HostEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }
}

/// Forward image URL updates from `bus` into `cache` until `shutdown` fires
/// or every handle to the bus is dropped
pub fn spawn_ingestion_listener(
    bus: &EventBus,
    cache: Arc<RotatingImageCache>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        info!("Listening for {} events", IMG_UPDATE_EVENT);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Ingestion listener shutting down");
                    break;
                }
                received = rx.recv() => match received {
                    Some(HostEvent::ImageUrlsUpdated(payload)) => {
                        match cache.ingest(payload.img_urls).await {
                            Ok(report) => debug!(
                                "Gallery updated: {} accepted, {} rejected, {} images",
                                report.accepted, report.rejected, report.size
                            ),
                            Err(e) => error!("Failed to persist image update: {}", e),
                        }
                    }
                    None => break,
                },
            }
        }
    })
}
