use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::cache::RotatingImageCache;

/// Advances the camera rotation on a fixed interval
pub struct RotationScheduler {
    cache: Arc<RotatingImageCache>,
    period: Duration,
}

impl RotationScheduler {
    pub fn new(cache: Arc<RotatingImageCache>, period: Duration) -> Self {
        Self { cache, period }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        info!("Rotating camera image every {:?}", self.period);

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Rotation scheduler shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    trace!("Rotation tick");
                    self.cache.advance_rotation().await;
                }
            }
        }
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
