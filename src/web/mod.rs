//! Web layer module
//!
//! HTTP surface standing in for the host registry: it exposes the camera
//! entity's state, image and attributes, pushes rotations as server-sent
//! events, and accepts "image URLs updated" events that are published onto the
//! in-process bus.

use anyhow::Result;
use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::config::WebConfig;
use crate::entity::PhotoCamera;
use crate::events::EventBus;

pub mod handlers;
pub mod responses;

pub use responses::{ApiResponse, CameraResponse};

#[derive(Clone)]
pub struct AppState {
    pub camera: Arc<PhotoCamera>,
    pub bus: EventBus,
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/v1/camera", get(handlers::get_camera))
        .route("/api/v1/camera/image", get(handlers::get_camera_image))
        .route("/api/v1/camera/events", get(handlers::camera_events))
        .route("/api/v1/camera/rotate", post(handlers::rotate_camera))
        .route("/api/v1/events/img_urls", post(handlers::publish_img_urls))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(config: &WebConfig, state: AppState) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
        Ok(Self {
            app: router(state),
            addr,
        })
    }

    /// Serve until `shutdown` is cancelled
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        info!("Web server listening on {}", self.addr);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                info!("Web server received cancellation signal, shutting down gracefully");
            })
            .await?;
        Ok(())
    }
}
