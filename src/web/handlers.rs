//! Thin handlers over the camera entity and the event bus

use axum::{
    Json,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use serde_json::json;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use super::AppState;
use super::responses::{ApiResponse, CameraResponse, EventAccepted, RotationResponse, ok};
use crate::entity::CameraEntity;
use crate::events::{HostEvent, ImageUrlsUpdated};

pub const IMAGE_URL_HEADER: &str = "x-image-url";

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn get_camera(State(state): State<AppState>) -> Response {
    let frame = state.camera.describe().await;
    ok(CameraResponse {
        entity_id: state.camera.unique_id().to_string(),
        name: state.camera.name().to_string(),
        state: frame.state,
        attributes: frame.attributes,
        should_poll: state.camera.should_poll(),
        enabled_by_default: state.camera.enabled_by_default(),
    })
}

/// Raw bytes of the current image, falling back to the placeholder
pub async fn get_camera_image(State(state): State<AppState>) -> Response {
    let frame = state.camera.frame().await;
    let Some(image) = frame.image else {
        warn!("No image available for {}", frame.state);
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::<()>::error("Image unavailable".to_string())),
        )
            .into_response();
    };

    let content_type = infer::get(&image)
        .map(|kind| kind.mime_type())
        .unwrap_or("application/octet-stream");

    let mut response = (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], image).into_response();
    if let Ok(value) = HeaderValue::from_str(&frame.state) {
        response.headers_mut().insert(IMAGE_URL_HEADER, value);
    }
    response
}

/// Publish an "image URLs updated" event onto the bus
pub async fn publish_img_urls(
    State(state): State<AppState>,
    Json(payload): Json<ImageUrlsUpdated>,
) -> Response {
    let images = payload.img_urls.len();
    let event = HostEvent::ImageUrlsUpdated(payload);
    let name = event.name().to_string();
    let listeners = state.bus.publish(event);

    (
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(EventAccepted {
            event: name,
            images,
            listeners,
        })),
    )
        .into_response()
}

pub async fn rotate_camera(State(state): State<AppState>) -> Response {
    let rotated = state.camera.cache().advance_rotation().await;
    ok(RotationResponse {
        rotated,
        state: state.camera.state().await,
    })
}

/// Stream every rotation of the camera as server-sent events
pub async fn camera_events(State(state): State<AppState>) -> impl IntoResponse {
    let mut changes = state.camera.cache().subscribe();
    debug!("Starting camera state SSE stream");

    let stream = async_stream::stream! {
        yield Ok::<Event, axum::Error>(Event::default()
            .event("heartbeat")
            .data("connected"));

        loop {
            match changes.recv().await {
                Ok(changed) => match serde_json::to_string(&changed) {
                    Ok(json) => {
                        yield Ok::<Event, axum::Error>(Event::default()
                            .event("state_changed")
                            .data(json));
                    }
                    Err(e) => error!("Failed to serialize camera state change: {}", e),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Camera event stream lagged, {} change(s) skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("heartbeat"),
    )
}
