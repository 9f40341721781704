//! HTTP response types shared by the handlers

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the operation was successful
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Request timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now(),
        }
    }
}

impl<T> IntoResponse for ApiResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        let status = if self.success {
            StatusCode::OK
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (status, Json(self)).into_response()
    }
}

/// Camera entity as seen by the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraResponse {
    pub entity_id: String,
    pub name: String,
    pub state: String,
    pub attributes: BTreeMap<String, String>,
    pub should_poll: bool,
    pub enabled_by_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventAccepted {
    pub event: String,
    pub images: usize,
    pub listeners: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationResponse {
    pub rotated: bool,
    pub state: String,
}

/// Shorthand for a 200 response wrapped in `ApiResponse`
pub fn ok<T: Serialize>(data: T) -> Response {
    ApiResponse::success(data).into_response()
}
