//! Error types for the two listeners.
//!
//! The capture surface is public, so its errors never carry internal detail.
//! The operator surface is authenticated and reports the underlying cause.

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracelink_store::StoreError;
use tracing::{debug, error};

use crate::render::RenderError;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("invalid json")]
    InvalidJson,

    #[error("payload too large")]
    PayloadTooLarge,

    #[error("unreadable body")]
    UnreadableBody,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CaptureError {
    /// Collapse a body-read failure into a detail-free capture error.
    pub fn from_body_rejection(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge
        } else {
            debug!(error = %rejection, "report body unreadable");
            Self::UnreadableBody
        }
    }
}

impl IntoResponse for CaptureError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidJson => {
                (StatusCode::BAD_REQUEST, Json(json!({"error": "invalid json"}))).into_response()
            }
            Self::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({"error": "payload too large"})),
            )
                .into_response(),
            Self::UnreadableBody => {
                (StatusCode::BAD_REQUEST, Json(json!({"error": "unreadable body"}))).into_response()
            }
            Self::Store(e) => {
                error!(error = %e, "capture request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "internal error"})),
                )
                    .into_response()
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OperatorError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("write {path}: {detail}")]
    Artifact { path: String, detail: String },
}

impl IntoResponse for OperatorError {
    fn into_response(self) -> Response {
        error!(error = %self, "operator request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": self.to_string()})),
        )
            .into_response()
    }
}

/// Startup failures.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
