//! Error types for the REST surface.
//!
//! [`ApiError`] unifies all request failures into a single enum that is
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. The body is
//! always `{"error": <message>, "status": <code>}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use switchboard_core::RegistryError;

/// Errors that can occur in the REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The switch id is unknown.
    #[error("Switch not found")]
    NotFound,

    /// The requested status is not `ON` or `OFF`.
    #[error("Invalid status. Must be ON or OFF.")]
    InvalidStatus,

    /// The request body is not JSON.
    #[error("Invalid request body")]
    InvalidBody,
}

impl ApiError {
    /// HTTP status for this error.
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidStatus | Self::InvalidBody => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(_) => Self::NotFound,
            RegistryError::InvalidStatus(_) => Self::InvalidStatus,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
