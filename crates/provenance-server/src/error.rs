//! Error types for the HTTP API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use provenance::KernelError;

/// Errors returned by API handlers.
///
/// Every variant renders as a JSON `{"detail": ...}` body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The session does not exist.
    #[error("Session not found")]
    NotFound,

    /// The session is finalized.
    #[error("Session already finalized")]
    AlreadyFinalized,

    /// The request was malformed or rejected by validation.
    #[error("{detail}")]
    BadRequest { status: StatusCode, detail: String },

    /// Storage or other internal failure. Details are logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: &'a str,
}

impl ApiError {
    /// A plain 400 Bad Request.
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::BadRequest {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AlreadyFinalized => StatusCode::BAD_REQUEST,
            Self::BadRequest { status, .. } => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<KernelError> for ApiError {
    fn from(err: KernelError) -> Self {
        match err {
            KernelError::SessionNotFound(_) => Self::NotFound,
            KernelError::AlreadyFinalized(_) => Self::AlreadyFinalized,
            KernelError::InvalidInput(detail) => Self::bad_request(detail),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = match &self {
            Self::Internal(reason) => {
                tracing::error!(%reason, "request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorBody { detail: &detail })).into_response()
    }
}
