//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad or missing input.
    #[error("{0}")]
    BadRequest(String),

    /// Content rejected by the upload policy.
    #[error("{0}")]
    UnprocessableEntity(String),

    /// Unknown resource or a capability that does not verify.
    #[error("not found")]
    NotFound,

    /// Valid capability, resource already removed.
    #[error("gone")]
    Gone,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] shrink_storage::StorageError),

    #[error("metadata error: {0}")]
    Metadata(#[from] shrink_metadata::MetadataError),

    #[error("core error: {0}")]
    Core(#[from] shrink_core::Error),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::UnprocessableEntity(_) => "unprocessable_entity",
            Self::NotFound => "not_found",
            Self::Gone => "gone",
            Self::Unauthorized(_) => "unauthorized",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Internal(_) | Self::Storage(_) | Self::Metadata(_) => "internal_error",
            Self::Core(e) => match e {
                shrink_core::Error::InvalidUrl(_) | shrink_core::Error::InvalidFilename(_) => {
                    "bad_request"
                }
                _ => "internal_error",
            },
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Gone => StatusCode::GONE,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Storage(shrink_storage::StorageError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Storage(shrink_storage::StorageError::InvalidKey(_)) => StatusCode::NOT_FOUND,
            Self::Core(e) => match e {
                shrink_core::Error::InvalidUrl(_) | shrink_core::Error::InvalidFilename(_) => {
                    StatusCode::BAD_REQUEST
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Internal(_) | Self::Storage(_) | Self::Metadata(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to clients. Server-side failures stay in the logs.
    fn public_message(&self) -> String {
        match self.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => "internal server error".to_string(),
            StatusCode::NOT_FOUND => "not found".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
