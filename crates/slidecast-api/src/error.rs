//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use slidecast_media::MediaError;
use thiserror::Error;

use crate::services::ContentError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Body of 413 responses.
pub const PAYLOAD_TOO_LARGE_MESSAGE: &str = "File is too large";
/// Body of 500 responses for faults with no safe message.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Gone(String),

    #[error("File is too large")]
    PayloadTooLarge,

    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("Failed to generate video: {}", .0.detail())]
    Media(#[from] MediaError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Gone(_) => StatusCode::GONE,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) | ApiError::Content(_) | ApiError::Media(_) | ApiError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(self.to_string());

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::PayloadTooLarge.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            ApiError::from(MediaError::EmptyScript).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages_carry_downstream_detail() {
        let err = ApiError::from(ContentError::Api {
            status: 429,
            message: "Rate limit exceeded".into(),
        });
        assert_eq!(err.to_string(), "Content API returned 429: Rate limit exceeded");

        let err = ApiError::from(MediaError::ffmpeg_failed("encode failed", Some("no space".into()), Some(1)));
        assert!(err.to_string().starts_with("Failed to generate video:"));
        assert!(err.to_string().contains("no space"));

        assert_eq!(ApiError::bad_request("Topic is required").to_string(), "Topic is required");
    }
}
