//! HTTP error responses.

use crate::error::PdfCacheError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A [`PdfCacheError`] on its way out of a handler.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<PdfCacheError> for ApiError {
    fn from(err: PdfCacheError) -> Self {
        match &err {
            PdfCacheError::UnsupportedMediaType { content_type } => {
                warn!("Rejected upload with content type '{}'", content_type);
                Self::bad_request("Only PDF files are allowed")
            }
            PdfCacheError::UploadTooLarge { .. } => {
                warn!("{}", err);
                Self::new(StatusCode::PAYLOAD_TOO_LARGE, err.to_string())
            }
            e if e.is_client_error() => {
                warn!("Rejected request: {}", e);
                Self::bad_request(e.to_string())
            }
            PdfCacheError::QueueFull { .. } | PdfCacheError::QueueClosed => {
                warn!("{}", err);
                Self::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
            _ => {
                error!("Request failed: {}", err);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}
