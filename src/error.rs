//! Error taxonomy for uploads, extraction backends and the HTTP layer.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use tracing::error;

/// Rejections raised before any processing happens.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file provided")]
    MissingFile,

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("File type not supported: {0}")]
    UnsupportedType(String),

    #[error("File too large: {size} bytes (limit {limit} bytes)")]
    TooLarge { size: usize, limit: usize },

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Upload storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of a single extraction backend.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("OPENROUTER_API_KEY not set or contains a placeholder value")]
    MissingCredential,

    #[error("LLM API error ({status}): {body}")]
    Http { status: u16, body: String },

    #[error("LLM request timed out")]
    Timeout,

    #[error("LLM request failed: {0}")]
    Network(String),

    #[error("Malformed LLM response: {0}")]
    MalformedResponse(String),

    #[error("Backend returned no text")]
    EmptyResult,

    #[error("Unsupported input for {backend}: {content_type}")]
    UnsupportedInput {
        backend: &'static str,
        content_type: String,
    },

    #[error("Unreadable document: {0}")]
    UnreadableImage(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("OCR backend not available: {0}")]
    BackendUnavailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ExtractionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::MalformedResponse(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Top-level error returned by handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Processing failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Upload(e) => match e {
                UploadError::MissingFile
                | UploadError::EmptyFile
                | UploadError::UnsupportedType(_) => StatusCode::BAD_REQUEST,
                UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                UploadError::NotFound(_) => StatusCode::NOT_FOUND,
                UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Extraction(e) => match e {
                ExtractionError::UnsupportedLanguage(_) | ExtractionError::UnreadableImage(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                ExtractionError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_GATEWAY,
            },
            AppError::Multipart(e) => e.status(),
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::from(UploadError::TooLarge { size: 20, limit: 10 }).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            AppError::from(UploadError::NotFound("x".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(ExtractionError::UnsupportedLanguage("klingon".into())).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::from(ExtractionError::Timeout).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_extraction_message_keeps_cause() {
        let err = AppError::from(ExtractionError::OcrFailed("bad pixels".into()));
        assert_eq!(err.to_string(), "Processing failed: OCR failed: bad pixels");
    }
}
