//! Error types for the Exam Shuffler server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::docx::DocxError;
use crate::ooxml::PackageError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Message shown for every 500 response
const SERVER_ERROR_MESSAGE: &str = "Server error";

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad input from the caller; the message is shown as-is
    #[error("{0}")]
    Validation(String),

    /// The uploaded document could not be read
    #[error("Extraction failed: {0}")]
    Extraction(#[from] DocxError),

    /// Writing documents, the answer key or the archive failed
    #[error("Generation failed: {0}")]
    Generation(#[from] PackageError),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Validation(msg) => {
                tracing::debug!("Rejected request: {}", msg);
                msg.clone()
            }
            AppError::Extraction(e) => {
                tracing::error!("Extraction error: {}", e);
                SERVER_ERROR_MESSAGE.to_string()
            }
            AppError::Generation(e) => {
                tracing::error!("Generation error: {}", e);
                SERVER_ERROR_MESSAGE.to_string()
            }
            AppError::Timeout(secs) => {
                tracing::error!("Request exceeded {}s", secs);
                SERVER_ERROR_MESSAGE.to_string()
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                SERVER_ERROR_MESSAGE.to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                SERVER_ERROR_MESSAGE.to_string()
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Validation("No file uploaded".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::Timeout(5).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            AppError::Extraction(DocxError::MissingPart("word/document.xml".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_error_body_hides_internal_details() {
        let response = AppError::Internal("disk on fire".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Server error");
    }
}
