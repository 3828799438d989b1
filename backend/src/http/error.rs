//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::repository::RepositoryError;
use crate::services::ReportError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Missing or wrong shared secret
    Unauthorized,
    /// Malformed query parameter
    BadRequest(String),
    /// Request body failed validation
    Validation(String),
    /// Bid store failure
    Repository(RepositoryError),
    /// Report run failed before delivery
    Report(ReportError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ApiError::new("UNAUTHORIZED", "Unauthorized"),
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ApiError::new("BAD_REQUEST", msg),
            ),
            AppError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::new("VALIDATION_ERROR", msg),
            ),
            AppError::Repository(e) => {
                let error = ApiError::new("REPOSITORY_ERROR", e.to_string());
                let error = if e.is_retryable() {
                    error.with_details("retryable")
                } else {
                    error
                };
                (StatusCode::INTERNAL_SERVER_ERROR, error)
            }
            AppError::Report(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("REPORT_ERROR", e.to_string()),
            ),
        };

        (status, Json(error)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Repository(err)
    }
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        AppError::Report(err)
    }
}
