//! Error types for the HTTP API
//!
//! Every error body has the shape `{"error": {"code", "message"}}`; validation
//! errors add a `fields` list. Server-side failures are logged in full and
//! answered with a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// One rejected request field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

const INTERNAL_MESSAGE: &str = "Internal server error";

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body or query failed validation (400)
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: Vec<FieldError>,
    },

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// leadwell-common error
    #[error("Common error: {0}")]
    Common(#[from] leadwell_common::Error),
}

impl ApiError {
    pub fn validation(fields: Vec<FieldError>) -> Self {
        ApiError::Validation {
            message: "Validation failed".to_string(),
            fields,
        }
    }

    pub fn not_found(what: &str, id: i64) -> Self {
        ApiError::NotFound(format!("{} {} not found", what, id))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, fields) = match self {
            ApiError::Validation { message, fields } => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message, Some(fields))
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            ApiError::Common(leadwell_common::Error::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None)
            }
            ApiError::Common(leadwell_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None)
            }
            other => {
                tracing::error!(error = %other, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    INTERNAL_MESSAGE.to_string(),
                    None,
                )
            }
        };

        let body = match fields {
            Some(fields) => json!({
                "error": {
                    "code": error_code,
                    "message": message,
                    "fields": fields,
                }
            }),
            None => json!({
                "error": {
                    "code": error_code,
                    "message": message,
                }
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
