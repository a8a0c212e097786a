//! Error types for wenc-agg
//!
//! Upstream trouble is never an error at this level: adapters return
//! [`SourceError`], which the orchestrator turns into per-field soft
//! failures. What remains are input errors and the HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::sources::SourceError;

/// Entity resolution failure
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Query was empty after trimming; raised before any network call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The encyclopedia search itself failed
    #[error("Search failed: {0}")]
    Source(#[from] SourceError),
}

/// Relationship fetch failure
#[derive(Debug, Error, PartialEq)]
pub enum RelationError {
    /// Identifier is not of the form `Q123`, `P123` or `L123`
    #[error("Invalid knowledge-graph id: {0:?}")]
    InvalidInput(String),
}

/// Topic resolution failure
///
/// Only invalid input is fatal; everything upstream degrades into the record.
#[derive(Debug, Error, PartialEq)]
pub enum TopicError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409), e.g. a query superseded by a newer one
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Common error: {0}")]
    Common(#[from] wenc_common::Error),
}

impl From<TopicError> for ApiError {
    fn from(err: TopicError) -> Self {
        match err {
            TopicError::InvalidInput(msg) => ApiError::BadRequest(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
