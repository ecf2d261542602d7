//! # REST API Errors
//!
//! Maps subsystem errors onto HTTP statuses and the `{"error", "code"}`
//! response body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::filter::FilterError;
use crate::pagination::PaginationError;

/// Result type for REST operations
pub type ApiResult<T> = Result<T, ApiError>;

/// REST API errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    // ==================
    // Not Found (404)
    // ==================
    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    #[error("Class not found: {0}")]
    ClassNotFound(String),

    // ==================
    // Query errors (400 or 500)
    // ==================
    #[error("Invalid filter: {0}")]
    Filter(#[from] FilterError),

    #[error("{0}")]
    Pagination(#[from] PaginationError),
}

impl ApiError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InstanceNotFound(_) | ApiError::ClassNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Filter(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Pagination(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Filter(_) | ApiError::Pagination(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl From<ApiError> for ErrorResponse {
    fn from(err: ApiError) -> Self {
        Self {
            code: err.status_code().as_u16(),
            error: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::from(self));
        (status, body).into_response()
    }
}
