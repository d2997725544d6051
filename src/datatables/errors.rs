//! # DataTables Errors
//!
//! Error types for registration and request translation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use super::response::ErrorResponse;

/// Result type for DataTables operations
pub type DataTablesResult<T> = Result<T, DataTablesError>;

/// DataTables errors
#[derive(Debug, Clone, Error)]
pub enum DataTablesError {
    // ==================
    // Usage Errors
    // ==================
    /// Data source is neither a query descriptor nor in-memory rows
    #[error("Unsupported data source: {0}")]
    UnsupportedSource(String),

    /// Query-backed source declared no valid field names
    #[error("Query source '{0}' must declare at least one field")]
    EmptyFieldAllowList(String),

    /// Caller-supplied handle is malformed
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    /// Row transform id is not registered
    #[error("Unknown row transform: {0}")]
    UnknownTransform(String),

    /// Request could not be decoded
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // ==================
    // Lookup Errors
    // ==================
    /// No handle was supplied with the request
    #[error("Invalid session key.")]
    MissingSessionKey,

    /// Handle does not resolve to a registration in this session
    #[error("An error occurred or invalid session key.")]
    RegistrationNotFound,

    // ==================
    // Collaborator Errors
    // ==================
    /// Count or fetch against the data source failed
    #[error("Data source error: {0}")]
    DataSource(String),

    /// Internal state error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DataTablesError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            DataTablesError::UnsupportedSource(_) => StatusCode::BAD_REQUEST,
            DataTablesError::EmptyFieldAllowList(_) => StatusCode::BAD_REQUEST,
            DataTablesError::InvalidHandle(_) => StatusCode::BAD_REQUEST,
            DataTablesError::UnknownTransform(_) => StatusCode::BAD_REQUEST,
            DataTablesError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DataTablesError::MissingSessionKey => StatusCode::BAD_REQUEST,

            DataTablesError::RegistrationNotFound => StatusCode::NOT_FOUND,

            DataTablesError::DataSource(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DataTablesError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Lookup failures are request-level and recoverable by re-registering
    pub fn is_lookup_failure(&self) -> bool {
        matches!(
            self,
            DataTablesError::MissingSessionKey | DataTablesError::RegistrationNotFound
        )
    }
}

impl IntoResponse for DataTablesError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::from(self));
        (status, body).into_response()
    }
}
