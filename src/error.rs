//! Unified error types for the API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Unified error type for startup and process-level failures.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration failed semantic validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Cache client construction error.
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the external cache layer.
///
/// None of these ever reach an HTTP caller; the connectivity monitor and the
/// counter service absorb them into a degraded response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Connection refused, dropped, or never established.
    #[error("connection error: {0}")]
    Connection(String),

    /// The server answered with an error reply.
    #[error("command error: {0}")]
    Command(String),

    /// The operation did not finish within its deadline.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// Operation that timed out.
        operation: &'static str,
        /// Deadline in milliseconds.
        timeout_ms: u64,
    },

    /// The stored counter value is not a non-negative integer.
    #[error("invalid counter value: {0}")]
    InvalidValue(String),

    /// No connection handle is available.
    #[error("not connected")]
    NotConnected,
}

impl CacheError {
    /// Whether this error means the connection itself is unusable.
    ///
    /// Reply-level failures (`Command`, `InvalidValue`) leave the connection
    /// healthy.
    pub fn is_connection_level(&self) -> bool {
        matches!(
            self,
            CacheError::Connection(_) | CacheError::Timeout { .. } | CacheError::NotConnected
        )
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheError::Connection(_) => "connection",
            CacheError::Command(_) => "command",
            CacheError::Timeout { .. } => "timeout",
            CacheError::InvalidValue(_) => "invalid_value",
            CacheError::NotConnected => "not_connected",
        }
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
            || err.is_timeout()
        {
            CacheError::Connection(err.to_string())
        } else {
            CacheError::Command(err.to_string())
        }
    }
}

/// Errors surfaced to HTTP callers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request body failed presence checks.
    #[error("{0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Unexpected server-side failure.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "success": false, "error": self.to_string() }))).into_response()
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AppError>;
