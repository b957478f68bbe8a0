//! Error types for the registry server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use corpreg_core::CoreError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the registry server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Malformed or incomplete request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The request would break a uniqueness constraint.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Store or storage failure.
    #[error("store error: {0}")]
    Store(CoreError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServerError::InvalidRequest(_) | ServerError::Conflict(_))
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            ServerError::Store(_) | ServerError::Internal(_) | ServerError::Io(_)
        )
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoreError> for ServerError {
    fn from(err: CoreError) -> Self {
        match err {
            err if !err.is_rejection() => ServerError::Store(err),
            err @ CoreError::TaxIdConflict { .. } => ServerError::Conflict(err.to_string()),
            err => ServerError::InvalidRequest(err.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, self.to_string()).into_response()
    }
}
