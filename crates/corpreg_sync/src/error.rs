//! Error types for the reconciler.

use thiserror::Error;

/// Result type for reconcile operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during a reconcile cycle.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the next cycle may succeed.
        retryable: bool,
    },

    /// The registry answered with a non-success status.
    #[error("registry returned status {0}")]
    ServerStatus(u16),

    /// The registry response could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Relational sink error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Sink failure not originating from the database driver.
    #[error("sink error: {0}")]
    Sink(String),

    /// A blocking sink task panicked or was cancelled.
    #[error("sink task failed: {0}")]
    Task(String),

    /// A cycle was requested while another was in progress.
    #[error("reconcile cycle already in progress")]
    AlreadyRunning,

    /// Timeout.
    #[error("operation timed out")]
    Timeout,
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if a later cycle may succeed without intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Timeout | SyncError::AlreadyRunning => true,
            SyncError::ServerStatus(status) => *status >= 500,
            SyncError::Database(err) => matches!(
                err.sqlite_error_code(),
                Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
            ),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout
        } else if err.is_decode() {
            SyncError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            SyncError::ServerStatus(status.as_u16())
        } else if err.is_builder() {
            SyncError::transport_fatal(err.to_string())
        } else {
            SyncError::transport_retryable(err.to_string())
        }
    }
}
