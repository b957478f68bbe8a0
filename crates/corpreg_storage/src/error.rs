//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The CSV layer rejected a row.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A write was refused on purpose (test backends only).
    #[error("write rejected: {0}")]
    WriteRejected(String),
}
