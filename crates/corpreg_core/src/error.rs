//! Error types for corpreg core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] corpreg_storage::StorageError),

    /// A record failed validation.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// The tax id already belongs to a different live record.
    #[error("tax id {tax_id:?} already belongs to {holder:?}")]
    TaxIdConflict {
        /// The contested tax id.
        tax_id: String,
        /// Name of the record currently holding it.
        holder: String,
    },

    /// A persisted row does not have the expected shape.
    #[error("corrupt row {row}: expected {expected} fields, found {found}")]
    CorruptRow {
        /// Zero-based row number in the file.
        row: usize,
        /// Expected number of fields.
        expected: usize,
        /// Number of fields found.
        found: usize,
    },
}

impl CoreError {
    /// Returns true if the error was caused by the caller's input rather
    /// than by the store or its storage.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidRecord(_) | CoreError::TaxIdConflict { .. }
        )
    }
}
