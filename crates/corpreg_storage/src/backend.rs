//! Row backend trait definition.

use crate::error::StorageResult;

/// One persisted row: an ordered list of opaque string fields.
pub type Row = Vec<String>;

/// A whole-file row store.
///
/// Backends are **opaque row stores**. They hand back exactly the rows that
/// were last written, in the order they were written, and never interpret
/// field contents.
///
/// # Invariants
///
/// - `read_rows` returns the rows of the last successful `rewrite`, in order
/// - `rewrite` replaces the entire contents; no earlier row survives it
/// - after `rewrite` returns `Ok`, the new contents survive process exit
/// - implementations serialize their own I/O and must be `Send + Sync`
///
/// # Implementors
///
/// - [`super::CsvFileBackend`] - For persistent storage
/// - [`super::InMemoryBackend`] - For testing
pub trait RowBackend: Send + Sync {
    /// Reads every row from the start of storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read or a row cannot be
    /// parsed.
    fn read_rows(&self) -> StorageResult<Vec<Row>>;

    /// Replaces the stored rows with `rows` and forces them to stable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if writing, truncating, or syncing fails. The
    /// previous contents may be partially overwritten in that case.
    fn rewrite(&self, rows: &[Row]) -> StorageResult<()>;
}

impl<B: RowBackend + ?Sized> RowBackend for std::sync::Arc<B> {
    fn read_rows(&self) -> StorageResult<Vec<Row>> {
        (**self).read_rows()
    }

    fn rewrite(&self, rows: &[Row]) -> StorageResult<()> {
        (**self).rewrite(rows)
    }
}
