//! In-memory row backend for testing.

use crate::backend::{Row, RowBackend};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// An in-memory row backend.
///
/// Suitable for unit tests and ephemeral registries. Writes can be made to
/// fail on demand to exercise persistence-failure paths.
///
/// # Example
///
/// ```rust
/// use corpreg_storage::{InMemoryBackend, RowBackend};
///
/// let backend = InMemoryBackend::new();
/// backend.set_fail_writes(true);
/// assert!(backend.rewrite(&[]).is_err());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    rows: RwLock<Vec<Row>>,
    fail_writes: AtomicBool,
    rewrites: AtomicU64,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that already holds `rows`.
    ///
    /// Useful for testing bootstrap.
    #[must_use]
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows: RwLock::new(rows),
            ..Self::default()
        }
    }

    /// Makes subsequent rewrites fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Returns a copy of the stored rows.
    #[must_use]
    pub fn rows(&self) -> Vec<Row> {
        self.rows.read().clone()
    }

    /// Returns how many rewrites have succeeded.
    #[must_use]
    pub fn rewrite_count(&self) -> u64 {
        self.rewrites.load(Ordering::SeqCst)
    }
}

impl RowBackend for InMemoryBackend {
    fn read_rows(&self) -> StorageResult<Vec<Row>> {
        Ok(self.rows.read().clone())
    }

    fn rewrite(&self, rows: &[Row]) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteRejected("fail_writes is set".into()));
        }

        *self.rows.write() = rows.to_vec();
        self.rewrites.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
