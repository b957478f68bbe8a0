//! CSV file backend for persistent storage.

use crate::backend::{Row, RowBackend};
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A CSV file backend.
///
/// Rows are stored one per line with standard CSV quoting and no header
/// row. Every rewrite encodes the full row set, writes it from offset zero,
/// truncates whatever remains of the previous contents, and calls
/// `File::sync_all()`.
///
/// # Thread Safety
///
/// The file handle sits behind a single mutex, so concurrent reads and
/// rewrites are serialized. This lock is independent of any lock the caller
/// holds over its in-memory state.
///
/// # Example
///
/// ```no_run
/// use corpreg_storage::{CsvFileBackend, RowBackend};
/// use std::path::Path;
///
/// let backend = CsvFileBackend::open(Path::new("companies.csv")).unwrap();
/// backend.rewrite(&[vec!["acme".into(), "7701".into()]]).unwrap();
/// ```
#[derive(Debug)]
pub struct CsvFileBackend {
    path: PathBuf,
    file: Mutex<File>,
}

impl CsvFileBackend {
    /// Opens or creates a CSV backend at the given path.
    ///
    /// An existing file is opened for reading and writing without being
    /// truncated.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// Opens or creates a CSV backend, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created or the file cannot
    /// be opened.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn encode_rows(rows: &[Row]) -> StorageResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(Vec::new());

    for row in rows {
        writer.write_record(row)?;
    }

    writer
        .into_inner()
        .map_err(|e| StorageError::Io(e.into_error()))
}

impl RowBackend for CsvFileBackend {
    fn read_rows(&self) -> StorageResult<Vec<Row>> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(0))?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(&mut *file);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_owned).collect());
        }

        Ok(rows)
    }

    fn rewrite(&self, rows: &[Row]) -> StorageResult<()> {
        // Encode before taking the lock; the lock only covers disk I/O.
        let bytes = encode_rows(rows)?;

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&bytes)?;
        file.set_len(bytes.len() as u64)?;
        file.flush()?;
        file.sync_all()?;

        tracing::trace!(
            path = %self.path.display(),
            rows = rows.len(),
            bytes = bytes.len(),
            "rewrote row file"
        );
        Ok(())
    }
}
