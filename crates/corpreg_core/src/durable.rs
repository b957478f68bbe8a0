//! Durable log adapter: the flat-file mirror of the store.
//!
//! Rows carry the five record fields in the fixed order `name, inn, phone,
//! address, individual`. The tombstone flag is never persisted, so every
//! loaded record is live.

use crate::error::{CoreError, CoreResult};
use crate::record::Company;
use corpreg_storage::{CsvFileBackend, InMemoryBackend, Row, RowBackend};
use parking_lot::Mutex;
use std::path::Path;

/// Number of fields in a persisted row.
pub const FIELD_COUNT: usize = 5;

/// Reads and rewrites the full record set through a [`RowBackend`].
///
/// All file access goes through one mutex that is independent of the
/// store's lock, so slow disk I/O never holds up in-memory readers or
/// writers.
pub struct DurableLog {
    backend: Box<dyn RowBackend>,
    io: Mutex<()>,
}

impl DurableLog {
    /// Wraps a row backend.
    pub fn new(backend: impl RowBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            io: Mutex::new(()),
        }
    }

    /// Opens (or creates) a CSV file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open_file(path: &Path) -> CoreResult<Self> {
        Ok(Self::new(CsvFileBackend::open_with_create_dirs(path)?))
    }

    /// Creates a log backed by memory only.
    pub fn in_memory() -> Self {
        Self::new(InMemoryBackend::new())
    }

    /// Parses every row into a live record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::CorruptRow`] for a row without exactly
    /// [`FIELD_COUNT`] fields, or a storage error if the file cannot be read.
    pub fn load_all(&self) -> CoreResult<Vec<Company>> {
        let rows = {
            let _io = self.io.lock();
            self.backend.read_rows()?
        };

        rows.into_iter()
            .enumerate()
            .map(|(i, row)| row_to_company(i, row))
            .collect()
    }

    /// Overwrites the file with the live records of `records`, then fsyncs.
    ///
    /// Tombstoned records are skipped. Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns a storage error if writing or syncing fails.
    pub fn save_all(&self, records: &[Company]) -> CoreResult<usize> {
        let _io = self.io.lock();
        self.write_rows(records)
    }

    /// Like [`save_all`](Self::save_all), but takes the records from
    /// `collect` only once the file lock is held.
    ///
    /// Concurrent callers therefore persist in lock order, and the last one
    /// to write also observed the newest state.
    pub(crate) fn save_with<F>(&self, collect: F) -> CoreResult<usize>
    where
        F: FnOnce() -> Vec<Company>,
    {
        let _io = self.io.lock();
        let records = collect();
        self.write_rows(&records)
    }

    fn write_rows(&self, records: &[Company]) -> CoreResult<usize> {
        let rows: Vec<Row> = records
            .iter()
            .filter(|c| !c.removed)
            .map(company_to_row)
            .collect();
        self.backend.rewrite(&rows)?;
        Ok(rows.len())
    }
}

impl std::fmt::Debug for DurableLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableLog").finish_non_exhaustive()
    }
}

fn company_to_row(company: &Company) -> Row {
    vec![
        company.name.clone(),
        company.tax_id.clone(),
        company.phone.clone(),
        company.address.clone(),
        company.individual.clone(),
    ]
}

fn row_to_company(index: usize, row: Row) -> CoreResult<Company> {
    let found = row.len();
    let Ok([name, tax_id, phone, address, individual]) = <[String; FIELD_COUNT]>::try_from(row)
    else {
        return Err(CoreError::CorruptRow {
            row: index,
            expected: FIELD_COUNT,
            found,
        });
    };

    Ok(Company::new(name, tax_id, phone, address, individual))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn sample(n: usize) -> Vec<Company> {
        (0..n)
            .map(|i| {
                Company::new(
                    format!("company-{i}"),
                    format!("77{i:04}"),
                    format!("+7 900 {i:03}"),
                    format!("{i} Main St, Suite \"A\""),
                    if i % 2 == 0 { "true" } else { "false" },
                )
            })
            .collect()
    }

    #[test]
    fn save_then_load_round_trips_in_order() {
        let dir = tempdir().unwrap();
        let log = DurableLog::open_file(&dir.path().join("companies.csv")).unwrap();

        let records = sample(25);
        assert_eq!(log.save_all(&records).unwrap(), 25);

        let loaded = log.load_all().unwrap();
        assert_eq!(loaded, records);
    }

    #[test]
    fn save_skips_tombstones() {
        let log = DurableLog::in_memory();
        let mut records = sample(3);
        records[1].removed = true;

        assert_eq!(log.save_all(&records).unwrap(), 2);

        let names: Vec<_> = log
            .load_all()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["company-0", "company-2"]);
    }

    #[test]
    fn loaded_records_are_live() {
        let backend = InMemoryBackend::with_rows(vec![vec![
            "acme".into(),
            "7701".into(),
            "555".into(),
            "Main".into(),
            "false".into(),
        ]]);
        let log = DurableLog::new(backend);

        let loaded = log.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(!loaded[0].removed);
        assert_eq!(loaded[0].tax_id, "7701");
    }

    #[test]
    fn short_row_is_corrupt() {
        let backend = InMemoryBackend::with_rows(vec![vec!["acme".into(), "7701".into()]]);
        let log = DurableLog::new(backend);

        let err = log.load_all().unwrap_err();
        assert!(matches!(
            err,
            CoreError::CorruptRow {
                row: 0,
                expected: 5,
                found: 2
            }
        ));
    }

    #[test]
    fn save_failure_is_reported() {
        let backend = Arc::new(InMemoryBackend::new());
        let log = DurableLog::new(Arc::clone(&backend));
        backend.set_fail_writes(true);

        assert!(matches!(log.save_all(&sample(1)), Err(CoreError::Storage(_))));
    }

    #[test]
    fn save_overwrites_previous_contents() {
        let dir = tempdir().unwrap();
        let log = DurableLog::open_file(&dir.path().join("companies.csv")).unwrap();

        log.save_all(&sample(10)).unwrap();
        log.save_all(&sample(2)).unwrap();

        assert_eq!(log.load_all().unwrap(), sample(2));
    }
}
