//! Relational sink abstraction.

use crate::diff::Delta;
use crate::error::{SyncError, SyncResult};
use corpreg_core::Company;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;

/// Row counts reported by a committed apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Rows inserted.
    pub inserted: usize,
    /// Rows updated.
    pub updated: usize,
    /// Rows deleted.
    pub deleted: usize,
}

/// Downstream store the reconciler mirrors the registry into.
///
/// Implementations are synchronous; the reconciler calls them from a
/// blocking task.
pub trait RecordSink: Send + Sync {
    /// Reads every record currently in the sink.
    fn load_all(&self) -> SyncResult<Vec<Company>>;

    /// Applies `delta` atomically: inserts for `added`, updates keyed by
    /// name for `changed`, then one batched delete for `deleted`.
    ///
    /// On error nothing has been applied.
    fn apply(&self, delta: &Delta) -> SyncResult<ApplyOutcome>;
}

/// An in-memory sink for testing.
///
/// Behaves like a table with `name` as primary key. Every insert, update,
/// and the batched delete count as one statement; [`fail_on_statement`]
/// makes the n-th statement of the next applies fail, which discards the
/// whole apply.
///
/// [`fail_on_statement`]: MemorySink::fail_on_statement
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: RwLock<BTreeMap<String, Company>>,
    fail_at: Mutex<Option<usize>>,
    commits: Mutex<usize>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sink holding `rows`.
    pub fn with_rows(rows: impl IntoIterator<Item = Company>) -> Self {
        let sink = Self::new();
        sink.rows
            .write()
            .extend(rows.into_iter().map(|c| (c.name.clone(), c)));
        sink
    }

    /// Fails the `statement`-th (1-based) statement of every apply, or
    /// clears the failure with `None`.
    pub fn fail_on_statement(&self, statement: Option<usize>) {
        *self.fail_at.lock() = statement;
    }

    /// Current rows, ordered by name.
    pub fn rows(&self) -> Vec<Company> {
        self.rows.read().values().cloned().collect()
    }

    /// Number of committed applies.
    pub fn commit_count(&self) -> usize {
        *self.commits.lock()
    }
}

impl RecordSink for MemorySink {
    fn load_all(&self) -> SyncResult<Vec<Company>> {
        Ok(self.rows())
    }

    fn apply(&self, delta: &Delta) -> SyncResult<ApplyOutcome> {
        let fail_at = *self.fail_at.lock();
        let mut statement = 0usize;
        let mut step = || {
            statement += 1;
            if Some(statement) == fail_at {
                Err(SyncError::Sink(format!("injected failure at statement {statement}")))
            } else {
                Ok(())
            }
        };

        let mut rows = self.rows.write();
        let mut staged = rows.clone();
        let mut outcome = ApplyOutcome::default();

        for company in &delta.added {
            step()?;
            if staged.contains_key(&company.name) {
                return Err(SyncError::Sink(format!(
                    "duplicate primary key {:?}",
                    company.name
                )));
            }
            staged.insert(company.name.clone(), company.clone());
            outcome.inserted += 1;
        }

        for company in &delta.changed {
            step()?;
            if let Some(row) = staged.get_mut(&company.name) {
                *row = company.clone();
                outcome.updated += 1;
            }
        }

        if !delta.deleted.is_empty() {
            step()?;
            for name in &delta.deleted {
                if staged.remove(name).is_some() {
                    outcome.deleted += 1;
                }
            }
        }

        *rows = staged;
        *self.commits.lock() += 1;
        Ok(outcome)
    }
}
