//! SQLite sink.

use crate::diff::Delta;
use crate::error::{SyncError, SyncResult};
use crate::sink::{ApplyOutcome, RecordSink};
use corpreg_core::Company;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::time::Duration;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS companies (
    name       TEXT PRIMARY KEY NOT NULL,
    inn        TEXT NOT NULL,
    phone      TEXT NOT NULL,
    address    TEXT NOT NULL,
    individual TEXT NOT NULL
)";

const SELECT_ALL: &str = "SELECT name, inn, phone, address, individual FROM companies";

const INSERT: &str =
    "INSERT INTO companies (name, inn, phone, address, individual) VALUES (?1, ?2, ?3, ?4, ?5)";

const UPDATE: &str =
    "UPDATE companies SET phone = ?1, address = ?2, individual = ?3, inn = ?4 WHERE name = ?5";

/// Deletes every name in a JSON array parameter, as one statement.
const DELETE_MANY: &str = "DELETE FROM companies WHERE name IN (SELECT value FROM json_each(?1))";

/// A [`RecordSink`] over one SQLite connection.
///
/// The connection sits behind a mutex; each [`apply`](RecordSink::apply)
/// runs in its own transaction that commits only if every statement
/// succeeded.
#[derive(Debug)]
pub struct SqliteSink {
    conn: Mutex<Connection>,
}

impl SqliteSink {
    /// Opens (or creates) the database at `path` and ensures the
    /// `companies` table exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be created.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> SyncResult<Self> {
        Self::from_connection(Connection::open(path)?, busy_timeout)
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> SyncResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, Duration::ZERO)
    }

    fn from_connection(conn: Connection, busy_timeout: Duration) -> SyncResult<Self> {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Runs raw SQL outside any apply (schema tweaks, fixtures).
    ///
    /// # Errors
    ///
    /// Returns the database error, if any.
    pub fn execute_batch(&self, sql: &str) -> SyncResult<()> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }

    /// Number of rows in the table.
    ///
    /// # Errors
    ///
    /// Returns the database error, if any.
    pub fn count(&self) -> SyncResult<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM companies", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

impl RecordSink for SqliteSink {
    fn load_all(&self) -> SyncResult<Vec<Company>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(SELECT_ALL)?;
        let rows = stmt.query_map([], |row| {
            Ok(Company::new(
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut companies = Vec::new();
        for row in rows {
            match row {
                Ok(company) => companies.push(company),
                Err(e) => tracing::warn!(error = %e, "skipping unreadable sink row"),
            }
        }
        Ok(companies)
    }

    fn apply(&self, delta: &Delta) -> SyncResult<ApplyOutcome> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut outcome = ApplyOutcome::default();

        {
            let mut insert = tx.prepare_cached(INSERT)?;
            for c in &delta.added {
                outcome.inserted +=
                    insert.execute(params![c.name, c.tax_id, c.phone, c.address, c.individual])?;
            }

            let mut update = tx.prepare_cached(UPDATE)?;
            for c in &delta.changed {
                outcome.updated +=
                    update.execute(params![c.phone, c.address, c.individual, c.tax_id, c.name])?;
            }

            if !delta.deleted.is_empty() {
                let names = serde_json::to_string(&delta.deleted)
                    .map_err(|e| SyncError::Sink(e.to_string()))?;
                outcome.deleted = tx.execute(DELETE_MANY, params![names])?;
            }
        }

        // Dropping an uncommitted transaction rolls it back, so every early
        // return above leaves the table untouched.
        tx.commit()?;
        Ok(outcome)
    }
}
