//! Reconcile engine state machine.

use crate::config::ReconcilerConfig;
use crate::diff::Delta;
use crate::error::{SyncError, SyncResult};
use crate::sink::{ApplyOutcome, RecordSink};
use crate::transport::SourceTransport;
use corpreg_core::{Company, MIN_INTERVAL};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// The current state of the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    /// Waiting for the next tick.
    Idle,
    /// A cycle is in progress.
    Reconciling,
}

/// Statistics about reconcile cycles.
#[derive(Debug, Clone, Default)]
pub struct ReconcileStats {
    /// Cycles that committed (or had nothing to commit).
    pub cycles_completed: u64,
    /// Cycles that failed.
    pub cycles_failed: u64,
    /// Rows inserted into the sink.
    pub rows_inserted: u64,
    /// Rows updated in the sink.
    pub rows_updated: u64,
    /// Rows deleted from the sink.
    pub rows_deleted: u64,
    /// Time of the last successful cycle.
    pub last_cycle_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Result of a successful cycle.
#[derive(Debug, Clone)]
pub struct CycleResult {
    /// Records fetched from the registry.
    pub fetched: usize,
    /// Records added.
    pub added: usize,
    /// Records changed.
    pub changed: usize,
    /// Records deleted.
    pub deleted: usize,
    /// Row counts reported by the sink.
    pub applied: ApplyOutcome,
    /// Duration of the cycle.
    pub duration: Duration,
}

impl CycleResult {
    /// Returns true if the cycle found nothing to change.
    pub fn is_noop(&self) -> bool {
        self.added + self.changed + self.deleted == 0
    }
}

/// Mirrors the registry into a [`RecordSink`].
///
/// Holds the snapshot of what the sink last committed and replaces it only
/// after a successful apply. Cycles never overlap: a second
/// [`reconcile`](Self::reconcile) while one is running fails with
/// [`SyncError::AlreadyRunning`].
pub struct Reconciler<T: SourceTransport, S: RecordSink + 'static> {
    config: ReconcilerConfig,
    transport: Arc<T>,
    sink: Arc<S>,
    snapshot: RwLock<HashMap<String, Company>>,
    state: RwLock<ReconcileState>,
    stats: RwLock<ReconcileStats>,
}

/// Returns the reconciler to `Idle` when a cycle ends, however it ends.
struct CycleGuard<'a> {
    state: &'a RwLock<ReconcileState>,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        *self.state.write() = ReconcileState::Idle;
    }
}

impl<T: SourceTransport, S: RecordSink + 'static> Reconciler<T, S> {
    /// Creates a reconciler with an empty snapshot.
    pub fn new(config: ReconcilerConfig, transport: T, sink: S) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
            sink: Arc::new(sink),
            snapshot: RwLock::new(HashMap::new()),
            state: RwLock::new(ReconcileState::Idle),
            stats: RwLock::new(ReconcileStats::default()),
        }
    }

    /// Gets the configuration.
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Gets the current state.
    pub fn state(&self) -> ReconcileState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> ReconcileStats {
        self.stats.read().clone()
    }

    /// Gets the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Gets the sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Number of records in the snapshot.
    pub fn snapshot_len(&self) -> usize {
        self.snapshot.read().len()
    }

    /// Copy of the snapshot record for `name`, if any.
    pub fn snapshot_get(&self, name: &str) -> Option<Company> {
        self.snapshot.read().get(name).cloned()
    }

    /// Replaces the snapshot with the sink's current rows.
    ///
    /// Run once at startup so the first cycle diffs against what the sink
    /// actually holds.
    ///
    /// # Errors
    ///
    /// Returns the sink error if the rows cannot be read.
    pub async fn seed_from_sink(&self) -> SyncResult<usize> {
        let sink = Arc::clone(&self.sink);
        let rows = tokio::task::spawn_blocking(move || sink.load_all())
            .await
            .map_err(|e| SyncError::Task(e.to_string()))??;

        let snapshot = index_by_name(rows);
        let size = snapshot.len();
        *self.snapshot.write() = snapshot;

        info!(size, "initialized snapshot from sink");
        Ok(size)
    }

    /// Runs one cycle: fetch, diff, apply, and on commit replace the
    /// snapshot.
    ///
    /// # Errors
    ///
    /// Returns the fetch or sink error; the snapshot is unchanged.
    pub async fn reconcile(&self) -> SyncResult<CycleResult> {
        let _guard = self.begin_cycle()?;

        match self.run_cycle().await {
            Ok(result) => {
                let mut stats = self.stats.write();
                stats.cycles_completed += 1;
                stats.rows_inserted += result.applied.inserted as u64;
                stats.rows_updated += result.applied.updated as u64;
                stats.rows_deleted += result.applied.deleted as u64;
                stats.last_cycle_time = Some(Instant::now());
                stats.last_error = None;
                Ok(result)
            }
            Err(e) => {
                let mut stats = self.stats.write();
                stats.cycles_failed += 1;
                stats.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Runs cycles on the poll interval until `shutdown` turns true or its
    /// sender is dropped.
    ///
    /// The first cycle starts immediately. A tick that comes due while a
    /// cycle is running is delayed, not queued, and shutdown is only
    /// observed between cycles.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval.max(MIN_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {
                    match self.reconcile().await {
                        Ok(result) => info!(
                            fetched = result.fetched,
                            took_ms = result.duration.as_millis() as u64,
                            "successfully updated database"
                        ),
                        Err(e) if e.is_retryable() => {
                            warn!(error = %e, "failed to update database")
                        }
                        Err(e) => error!(error = %e, "failed to update database"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        let stats = self.stats();
        info!(
            completed = stats.cycles_completed,
            failed = stats.cycles_failed,
            "reconciler stopped"
        );
    }

    fn begin_cycle(&self) -> SyncResult<CycleGuard<'_>> {
        let mut state = self.state.write();
        if *state == ReconcileState::Reconciling {
            return Err(SyncError::AlreadyRunning);
        }
        *state = ReconcileState::Reconciling;
        Ok(CycleGuard { state: &self.state })
    }

    async fn run_cycle(&self) -> SyncResult<CycleResult> {
        let start = Instant::now();
        let fetched = self.transport.fetch_active().await?;

        let (delta, actual) = {
            let snapshot = self.snapshot.read();
            (Delta::compute(&snapshot, &fetched), snapshot.len())
        };

        info!(
            actual,
            add = delta.added.len(),
            del = delta.deleted.len(),
            change = delta.changed.len(),
            "updating database"
        );
        for company in &delta.changed {
            debug!(name = %company.name, "change");
        }

        let mut result = CycleResult {
            fetched: fetched.len(),
            added: delta.added.len(),
            changed: delta.changed.len(),
            deleted: delta.deleted.len(),
            applied: ApplyOutcome::default(),
            duration: Duration::ZERO,
        };

        if !delta.is_empty() {
            let sink = Arc::clone(&self.sink);
            result.applied = tokio::task::spawn_blocking(move || sink.apply(&delta))
                .await
                .map_err(|e| SyncError::Task(e.to_string()))??;
        }

        *self.snapshot.write() = index_by_name(fetched);
        result.duration = start.elapsed();
        Ok(result)
    }
}

fn index_by_name(companies: Vec<Company>) -> HashMap<String, Company> {
    companies.into_iter().map(|c| (c.name.clone(), c)).collect()
}
