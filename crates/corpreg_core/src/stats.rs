//! Store statistics.
//!
//! Counters are atomic and can be read while writers are active. Gauges
//! (live records, slots, tombstones) are sampled under the store's read lock
//! when a snapshot is taken.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic store counters.
#[derive(Debug, Default)]
pub struct StoreStats {
    inserts: AtomicU64,
    updates: AtomicU64,
    removes: AtomicU64,
    rejected_upserts: AtomicU64,
    compactions: AtomicU64,
    tombstones_purged: AtomicU64,
    write_throughs: AtomicU64,
    write_through_failures: AtomicU64,
    bootstrap_skipped: AtomicU64,
}

impl StoreStats {
    /// Creates a zeroed stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected_upsert(&self) {
        self.rejected_upserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_compaction(&self, purged: usize) {
        self.compactions.fetch_add(1, Ordering::Relaxed);
        self.tombstones_purged.fetch_add(purged as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_bootstrap_skip(&self) {
        self.bootstrap_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_write_through(&self, ok: bool) {
        if ok {
            self.write_throughs.fetch_add(1, Ordering::Relaxed);
        } else {
            self.write_through_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Returns the number of upserts that created a record.
    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    /// Returns the number of upserts that overwrote a record.
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    /// Returns the number of records tombstoned.
    pub fn removes(&self) -> u64 {
        self.removes.load(Ordering::Relaxed)
    }

    /// Returns the number of upserts refused by validation or key conflicts.
    pub fn rejected_upserts(&self) -> u64 {
        self.rejected_upserts.load(Ordering::Relaxed)
    }

    /// Returns the number of compactions that rebuilt the sequence.
    pub fn compactions(&self) -> u64 {
        self.compactions.load(Ordering::Relaxed)
    }

    /// Returns the total tombstones dropped by compaction.
    pub fn tombstones_purged(&self) -> u64 {
        self.tombstones_purged.load(Ordering::Relaxed)
    }

    /// Returns the number of successful write-throughs.
    pub fn write_throughs(&self) -> u64 {
        self.write_throughs.load(Ordering::Relaxed)
    }

    /// Returns the number of failed write-throughs.
    ///
    /// Each failure opens a window where memory and file disagree until the
    /// next successful write-through.
    pub fn write_through_failures(&self) -> u64 {
        self.write_through_failures.load(Ordering::Relaxed)
    }

    /// Returns the number of file rows dropped at bootstrap because their
    /// tax id was already held by another name.
    pub fn bootstrap_skipped(&self) -> u64 {
        self.bootstrap_skipped.load(Ordering::Relaxed)
    }
}

/// Point-in-time view of store counters and gauges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStatsSnapshot {
    /// Live records.
    pub active: usize,
    /// Slots in the sequence, live or tombstoned.
    pub slots: usize,
    /// Tombstoned slots awaiting compaction.
    pub tombstones: usize,
    /// Upserts that created a record.
    pub inserts: u64,
    /// Upserts that overwrote a record.
    pub updates: u64,
    /// Records tombstoned.
    pub removes: u64,
    /// Upserts refused.
    pub rejected_upserts: u64,
    /// Compactions performed.
    pub compactions: u64,
    /// Tombstones dropped by compaction.
    pub tombstones_purged: u64,
    /// Successful write-throughs.
    pub write_throughs: u64,
    /// Failed write-throughs.
    pub write_through_failures: u64,
    /// File rows dropped at bootstrap.
    pub bootstrap_skipped: u64,
}

impl StoreStats {
    pub(crate) fn snapshot(
        &self,
        active: usize,
        slots: usize,
        tombstones: usize,
    ) -> StoreStatsSnapshot {
        StoreStatsSnapshot {
            active,
            slots,
            tombstones,
            inserts: self.inserts(),
            updates: self.updates(),
            removes: self.removes(),
            rejected_upserts: self.rejected_upserts(),
            compactions: self.compactions(),
            tombstones_purged: self.tombstones_purged(),
            write_throughs: self.write_throughs(),
            write_through_failures: self.write_through_failures(),
            bootstrap_skipped: self.bootstrap_skipped(),
        }
    }
}
