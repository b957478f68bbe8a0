//! The indexed registry store.

use crate::compaction::{rebuild_slots, CompactionPolicy, CompactionStats};
use crate::config::StoreConfig;
use crate::durable::DurableLog;
use crate::error::{CoreError, CoreResult};
use crate::record::Company;
use crate::stats::{StoreStats, StoreStatsSnapshot};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    /// A record with a new name was appended.
    Inserted,
    /// An existing record was overwritten in place.
    Updated,
}

/// Slot arena plus the two key indexes. Guarded as a unit.
#[derive(Debug, Default)]
struct StoreState {
    /// Every record ever inserted since the last compaction, in insertion
    /// order, including tombstones.
    slots: Vec<Company>,
    /// name -> slot, live records only.
    by_name: HashMap<String, usize>,
    /// tax id -> slot, live records only.
    by_tax_id: HashMap<String, usize>,
    /// Tombstoned slots in `slots`.
    tombstones: usize,
}

impl StoreState {
    fn apply_upsert(&mut self, candidate: Company) -> CoreResult<UpsertKind> {
        let tax_holder = self.by_tax_id.get(&candidate.tax_id).copied();

        match self.by_name.get(&candidate.name).copied() {
            Some(slot) => {
                if let Some(holder) = tax_holder.filter(|&holder| holder != slot) {
                    return Err(self.tax_conflict(candidate.tax_id, holder));
                }

                let record = &mut self.slots[slot];
                if record.tax_id != candidate.tax_id {
                    self.by_tax_id.remove(&record.tax_id);
                    self.by_tax_id.insert(candidate.tax_id.clone(), slot);
                }
                record.assign_fields(candidate);
                Ok(UpsertKind::Updated)
            }
            None => {
                if let Some(holder) = tax_holder {
                    return Err(self.tax_conflict(candidate.tax_id, holder));
                }

                let slot = self.slots.len();
                self.by_name.insert(candidate.name.clone(), slot);
                self.by_tax_id.insert(candidate.tax_id.clone(), slot);
                self.slots.push(Company {
                    removed: false,
                    ..candidate
                });
                Ok(UpsertKind::Inserted)
            }
        }
    }

    fn tax_conflict(&self, tax_id: String, holder: usize) -> CoreError {
        CoreError::TaxIdConflict {
            tax_id,
            holder: self.slots[holder].name.clone(),
        }
    }

    fn apply_remove(&mut self, key: &str) -> bool {
        let Some(slot) = self
            .by_name
            .get(key)
            .or_else(|| self.by_tax_id.get(key))
            .copied()
        else {
            return false;
        };

        let record = &mut self.slots[slot];
        record.removed = true;
        self.by_name.remove(&record.name);
        self.by_tax_id.remove(&record.tax_id);
        self.tombstones += 1;
        true
    }

    fn active(&self) -> Vec<Company> {
        self.slots.iter().filter(|c| !c.removed).cloned().collect()
    }

    fn compact(&mut self) -> CompactionStats {
        let slots_before = self.slots.len();
        let slots = std::mem::take(&mut self.slots);
        self.slots = rebuild_slots(slots, self.by_name.values().copied());

        self.by_name.clear();
        self.by_tax_id.clear();
        for (slot, record) in self.slots.iter().enumerate() {
            self.by_name.insert(record.name.clone(), slot);
            self.by_tax_id.insert(record.tax_id.clone(), slot);
        }

        let purged = self.tombstones;
        self.tombstones = 0;

        CompactionStats {
            slots_before,
            slots_after: self.slots.len(),
            tombstones_purged: purged,
        }
    }
}

/// The authoritative in-memory company registry.
///
/// Records live by value in one slot sequence; the `name` and `tax_id`
/// indexes hold slot positions. Removing a record flags its slot and drops
/// its index entries, leaving the slot in place until
/// [`maybe_compact`](Self::maybe_compact) rebuilds the sequence.
///
/// # Concurrency
///
/// One reader-writer lock guards the sequence and both indexes. Listing
/// takes the read lock; upsert, remove, and compaction take the write lock.
/// Write-through to the [`DurableLog`] happens after the write lock is
/// released and is serialized by the log's own lock.
///
/// # Example
///
/// ```rust
/// use corpreg_core::{Company, IndexedStore};
///
/// let store = IndexedStore::in_memory();
/// store.upsert(Company::new("acme", "7701", "555", "Main", "false")).unwrap();
/// assert!(store.remove("7701"));
/// assert!(store.list_active().is_empty());
/// ```
#[derive(Debug)]
pub struct IndexedStore {
    state: RwLock<StoreState>,
    log: DurableLog,
    policy: CompactionPolicy,
    stats: StoreStats,
}

impl IndexedStore {
    /// Opens a store seeded from the records in `log`.
    ///
    /// Duplicate names in the file collapse onto the first slot, later rows
    /// winning. Rows whose tax id is already held by a different name are
    /// dropped, logged at error level, and counted in
    /// [`StoreStatsSnapshot::bootstrap_skipped`].
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or holds a malformed row.
    pub fn open(log: DurableLog) -> CoreResult<Self> {
        Self::open_with_config(log, &StoreConfig::default())
    }

    /// Opens a store seeded from `log` with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open).
    pub fn open_with_config(log: DurableLog, config: &StoreConfig) -> CoreResult<Self> {
        let records = log.load_all()?;
        let loaded = records.len();

        let stats = StoreStats::new();
        let mut state = StoreState::default();
        for (row, record) in records.into_iter().enumerate() {
            let name = record.name.clone();
            if let Err(e) = state.apply_upsert(record) {
                // The next write-through rewrites the file without this row.
                stats.record_bootstrap_skip();
                error!(
                    row,
                    name = %name,
                    error = %e,
                    "dropping conflicting row during bootstrap"
                );
            }
        }

        info!(
            size = state.slots.len(),
            rows = loaded,
            skipped = stats.bootstrap_skipped(),
            "synced indices"
        );

        Ok(Self {
            state: RwLock::new(state),
            log,
            policy: config.compaction_policy,
            stats,
        })
    }

    /// Creates an empty store mirrored to memory only.
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            log: DurableLog::in_memory(),
            policy: CompactionPolicy::default(),
            stats: StoreStats::new(),
        }
    }

    /// Replaces the compaction policy.
    pub fn with_compaction_policy(mut self, policy: CompactionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns a copy of every live record, in sequence order.
    pub fn list_active(&self) -> Vec<Company> {
        self.state.read().active()
    }

    /// Looks up a live record by name or, failing that, by tax id.
    pub fn get(&self, key: &str) -> Option<Company> {
        let state = self.state.read();
        state
            .by_name
            .get(key)
            .or_else(|| state.by_tax_id.get(key))
            .map(|&slot| state.slots[slot].clone())
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.state.read().by_name.len()
    }

    /// Returns true if there are no live records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts or overwrites the record keyed by `candidate.name`, then
    /// writes the live set through to the log.
    ///
    /// A known name keeps its slot; its four other fields are replaced. A
    /// write-through failure is logged and counted but does **not** undo the
    /// in-memory change.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidRecord`] if the name is empty
    /// - [`CoreError::TaxIdConflict`] if the tax id belongs to a different
    ///   live record
    pub fn upsert(&self, candidate: Company) -> CoreResult<UpsertKind> {
        if let Err(e) = candidate.validate() {
            self.stats.record_rejected_upsert();
            return Err(e);
        }

        let name = candidate.name.clone();
        let outcome = self.state.write().apply_upsert(candidate);
        let kind = match outcome {
            Ok(kind) => kind,
            Err(e) => {
                self.stats.record_rejected_upsert();
                return Err(e);
            }
        };

        match kind {
            UpsertKind::Inserted => self.stats.record_insert(),
            UpsertKind::Updated => self.stats.record_update(),
        }
        debug!(name = %name, ?kind, "upserted company");

        self.write_through();
        Ok(kind)
    }

    /// Tombstones the live record whose name, or else tax id, equals `key`.
    ///
    /// Returns false if no live record matches. The log is not rewritten;
    /// the removal reaches the file with the next write-through.
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.state.write().apply_remove(key);
        if removed {
            self.stats.record_remove();
            debug!(key = %key, "tombstoned company");
        }
        removed
    }

    /// Rebuilds the slot sequence if the compaction policy says so.
    ///
    /// Returns `None` when there are no tombstones or the tombstone ratio is
    /// below the threshold.
    /// Survivors keep their relative order.
    pub fn maybe_compact(&self) -> Option<CompactionStats> {
        let mut state = self.state.write();
        if !self.policy.should_compact(state.tombstones, state.slots.len()) {
            return None;
        }

        let map_size = state.by_name.len();
        let stats = state.compact();
        drop(state);

        self.stats.record_compaction(stats.tombstones_purged);
        info!(
            array_size = stats.slots_before,
            map_size,
            purged = stats.tombstones_purged,
            "compacted company sequence"
        );
        Some(stats)
    }

    /// Rewrites the log with the current live set.
    ///
    /// # Errors
    ///
    /// Returns the storage error if the rewrite fails.
    pub fn persist(&self) -> CoreResult<usize> {
        self.log.save_with(|| self.list_active())
    }

    /// Returns a snapshot of store counters and gauges.
    pub fn stats(&self) -> StoreStatsSnapshot {
        let (active, slots, tombstones) = {
            let state = self.state.read();
            (state.by_name.len(), state.slots.len(), state.tombstones)
        };
        self.stats.snapshot(active, slots, tombstones)
    }

    fn write_through(&self) {
        match self.persist() {
            Ok(rows) => {
                self.stats.record_write_through(true);
                debug!(rows, "flushed changes to file");
            }
            Err(e) => {
                self.stats.record_write_through(false);
                warn!(error = %e, "failed to flush changes to file");
            }
        }
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        let state = self.state.read();
        let live = state.slots.iter().filter(|c| !c.removed).count();
        assert_eq!(state.by_name.len(), live);
        assert_eq!(state.by_tax_id.len(), live);
        assert_eq!(state.slots.len() - live, state.tombstones);

        for (slot, record) in state.slots.iter().enumerate() {
            if record.removed {
                assert_ne!(state.by_name.get(&record.name), Some(&slot));
                assert_ne!(state.by_tax_id.get(&record.tax_id), Some(&slot));
            } else {
                assert_eq!(state.by_name.get(&record.name), Some(&slot));
                assert_eq!(state.by_tax_id.get(&record.tax_id), Some(&slot));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpreg_storage::InMemoryBackend;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn company(name: &str, tax_id: &str) -> Company {
        Company::new(name, tax_id, "555-0100", "1 Main St", "false")
    }

    fn names(records: &[Company]) -> Vec<String> {
        records.iter().map(|c| c.name.clone()).collect()
    }

    #[test]
    fn upsert_inserts_then_updates_in_place() {
        let store = IndexedStore::in_memory();

        assert_eq!(store.upsert(company("acme", "1")).unwrap(), UpsertKind::Inserted);
        assert_eq!(store.upsert(company("globex", "2")).unwrap(), UpsertKind::Inserted);

        let mut changed = company("acme", "1");
        changed.phone = "555-0199".into();
        assert_eq!(store.upsert(changed).unwrap(), UpsertKind::Updated);

        let active = store.list_active();
        assert_eq!(names(&active), ["acme", "globex"]);
        assert_eq!(active[0].phone, "555-0199");
        assert_eq!(store.stats().slots, 2);
        store.check_invariants();
    }

    #[test]
    fn upsert_rekeys_changed_tax_id() {
        let store = IndexedStore::in_memory();
        store.upsert(company("acme", "1")).unwrap();
        store.upsert(company("acme", "9")).unwrap();

        assert!(store.get("1").is_none());
        assert_eq!(store.get("9").unwrap().name, "acme");
        store.check_invariants();
    }

    #[test]
    fn upsert_rejects_foreign_tax_id() {
        let store = IndexedStore::in_memory();
        store.upsert(company("acme", "1")).unwrap();
        store.upsert(company("globex", "2")).unwrap();

        let err = store.upsert(company("initech", "1")).unwrap_err();
        assert!(matches!(err, CoreError::TaxIdConflict { ref holder, .. } if holder == "acme"));

        let err = store.upsert(company("globex", "1")).unwrap_err();
        assert!(matches!(err, CoreError::TaxIdConflict { .. }));

        assert_eq!(store.get("2").unwrap().name, "globex");
        assert_eq!(store.stats().rejected_upserts, 2);
        store.check_invariants();
    }

    #[test]
    fn upsert_rejects_empty_name() {
        let store = IndexedStore::in_memory();
        assert!(matches!(
            store.upsert(company("", "1")),
            Err(CoreError::InvalidRecord(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn upsert_ignores_incoming_tombstone_flag() {
        let store = IndexedStore::in_memory();
        let mut candidate = company("acme", "1");
        candidate.removed = true;
        store.upsert(candidate).unwrap();

        assert_eq!(store.list_active().len(), 1);
        store.check_invariants();
    }

    #[test]
    fn remove_by_name_or_tax_id() {
        let store = IndexedStore::in_memory();
        store.upsert(company("acme", "1")).unwrap();
        store.upsert(company("globex", "2")).unwrap();

        assert!(store.remove("acme"));
        assert!(store.remove("2"));
        assert!(!store.remove("acme"));
        assert!(!store.remove("unknown"));

        assert!(store.list_active().is_empty());
        let stats = store.stats();
        assert_eq!(stats.slots, 2);
        assert_eq!(stats.tombstones, 2);
        store.check_invariants();
    }

    #[test]
    fn remove_frees_both_keys_for_reuse() {
        let store = IndexedStore::in_memory();
        store.upsert(company("acme", "1")).unwrap();
        store.remove("acme");

        store.upsert(company("globex", "1")).unwrap();
        store.upsert(company("acme", "2")).unwrap();

        assert_eq!(names(&store.list_active()), ["globex", "acme"]);
        assert_eq!(store.stats().slots, 3);
        store.check_invariants();
    }

    #[test]
    fn remove_does_not_write_through() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = IndexedStore::open(DurableLog::new(Arc::clone(&backend))).unwrap();
        store.upsert(company("acme", "1")).unwrap();
        let writes = backend.rewrite_count();

        store.remove("acme");
        assert_eq!(backend.rewrite_count(), writes);
        assert_eq!(backend.rows().len(), 1);

        store.upsert(company("globex", "2")).unwrap();
        assert_eq!(backend.rows().len(), 1);
        assert_eq!(backend.rows()[0][0], "globex");
    }

    #[test]
    fn compaction_triggers_at_half() {
        let store = IndexedStore::in_memory();
        for i in 0..10 {
            store
                .upsert(company(&format!("c{i}"), &i.to_string()))
                .unwrap();
        }
        for i in 0..4 {
            store.remove(&format!("c{i}"));
        }
        assert!(store.maybe_compact().is_none());
        assert_eq!(store.stats().slots, 10);

        store.remove("c4");
        let stats = store.maybe_compact().unwrap();
        assert_eq!(stats.slots_before, 10);
        assert_eq!(stats.slots_after, 5);
        assert_eq!(stats.tombstones_purged, 5);

        let after = store.stats();
        assert_eq!(after.slots, 5);
        assert_eq!(after.tombstones, 0);
        assert_eq!(after.compactions, 1);
        store.check_invariants();
    }

    #[test]
    fn compaction_skips_store_without_tombstones() {
        let store = IndexedStore::in_memory();
        assert!(store.maybe_compact().is_none());

        store.upsert(company("a", "1")).unwrap();
        assert!(store.maybe_compact().is_none());

        store.remove("a");
        assert!(store.maybe_compact().is_some());
        assert!(store.maybe_compact().is_none());
        assert_eq!(store.stats().compactions, 1);
    }

    #[test]
    fn compaction_preserves_active_set() {
        let store = IndexedStore::in_memory();
        for i in 0..8 {
            store
                .upsert(company(&format!("c{i}"), &format!("t{i}")))
                .unwrap();
        }
        for i in [1, 3, 5, 6] {
            store.remove(&format!("t{i}"));
        }

        let before: HashSet<_> = names(&store.list_active()).into_iter().collect();
        store.maybe_compact().unwrap();
        let after: HashSet<_> = names(&store.list_active()).into_iter().collect();

        assert_eq!(before, after);
        for name in &after {
            assert_eq!(store.get(name).unwrap().name, *name);
        }
        store.check_invariants();
    }

    #[test]
    fn compaction_then_upsert_uses_new_slots() {
        let store = IndexedStore::in_memory();
        store.upsert(company("a", "1")).unwrap();
        store.upsert(company("b", "2")).unwrap();
        store.remove("a");
        store.maybe_compact().unwrap();

        store.upsert(company("c", "3")).unwrap();
        let mut changed = company("b", "2");
        changed.address = "2 Side St".into();
        store.upsert(changed).unwrap();

        assert_eq!(names(&store.list_active()), ["b", "c"]);
        assert_eq!(store.get("b").unwrap().address, "2 Side St");
        store.check_invariants();
    }

    #[test]
    fn never_policy_skips_compaction() {
        let store =
            IndexedStore::in_memory().with_compaction_policy(CompactionPolicy::Never);
        store.upsert(company("a", "1")).unwrap();
        store.remove("a");
        assert!(store.maybe_compact().is_none());
    }

    #[test]
    fn open_seeds_from_log() {
        let backend = InMemoryBackend::with_rows(vec![
            vec!["acme".into(), "1".into(), "p".into(), "a".into(), "false".into()],
            vec!["globex".into(), "2".into(), "p".into(), "a".into(), "true".into()],
        ]);
        let store = IndexedStore::open(DurableLog::new(backend)).unwrap();

        assert_eq!(names(&store.list_active()), ["acme", "globex"]);
        assert_eq!(store.get("2").unwrap().individual, "true");
        store.check_invariants();
    }

    #[test]
    fn open_with_config_applies_policy() {
        let config = StoreConfig::new().with_compaction_policy(CompactionPolicy::Never);
        let store = IndexedStore::open_with_config(DurableLog::in_memory(), &config).unwrap();
        store.upsert(company("a", "1")).unwrap();
        store.remove("a");
        assert!(store.maybe_compact().is_none());
    }

    #[test]
    fn open_collapses_duplicate_rows() {
        let backend = InMemoryBackend::with_rows(vec![
            vec!["acme".into(), "1".into(), "old".into(), "a".into(), "false".into()],
            vec!["globex".into(), "1".into(), "p".into(), "a".into(), "false".into()],
            vec!["acme".into(), "1".into(), "new".into(), "a".into(), "false".into()],
        ]);
        let store = IndexedStore::open(DurableLog::new(backend)).unwrap();

        assert_eq!(names(&store.list_active()), ["acme"]);
        assert_eq!(store.get("acme").unwrap().phone, "new");
        assert_eq!(store.stats().bootstrap_skipped, 1);
        store.check_invariants();
    }

    #[test]
    fn open_counts_rows_sharing_an_empty_tax_id() {
        let backend = InMemoryBackend::with_rows(vec![
            vec!["acme".into(), "".into(), "p".into(), "a".into(), "false".into()],
            vec!["globex".into(), "".into(), "p".into(), "a".into(), "false".into()],
            vec!["initech".into(), "".into(), "p".into(), "a".into(), "false".into()],
        ]);
        let store = IndexedStore::open(DurableLog::new(backend)).unwrap();

        assert_eq!(names(&store.list_active()), ["acme"]);
        let stats = store.stats();
        assert_eq!(stats.bootstrap_skipped, 2);
        assert_eq!(stats.inserts, 0);
    }

    #[test]
    fn write_through_failure_keeps_memory() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = IndexedStore::open(DurableLog::new(Arc::clone(&backend))).unwrap();
        store.upsert(company("acme", "1")).unwrap();

        backend.set_fail_writes(true);
        assert_eq!(store.upsert(company("globex", "2")).unwrap(), UpsertKind::Inserted);

        assert_eq!(store.len(), 2);
        assert_eq!(backend.rows().len(), 1);
        let stats = store.stats();
        assert_eq!(stats.write_throughs, 1);
        assert_eq!(stats.write_through_failures, 1);

        backend.set_fail_writes(false);
        store.upsert(company("initech", "3")).unwrap();
        assert_eq!(backend.rows().len(), 3);
    }

    #[test]
    fn concurrent_writers_and_readers() {
        let store = Arc::new(IndexedStore::in_memory());

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let name = format!("w{w}-{i}");
                        store.upsert(company(&name, &name)).unwrap();
                        if i % 3 == 0 {
                            store.remove(&name);
                        }
                        if i % 10 == 0 {
                            store.maybe_compact();
                        }
                    }
                })
            })
            .collect();

        let reader = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    assert!(store.list_active().iter().all(|c| !c.removed));
                }
            })
        };

        for handle in writers {
            handle.join().unwrap();
        }
        reader.join().unwrap();

        // 17 of every 50 names per writer were removed (i % 3 == 0)
        assert_eq!(store.len(), 4 * 33);
        store.check_invariants();
    }
}
