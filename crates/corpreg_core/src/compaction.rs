//! Tombstone compaction.
//!
//! Removing a record only flags its slot, so the slot sequence grows with
//! every delete. Compaction rebuilds the sequence from the live slots once
//! enough of it is dead, which keeps deletes O(1) while bounding growth.
//!
//! ## Invariants
//!
//! - Compaction **MUST NOT** change the set of live records
//! - Only slots still referenced by the name index survive
//! - After compaction the tombstone counter is zero

use crate::record::Company;

/// Decides whether a compaction check rebuilds the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompactionPolicy {
    /// Compact when there is at least one tombstone and at least half of
    /// all slots are tombstones.
    #[default]
    HalfTombstoned,
    /// Never compact (tests and diagnostics).
    Never,
}

impl CompactionPolicy {
    /// Returns true if a sequence of `len` slots holding `tombstones` dead
    /// entries should be rebuilt.
    pub fn should_compact(self, tombstones: usize, len: usize) -> bool {
        match self {
            CompactionPolicy::HalfTombstoned => {
                tombstones > 0 && tombstones.saturating_mul(2) >= len
            }
            CompactionPolicy::Never => false,
        }
    }
}

/// Result of one compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionStats {
    /// Slots before the rebuild.
    pub slots_before: usize,
    /// Slots after the rebuild (the live record count).
    pub slots_after: usize,
    /// Tombstones dropped.
    pub tombstones_purged: usize,
}

/// Rebuilds `slots` keeping only the positions listed in `live`.
///
/// Survivors keep their relative order. Positions that are out of range or
/// listed twice are ignored.
pub(crate) fn rebuild_slots(
    slots: Vec<Company>,
    live: impl IntoIterator<Item = usize>,
) -> Vec<Company> {
    let mut live: Vec<usize> = live.into_iter().collect();
    live.sort_unstable();
    live.dedup();

    let mut slots: Vec<Option<Company>> = slots.into_iter().map(Some).collect();
    live.into_iter()
        .filter_map(|slot| slots.get_mut(slot).and_then(Option::take))
        .collect()
}
