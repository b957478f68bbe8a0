//! Store configuration.

use crate::compaction::CompactionPolicy;
use std::time::Duration;

/// Shortest period accepted for background timers. Zero periods are raised
/// to this.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration for an [`IndexedStore`](crate::IndexedStore) and the
/// maintenance loop that drives it.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How often the compaction check runs.
    pub compaction_interval: Duration,
    /// When a compaction check actually rebuilds the sequence.
    pub compaction_policy: CompactionPolicy,
}

impl StoreConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            compaction_interval: Duration::from_secs(20 * 60),
            compaction_policy: CompactionPolicy::default(),
        }
    }

    /// Sets the compaction check interval, at least [`MIN_INTERVAL`].
    pub fn with_compaction_interval(mut self, interval: Duration) -> Self {
        self.compaction_interval = interval.max(MIN_INTERVAL);
        self
    }

    /// Sets the compaction policy.
    pub fn with_compaction_policy(mut self, policy: CompactionPolicy) -> Self {
        self.compaction_policy = policy;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new()
    }
}
