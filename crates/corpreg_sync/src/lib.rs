//! # corpreg Sync
//!
//! Reconciler that mirrors the registry into a relational sink.
//!
//! This crate provides:
//! - Reconcile loop (idle → reconciling → idle)
//! - Snapshot diffing by record fingerprint
//! - Transactional sink application (SQLite, in-memory for tests)
//! - HTTP source transport
//!
//! ## Cycle
//!
//! 1. Fetch the active record list from the registry
//! 2. Diff it against the snapshot of what the sink last committed
//! 3. Apply inserts, updates, and one batched delete in a single transaction
//! 4. Replace the snapshot only if the transaction committed
//!
//! ## Key Invariants
//!
//! - Cycles never overlap
//! - A failed cycle leaves both the sink and the snapshot untouched
//! - A cycle with no upstream change produces an empty delta

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod diff;
mod engine;
mod error;
mod http;
mod sink;
mod sqlite;
mod transport;

pub use config::ReconcilerConfig;
pub use diff::Delta;
pub use engine::{CycleResult, ReconcileState, ReconcileStats, Reconciler};
pub use error::{SyncError, SyncResult};
pub use http::HttpTransport;
pub use sink::{ApplyOutcome, MemorySink, RecordSink};
pub use sqlite::SqliteSink;
pub use transport::{MockTransport, SourceTransport};
