//! # corpreg Core
//!
//! Company records and the in-process registry store.
//!
//! This crate provides:
//! - [`Company`] and its content fingerprint
//! - [`IndexedStore`], the authoritative in-memory registry with two unique
//!   lookup indexes, tombstoning, and ratio-triggered compaction
//! - [`DurableLog`], the flat-file mirror the store writes through to
//!
//! ## Key Invariants
//!
//! - Every live record is reachable through exactly one `name` entry and one
//!   `tax_id` entry, both pointing at its slot
//! - Removed records are unindexed immediately and purged by compaction
//! - `name` and `tax_id` are unique among live records
//! - The store is the source of truth; the file is a best-effort mirror

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod compaction;
mod config;
mod durable;
mod error;
mod record;
mod stats;
mod store;

pub use compaction::{CompactionPolicy, CompactionStats};
pub use config::{StoreConfig, MIN_INTERVAL};
pub use durable::{DurableLog, FIELD_COUNT};
pub use error::{CoreError, CoreResult};
pub use record::Company;
pub use stats::{StoreStats, StoreStatsSnapshot};
pub use store::{IndexedStore, UpsertKind};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
