//! # corpreg Storage
//!
//! Row backends for the corpreg flat-file mirror.
//!
//! This crate is the lowest layer of the registry. Backends store **rows of
//! string fields** and nothing else: they do not know what a company is, how
//! many fields a row should carry, or which rows are live. The core crate
//! owns all record interpretation.
//!
//! ## Design Principles
//!
//! - Backends read every row, or rewrite every row; there is no append
//! - A rewrite starts at offset zero and drops any stale tail
//! - A successful rewrite is durable (fsync) before it returns
//! - Each backend serializes its own I/O behind one lock
//!
//! ## Available Backends
//!
//! - [`CsvFileBackend`] - CSV file on disk
//! - [`InMemoryBackend`] - For testing, with write-failure injection
//!
//! ## Example
//!
//! ```rust
//! use corpreg_storage::{InMemoryBackend, RowBackend};
//!
//! let backend = InMemoryBackend::new();
//! backend.rewrite(&[vec!["acme".to_string(), "7701".to_string()]]).unwrap();
//! assert_eq!(backend.read_rows().unwrap().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::{Row, RowBackend};
pub use error::{StorageError, StorageResult};
pub use file::CsvFileBackend;
pub use memory::InMemoryBackend;
