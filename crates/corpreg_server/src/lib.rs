//! # corpreg Server
//!
//! HTTP registry service for corpreg.
//!
//! This crate provides:
//! - HTTP endpoints (list, add, delete) over an [`IndexedStore`]
//! - The periodic compaction loop
//! - Error-to-status mapping
//!
//! # Endpoints
//!
//! | Method | Path      | Body                                   | Effect                    |
//! |--------|-----------|----------------------------------------|---------------------------|
//! | GET    | `/`       |                                        | JSON array of live records |
//! | POST   | `/add`    | JSON `{name, inn, phone, address, individual}` | upsert by `name`  |
//! | POST   | `/delete` | form field `id` (name or inn)          | tombstone                 |
//!
//! # Example
//!
//! ```rust,ignore
//! use corpreg_server::{RegistryServer, ServerConfig};
//!
//! let server = RegistryServer::open(ServerConfig::default())?;
//! server.run(shutdown_signal()).await?;
//! ```
//!
//! [`IndexedStore`]: corpreg_core::IndexedStore

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod handler;
mod http;
mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::RegistryHandler;
pub use http::{router, DeleteForm};
pub use server::RegistryServer;
