//! Source transport abstraction.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use corpreg_core::Company;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Fetches the registry's active record list.
///
/// This trait abstracts the network layer, allowing the reconciler to run
/// against HTTP or an in-process mock.
#[async_trait]
pub trait SourceTransport: Send + Sync {
    /// Fetches every active record.
    async fn fetch_active(&self) -> SyncResult<Vec<Company>>;
}

/// A mock transport for testing.
#[derive(Debug, Default)]
pub struct MockTransport {
    companies: RwLock<Vec<Company>>,
    failing: AtomicBool,
    fetches: AtomicU64,
}

impl MockTransport {
    /// Creates a mock returning an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock returning `companies`.
    pub fn with_companies(companies: Vec<Company>) -> Self {
        let mock = Self::new();
        mock.set_companies(companies);
        mock
    }

    /// Sets the list returned by the next fetches.
    pub fn set_companies(&self, companies: Vec<Company>) {
        *self.companies.write() = companies;
    }

    /// Makes every fetch fail with a retryable transport error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of fetches attempted.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceTransport for MockTransport {
    async fn fetch_active(&self) -> SyncResult<Vec<Company>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::transport_retryable("mock transport unavailable"));
        }
        Ok(self.companies.read().clone())
    }
}
