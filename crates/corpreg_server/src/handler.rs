//! Request handlers for registry endpoints.

use crate::error::{ServerError, ServerResult};
use corpreg_core::{Company, IndexedStore, UpsertKind};
use std::sync::Arc;

/// Handler for registry requests.
///
/// Decoding happens in the HTTP layer; this type only validates and
/// delegates to the store.
#[derive(Debug, Clone)]
pub struct RegistryHandler {
    store: Arc<IndexedStore>,
}

impl RegistryHandler {
    /// Creates a new request handler.
    pub fn new(store: Arc<IndexedStore>) -> Self {
        Self { store }
    }

    /// Returns the shared store.
    pub fn store(&self) -> &Arc<IndexedStore> {
        &self.store
    }

    /// Handles a list request.
    pub fn handle_list(&self) -> Vec<Company> {
        self.store.list_active()
    }

    /// Handles an add request.
    ///
    /// Blocks on the file write-through; call from a blocking context.
    pub fn handle_add(&self, company: Company) -> ServerResult<UpsertKind> {
        Ok(self.store.upsert(company)?)
    }

    /// Handles a delete request. Returns whether a record was removed.
    pub fn handle_delete(&self, id: &str) -> ServerResult<bool> {
        if id.is_empty() {
            return Err(ServerError::InvalidRequest("empty id".into()));
        }
        Ok(self.store.remove(id))
    }
}
