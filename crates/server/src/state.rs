//! Application state shared across handlers.

use std::sync::Arc;

use crate::db::{AccountStore, DocumentStore};
use crate::services::{AccessGate, AccountService, ImageLifecycleManager, ProductCatalog};
use crate::storage::ObjectStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Stores are injected as trait
/// objects so tests can run the full router over in-memory fakes.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    documents: Arc<dyn DocumentStore>,
    catalog: ProductCatalog,
    accounts: AccountService,
}

impl AppState {
    /// Wire the services over the given stores.
    #[must_use]
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        documents: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        let access = AccessGate::new(Arc::clone(&accounts));
        let images = ImageLifecycleManager::new(objects);
        let catalog = ProductCatalog::new(access, images, Arc::clone(&documents));

        Self {
            inner: Arc::new(AppStateInner {
                documents,
                catalog,
                accounts: AccountService::new(accounts),
            }),
        }
    }

    /// Get a reference to the document store (used by readiness checks).
    #[must_use]
    pub fn documents(&self) -> &dyn DocumentStore {
        self.inner.documents.as_ref()
    }

    /// Get a reference to the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &ProductCatalog {
        &self.inner.catalog
    }

    /// Get a reference to the account service.
    #[must_use]
    pub fn accounts(&self) -> &AccountService {
        &self.inner.accounts
    }
}
