//! Main document store interface.
//!
//! [`DocumentStore`] owns a shared, dynamically dispatched backend and hands out
//! collection handles. It is cheap to clone and is meant to be shared across
//! request handlers.
//!
//! # Example
//!
//! ```ignore
//! use eatery_core::store::DocumentStore;
//!
//! let store = DocumentStore::new(backend);
//! let restaurants = store.typed_collection::<Restaurant>();
//! ```

use std::sync::Arc;

use crate::{
    backend::StoreBackend,
    collection::{Collection, TypedCollection},
    document::Document,
    error::DocumentStoreResult,
};

#[derive(Debug, Clone)]
pub struct DocumentStore {
    backend: Arc<dyn StoreBackend>,
}

impl DocumentStore {
    /// Creates a new document store over the given backend.
    pub fn new(backend: impl StoreBackend + 'static) -> Self {
        Self { backend: Arc::new(backend) }
    }

    /// Gets a typed collection for the document type.
    ///
    /// The collection name comes from [`Document::collection_name`].
    pub fn typed_collection<D: Document>(&self) -> TypedCollection<'_, D> {
        TypedCollection::new(D::collection_name().to_string(), self.backend.as_ref())
    }

    /// Gets an untyped collection by name.
    pub fn collection(&self, name: &str) -> Collection<'_> {
        Collection::new(name.to_string(), self.backend.as_ref())
    }

    /// Shuts down the backend.
    pub async fn shutdown(&self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await
    }
}
