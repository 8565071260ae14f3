//! Storage backend abstraction for the document store.
//!
//! This module defines the traits that abstract over storage implementations,
//! allowing the document store to run against MongoDB in production and an
//! in-memory map in development and tests.
//!
//! # Overview
//!
//! The [`StoreBackend`] trait provides a unified async interface for document
//! insertion, retrieval, atomic partial updates, deletion, querying, counting and
//! aggregation. Implementations are required to be thread-safe (`Send + Sync`)
//! and are used behind an `Arc<dyn StoreBackend>`.
//!
//! # Examples
//!
//! ```ignore
//! use eatery_core::backend::StoreBackend;
//! use bson::{Bson, doc};
//! use uuid::Uuid;
//!
//! let backend = MyBackendImpl::new();
//!
//! let id = Uuid::new_v4();
//! let doc = Bson::Document(doc! { "name": "Bills", "suburb": "Surry Hills" });
//! backend.insert_documents(vec![(id, doc)], "restaurants").await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Bson, Document};
use std::fmt::Debug;
use uuid::Uuid;

use crate::{
    error::DocumentStoreResult,
    pipeline::Pipeline,
    query::{Expr, Query},
};

/// Kind of a single index key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Ascending,
    /// Spherical geospatial index over GeoJSON points.
    Sphere2d,
}

/// Description of an index to create on a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    pub keys: Vec<(String, IndexKind)>,
    pub unique: bool,
}

impl IndexSpec {
    pub fn sphere_2d(field: impl Into<String>) -> Self {
        Self { keys: vec![(field.into(), IndexKind::Sphere2d)], unique: false }
    }

    pub fn compound<F: Into<String>>(keys: impl IntoIterator<Item = (F, IndexKind)>) -> Self {
        Self {
            keys: keys.into_iter().map(|(f, k)| (f.into(), k)).collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks.
///
/// # Error Handling
///
/// Operations return [`DocumentStoreResult<T>`](crate::error::DocumentStoreResult).
/// Backends report missing documents for id-addressed writes as
/// [`DocumentNotFound`](crate::error::DocumentStoreError::DocumentNotFound) and
/// wrap driver failures in [`Backend`](crate::error::DocumentStoreError::Backend).
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts new documents into a collection.
    ///
    /// The collection is created on first use. Inserting an id that is already
    /// present, or a document that repeats the key of a unique index, fails with
    /// `DocumentAlreadyExists`.
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Atomically merges `changes` into the document with the given id and
    /// returns the document as it is after the update.
    ///
    /// Returns `Ok(None)` when no document has this id.
    async fn find_and_update(
        &self,
        id: Uuid,
        changes: Document,
        collection: &str,
    ) -> DocumentStoreResult<Option<Bson>>;

    /// Deletes documents from a collection by their IDs.
    ///
    /// Fails with `DocumentNotFound`, deleting nothing, when any id is absent.
    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()>;

    /// Retrieves documents from a collection by their IDs.
    ///
    /// Ids that do not exist are omitted from the results.
    async fn get_documents(
        &self,
        ids: Vec<Uuid>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Queries documents in a collection using a structured query.
    ///
    /// Applies filter, sort keys, offset, limit and projection, in that order.
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Counts the documents matching an optional filter.
    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<usize>;

    /// Runs an aggregation pipeline over a collection and returns the produced rows.
    async fn aggregate(
        &self,
        pipeline: Pipeline,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Creates an index on a collection. Creating an existing index is a no-op.
    async fn add_index(&self, collection: &str, index: IndexSpec) -> DocumentStoreResult<()>;

    /// Releases connections held by the backend.
    ///
    /// The default implementation is a no-op.
    async fn shutdown(&self) -> DocumentStoreResult<()> {
        Ok(())
    }
}

/// Factory trait for asynchronously constructing backends.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    /// Builds the backend, establishing connections where needed.
    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
