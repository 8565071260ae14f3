//! Collection types for document store operations.
//!
//! - [`Collection`] - Untyped collection working with raw BSON documents
//! - [`TypedCollection`] - Type-safe collection for a specific document type
//!
//! # Example
//!
//! ```ignore
//! let restaurants = store.typed_collection::<Restaurant>();
//! restaurants.insert(vec![restaurant]).await?;
//! let found = restaurants.get_one(id).await?;
//! ```

use bson::{Bson, Document as BsonDocument};
use std::marker::PhantomData;
use uuid::Uuid;

use crate::{
    backend::{IndexSpec, StoreBackend},
    document::{Document, DocumentExt},
    error::DocumentStoreResult,
    pipeline::Pipeline,
    query::{Expr, Query},
};

/// An untyped collection bound to a storage backend.
///
/// Used for projected queries and aggregations, whose rows do not have the
/// shape of a full document.
#[derive(Debug)]
pub struct Collection<'a> {
    name: String,
    backend: &'a dyn StoreBackend,
}

impl<'a> Collection<'a> {
    pub(crate) fn new(name: String, backend: &'a dyn StoreBackend) -> Self {
        Self { name, backend }
    }

    /// Queries the collection, returning raw BSON rows.
    pub async fn query(&self, query: Query) -> DocumentStoreResult<Vec<Bson>> {
        self.backend.query_documents(query, &self.name).await
    }

    /// Counts documents matching an optional filter.
    pub async fn count(&self, filter: Option<Expr>) -> DocumentStoreResult<usize> {
        self.backend.count_documents(filter, &self.name).await
    }

    /// Runs an aggregation pipeline over the collection.
    pub async fn aggregate(&self, pipeline: Pipeline) -> DocumentStoreResult<Vec<BsonDocument>> {
        self.backend.aggregate(pipeline, &self.name).await
    }

    /// Creates an index on the collection.
    pub async fn add_index(&self, index: IndexSpec) -> DocumentStoreResult<()> {
        self.backend.add_index(&self.name, index).await
    }
}

/// A type-safe collection for documents of type `D`.
#[derive(Debug)]
pub struct TypedCollection<'a, D: Document> {
    name: String,
    backend: &'a dyn StoreBackend,
    _marker: PhantomData<D>,
}

impl<'a, D: Document> TypedCollection<'a, D> {
    pub(crate) fn new(name: String, backend: &'a dyn StoreBackend) -> Self {
        Self { name, backend, _marker: PhantomData }
    }

    /// Drops the type information, for projected queries and aggregations.
    pub fn untyped(&self) -> Collection<'a> {
        Collection::new(self.name.clone(), self.backend)
    }

    /// Inserts new documents into the collection.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if serialization or insertion fails.
    pub async fn insert(&self, documents: Vec<D>) -> DocumentStoreResult<()> {
        self.backend
            .insert_documents(
                documents
                    .into_iter()
                    .map(|d| d.to_bson().map(|b| (d.id(), b)))
                    .collect::<Result<Vec<(Uuid, Bson)>, _>>()?,
                &self.name,
            )
            .await
    }

    /// Atomically applies a partial update and returns the updated document,
    /// or `None` when the id does not exist.
    pub async fn find_and_update(
        &self,
        id: Uuid,
        changes: BsonDocument,
    ) -> DocumentStoreResult<Option<D>> {
        self.backend
            .find_and_update(id, changes, &self.name)
            .await?
            .map(D::from_bson)
            .transpose()
    }

    /// Deletes documents from the collection by their IDs.
    pub async fn delete(&self, ids: Vec<Uuid>) -> DocumentStoreResult<()> {
        self.backend.delete_documents(ids, &self.name).await
    }

    /// Retrieves documents by their IDs. Missing ids are omitted.
    pub async fn get(&self, ids: Vec<Uuid>) -> DocumentStoreResult<Vec<D>> {
        self.backend
            .get_documents(ids, &self.name)
            .await?
            .into_iter()
            .map(D::from_bson)
            .collect()
    }

    /// Retrieves a single document by id.
    pub async fn get_one(&self, id: Uuid) -> DocumentStoreResult<Option<D>> {
        Ok(self.get(vec![id]).await?.into_iter().next())
    }

    /// Queries documents in the collection.
    ///
    /// The query must not project away fields `D` requires.
    pub async fn query(&self, query: Query) -> DocumentStoreResult<Vec<D>> {
        self.backend
            .query_documents(query, &self.name)
            .await?
            .into_iter()
            .map(D::from_bson)
            .collect()
    }

    /// Counts documents matching an optional filter.
    pub async fn count(&self, filter: Option<Expr>) -> DocumentStoreResult<usize> {
        self.backend.count_documents(filter, &self.name).await
    }
}
