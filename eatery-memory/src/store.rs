//! In-memory storage implementation for document stores.
//!
//! Documents are kept as BSON documents in HashMaps behind an async-safe
//! read-write lock.

use std::{collections::HashMap, sync::Arc};
use async_trait::async_trait;
use mea::rwlock::RwLock;
use bson::{Bson, Document};
use uuid::Uuid;

use eatery_core::{
    backend::{IndexSpec, StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::Pipeline,
    query::{Expr, Projection, Query},
};

use crate::{
    aggregate::PipelineRunner,
    evaluator::{DocumentEvaluator, lookup, sort_documents},
};

type CollectionMap = HashMap<Uuid, Document>;
type StoreMap = HashMap<String, CollectionMap>;
/// collection_name -> key paths of each unique index
type UniqueIndexes = HashMap<String, Vec<Vec<String>>>;


/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be shared across async tasks. Clones share the same underlying data.
///
/// # Performance
///
/// Queries, geospatial predicates and pipelines scan every document of a
/// collection. Indexes only matter for their uniqueness constraint, which is
/// checked on insert. Use the MongoDB backend for real data.
///
/// # Example
///
/// ```ignore
/// use eatery_memory::InMemoryStore;
/// use eatery_core::backend::StoreBackend;
/// use bson::{Bson, doc};
/// use uuid::Uuid;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = InMemoryStore::new();
///
///     let id = Uuid::new_v4();
///     let doc = Bson::Document(doc! { "name": "Bills", "suburb": "Surry Hills" });
///     store.insert_documents(vec![(id, doc)], "restaurants").await?;
///
///     let docs = store.get_documents(vec![id], "restaurants").await?;
///     assert_eq!(docs.len(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection_name -> (document_id -> document)
    store: Arc<RwLock<StoreMap>>,
    unique_indexes: Arc<RwLock<UniqueIndexes>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
            unique_indexes: Arc::new(RwLock::new(UniqueIndexes::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// Snapshot of a collection's documents matching an optional filter.
    async fn matching(&self, filter: Option<&Expr>, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        let store = self.store.read().await;
        let Some(collection_map) = store.get(collection) else {
            return Ok(vec![]);
        };

        match filter {
            Some(filter) => DocumentEvaluator::filter_documents(collection_map.values(), filter),
            None => Ok(collection_map.values().cloned().collect()),
        }
    }
}

fn into_document(bson: Bson) -> DocumentStoreResult<Document> {
    match bson {
        Bson::Document(doc) => Ok(doc),
        other => Err(DocumentStoreError::InvalidDocument(format!(
            "expected a document, got {:?}",
            other.element_type()
        ))),
    }
}

/// Whether two documents agree on every path of a unique index. Missing
/// values compare equal to each other.
fn same_key(left: &Document, right: &Document, paths: &[String]) -> bool {
    paths.iter().all(|path| lookup(left, path) == lookup(right, path))
}

fn project(document: Document, projection: &Projection) -> Document {
    match projection {
        Projection::Include(fields) => include(document, &fields.iter().map(String::as_str).collect::<Vec<_>>()),
        Projection::Exclude(fields) => exclude(document, &fields.iter().map(String::as_str).collect::<Vec<_>>()),
    }
}

/// The remainders of the dotted `paths` that descend into `key`.
fn descend<'p>(paths: &[&'p str], key: &str) -> Vec<&'p str> {
    paths
        .iter()
        .copied()
        .filter_map(|path| path.strip_prefix(key)?.strip_prefix('.'))
        .collect()
}

/// Keeps the listed paths. Nested paths reach through embedded documents and
/// arrays of documents; scalars under a nested path are dropped.
fn include(document: Document, paths: &[&str]) -> Document {
    document
        .into_iter()
        .filter_map(|(key, value)| {
            if paths.contains(&key.as_str()) {
                return Some((key, value));
            }

            let nested = descend(paths, &key);
            if nested.is_empty() {
                return None;
            }

            match value {
                Bson::Document(inner) => Some((key, Bson::Document(include(inner, &nested)))),
                Bson::Array(items) => {
                    let items = items
                        .into_iter()
                        .filter_map(|item| match item {
                            Bson::Document(inner) => Some(Bson::Document(include(inner, &nested))),
                            _ => None,
                        })
                        .collect();
                    Some((key, Bson::Array(items)))
                }
                _ => None,
            }
        })
        .collect()
}

/// Drops the listed paths, leaving everything else untouched.
fn exclude(document: Document, paths: &[&str]) -> Document {
    document
        .into_iter()
        .filter_map(|(key, value)| {
            if paths.contains(&key.as_str()) {
                return None;
            }

            let nested = descend(paths, &key);
            if nested.is_empty() {
                return Some((key, value));
            }

            let value = match value {
                Bson::Document(inner) => Bson::Document(exclude(inner, &nested)),
                Bson::Array(items) => Bson::Array(
                    items
                        .into_iter()
                        .map(|item| match item {
                            Bson::Document(inner) => Bson::Document(exclude(inner, &nested)),
                            other => other,
                        })
                        .collect(),
                ),
                other => other,
            };
            Some((key, value))
        })
        .collect()
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        let unique = self
            .unique_indexes
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default();

        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.to_string())
            .or_default();

        for (id, doc) in documents {
            if collection_map.contains_key(&id) {
                return Err(DocumentStoreError::DocumentAlreadyExists(id.to_string(), collection.to_string()));
            }

            let doc = into_document(doc)?;
            if let Some(paths) = unique
                .iter()
                .find(|paths| collection_map.values().any(|existing| same_key(existing, &doc, paths)))
            {
                tracing::debug!(collection, ?paths, %id, "duplicate key");
                return Err(DocumentStoreError::DocumentAlreadyExists(id.to_string(), collection.to_string()));
            }

            collection_map.insert(id, doc);
        }

        Ok(())
    }

    async fn find_and_update(&self, id: Uuid, changes: Document, collection: &str) -> DocumentStoreResult<Option<Bson>> {
        let mut store = self.store.write().await;
        let Some(existing) = store.get_mut(collection).and_then(|col| col.get_mut(&id)) else {
            return Ok(None);
        };

        for (key, value) in changes {
            existing.insert(key, value);
        }

        Ok(Some(Bson::Document(existing.clone())))
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let not_found = |id: &Uuid| DocumentStoreError::DocumentNotFound(id.to_string(), collection.to_string());

        let Some(collection_map) = store.get_mut(collection) else {
            return match ids.first() {
                Some(id) => Err(not_found(id)),
                None => Ok(()),
            };
        };

        if let Some(id) = ids.iter().find(|id| !collection_map.contains_key(*id)) {
            return Err(not_found(id));
        }

        for id in &ids {
            collection_map.remove(id);
        }

        Ok(())
    }

    async fn get_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let store = self.store.read().await;
        let collection_map = match store.get(collection) {
            Some(col) => col,
            None => return Ok(vec![]),
        };

        Ok(ids
            .iter()
            .filter_map(|id| collection_map.get(id))
            .cloned()
            .map(Bson::Document)
            .collect())
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let mut documents = self.matching(query.filter.as_ref(), collection).await?;

        if !query.sort.is_empty() {
            sort_documents(&mut documents, &query.sort);
        }

        tracing::debug!(collection, matched = documents.len(), "in-memory query");

        Ok(documents
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|doc| match &query.projection {
                Some(projection) => project(doc, projection),
                None => doc,
            })
            .map(Bson::Document)
            .collect())
    }

    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<usize> {
        Ok(self.matching(filter.as_ref(), collection).await?.len())
    }

    async fn aggregate(&self, pipeline: Pipeline, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        let rows = self.matching(None, collection).await?;
        PipelineRunner::new(rows).run(&pipeline)
    }

    async fn add_index(&self, collection: &str, index: IndexSpec) -> DocumentStoreResult<()> {
        tracing::debug!(collection, ?index, "in-memory index");

        if index.unique {
            let paths: Vec<String> = index.keys.into_iter().map(|(field, _)| field).collect();
            let mut unique = self.unique_indexes.write().await;
            let known = unique.entry(collection.to_string()).or_default();

            if !known.contains(&paths) {
                known.push(paths);
            }
        }

        Ok(())
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance. Always succeeds.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use eatery_core::{
        backend::IndexKind,
        query::{Filter, SortDirection},
    };

    async fn seeded() -> (InMemoryStore, Vec<Uuid>) {
        let store = InMemoryStore::new();
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let docs = ids
            .iter()
            .zip(["Bondi", "Manly", "Bondi"])
            .zip([3.5, 4.5, 4.0])
            .map(|((id, suburb), rating)| {
                (*id, Bson::Document(doc! { "id": id.to_string(), "suburb": suburb, "ratingsAverage": rating }))
            })
            .collect();

        store.insert_documents(docs, "restaurants").await.unwrap();
        (store, ids)
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_ids() {
        let (store, ids) = seeded().await;
        let err = store
            .insert_documents(vec![(ids[0], Bson::Document(doc! {}))], "restaurants")
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentStoreError::DocumentAlreadyExists(_, _)));
    }

    #[tokio::test]
    async fn test_query_filters_sorts_and_projects() {
        let (store, _) = seeded().await;
        let rows = store
            .query_documents(
                Query::builder()
                    .filter(Filter::eq("suburb", "Bondi"))
                    .sort("ratingsAverage", SortDirection::Desc)
                    .project(Projection::Include(vec!["ratingsAverage".into()]))
                    .build(),
                "restaurants",
            )
            .await
            .unwrap();

        let ratings: Vec<f64> = rows
            .iter()
            .map(|r| r.as_document().unwrap().get_f64("ratingsAverage").unwrap())
            .collect();
        assert_eq!(ratings, vec![4.0, 3.5]);
        assert!(rows[0].as_document().unwrap().get("suburb").is_none());
    }

    #[tokio::test]
    async fn test_find_and_update_merges_fields() {
        let (store, ids) = seeded().await;

        let updated = store
            .find_and_update(ids[1], doc! { "ratingsAverage": 5.0 }, "restaurants")
            .await
            .unwrap()
            .unwrap();
        let updated = updated.as_document().unwrap();
        assert_eq!(updated.get_f64("ratingsAverage").unwrap(), 5.0);
        assert_eq!(updated.get_str("suburb").unwrap(), "Manly");

        let missing = store
            .find_and_update(Uuid::new_v4(), doc! { "x": 1 }, "restaurants")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_count_and_delete() {
        let (store, ids) = seeded().await;
        assert_eq!(store.count_documents(None, "restaurants").await.unwrap(), 3);

        store.delete_documents(vec![ids[0]], "restaurants").await.unwrap();
        assert_eq!(
            store.count_documents(Some(Filter::eq("suburb", "Bondi")), "restaurants").await.unwrap(),
            1
        );
        assert!(store.get_documents(vec![ids[0]], "restaurants").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_with_a_missing_id_deletes_nothing() {
        let (store, ids) = seeded().await;

        let err = store
            .delete_documents(vec![ids[1], Uuid::new_v4()], "restaurants")
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentStoreError::DocumentNotFound(_, _)));
        assert_eq!(store.count_documents(None, "restaurants").await.unwrap(), 3);

        let err = store.delete_documents(vec![ids[0]], "menus").await.unwrap_err();
        assert!(matches!(err, DocumentStoreError::DocumentNotFound(_, _)));
    }

    #[tokio::test]
    async fn test_unique_index_rejects_duplicate_keys() {
        let store = InMemoryStore::new();
        store
            .add_index(
                "reviews",
                IndexSpec::compound([("restaurant", IndexKind::Ascending), ("user", IndexKind::Ascending)]).unique(),
            )
            .await
            .unwrap();

        let review = |restaurant: &str, user: &str| {
            (Uuid::new_v4(), Bson::Document(doc! { "restaurant": restaurant, "user": user }))
        };

        store.insert_documents(vec![review("r1", "u1"), review("r1", "u2")], "reviews").await.unwrap();
        store.insert_documents(vec![review("r2", "u1")], "reviews").await.unwrap();

        let err = store.insert_documents(vec![review("r1", "u1")], "reviews").await.unwrap_err();
        assert!(matches!(err, DocumentStoreError::DocumentAlreadyExists(_, c) if c == "reviews"));
        assert_eq!(store.count_documents(None, "reviews").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_projection_follows_dotted_paths() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        let restaurant = doc! {
            "name": "Icebergs",
            "location": { "type": "Point", "coordinates": [151.2743, -33.8915] },
            "menus": [{ "title": "Lunch", "price": 80 }, { "title": "Dinner", "price": 150 }],
        };
        store.insert_documents(vec![(id, Bson::Document(restaurant))], "restaurants").await.unwrap();

        let projected = |projection: Projection| {
            let store = store.clone();
            async move {
                let rows = store
                    .query_documents(Query::builder().project(projection).build(), "restaurants")
                    .await
                    .unwrap();
                rows[0].as_document().unwrap().clone()
            }
        };

        let included = projected(Projection::Include(vec![
            "location.coordinates".into(),
            "menus.title".into(),
            "name.first".into(),
        ]))
        .await;
        assert_eq!(
            included,
            doc! {
                "location": { "coordinates": [151.2743, -33.8915] },
                "menus": [{ "title": "Lunch" }, { "title": "Dinner" }],
            }
        );

        let excluded = projected(Projection::Exclude(vec!["location.type".into(), "menus.price".into()])).await;
        assert_eq!(
            excluded,
            doc! {
                "name": "Icebergs",
                "location": { "coordinates": [151.2743, -33.8915] },
                "menus": [{ "title": "Lunch" }, { "title": "Dinner" }],
            }
        );
    }
}
