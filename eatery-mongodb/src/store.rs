use async_trait::async_trait;
use futures::TryStreamExt;
use bson::{Bson, Document, doc};
use mongodb::{
    Client, Collection as MongoCollection, IndexModel,
    error::{ErrorKind, WriteFailure},
    options::{ClientOptions, FindOptions, IndexOptions, ReturnDocument},
};
use uuid::Uuid;
use eatery_core::{
    backend::{IndexKind, IndexSpec, StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::{Pipeline, PipelineVisitor},
    query::{Expr, Projection, Query, QueryVisitor},
};

use crate::{pipeline::{MongoPipelineTranslator, sort_document}, query::MongoQueryTranslator};


const DUPLICATE_KEY: i32 = 11000;

fn backend_error(err: mongodb::error::Error) -> DocumentStoreError {
    DocumentStoreError::Backend(err.to_string())
}

/// Position, within the inserted batch, of the document that hit a duplicate key.
fn duplicate_key_index(err: &mongodb::error::Error) -> Option<usize> {
    match err.kind.as_ref() {
        ErrorKind::InsertMany(failure) => failure
            .write_errors
            .iter()
            .flatten()
            .find(|write| write.code == DUPLICATE_KEY)
            .map(|write| write.index),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY => Some(0),
        _ => None,
    }
}

/// Maps a failed insert of `ids` onto the store error it represents.
fn insert_error(err: mongodb::error::Error, ids: &[Uuid], collection: &str) -> DocumentStoreError {
    match duplicate_key_index(&err) {
        Some(index) => DocumentStoreError::DocumentAlreadyExists(
            ids.get(index).map(Uuid::to_string).unwrap_or_default(),
            collection.to_string(),
        ),
        None => backend_error(err),
    }
}

/// The stored `_id` of a document: its UUID as BSON binary.
fn object_id(id: &Uuid) -> Bson {
    Bson::from(bson::Uuid::from_bytes(*id.as_bytes()))
}

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    fn prepare_document(&self, id: &Uuid, document: &Bson) -> DocumentStoreResult<Document> {
        let mut prepared = document
            .as_document()
            .cloned()
            .ok_or_else(|| DocumentStoreError::InvalidDocument("Expected document".into()))?;
        prepared.insert("_id", object_id(id));

        Ok(prepared)
    }

    fn restore_document(&self, mut document: Document) -> Bson {
        document.remove("_id");
        Bson::Document(document)
    }

    fn filter_document(filter: Option<&Expr>) -> DocumentStoreResult<Document> {
        Ok(match filter {
            Some(expr) => MongoQueryTranslator.visit_expr(expr)?,
            None => doc! {},
        })
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_documents(&self, documents: Vec<(Uuid, Bson)>, collection: &str) -> DocumentStoreResult<()> {
        let ids: Vec<Uuid> = documents.iter().map(|(id, _)| *id).collect();

        self.get_collection(collection)
            .insert_many(
                documents
                    .iter()
                    .map(|(id, doc)| self.prepare_document(id, doc))
                    .collect::<DocumentStoreResult<Vec<Document>>>()?,
            )
            .await
            .map_err(|err| insert_error(err, &ids, collection))?;

        Ok(())
    }

    async fn find_and_update(&self, id: Uuid, changes: Document, collection: &str) -> DocumentStoreResult<Option<Bson>> {
        Ok(self.get_collection(collection)
            .find_one_and_update(doc! { "_id": object_id(&id) }, doc! { "$set": changes })
            .return_document(ReturnDocument::After)
            .await
            .map_err(backend_error)?
            .map(|doc| self.restore_document(doc)))
    }

    async fn delete_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<()> {
        let wanted = doc! { "_id": { "$in": ids.iter().map(object_id).collect::<Vec<_>>() } };
        let handle = self.get_collection(collection);

        let present: Vec<Bson> = handle
            .find(wanted.clone())
            .projection(doc! { "_id": 1 })
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)?
            .into_iter()
            .filter_map(|mut doc| doc.remove("_id"))
            .collect();

        if let Some(missing) = ids.iter().find(|id| !present.contains(&object_id(id))) {
            return Err(DocumentStoreError::DocumentNotFound(missing.to_string(), collection.to_string()));
        }

        let deleted = handle.delete_many(wanted).await.map_err(backend_error)?;
        tracing::debug!(collection, deleted = deleted.deleted_count, "mongodb delete");

        Ok(())
    }

    async fn get_documents(&self, ids: Vec<Uuid>, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        Ok(
            self.get_collection(collection)
                .find(doc! { "_id": { "$in": ids.iter().map(object_id).collect::<Vec<_>>() } })
                .await
                .map_err(backend_error)?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(backend_error)?
                .into_iter()
                .map(|doc| self.restore_document(doc))
                .collect()
        )
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit as i64);
        }
        if let Some(skip) = query.offset {
            options.skip = Some(skip as u64);
        }
        if !query.sort.is_empty() {
            options.sort = Some(sort_document(&query.sort));
        }
        if let Some(projection) = &query.projection {
            options.projection = Some(match projection {
                Projection::Include(fields) => fields.iter().map(|f| (f.clone(), Bson::Int32(1))).collect(),
                Projection::Exclude(fields) => fields.iter().map(|f| (f.clone(), Bson::Int32(0))).collect(),
            });
        }

        let filter = Self::filter_document(query.filter.as_ref())?;
        tracing::debug!(collection, %filter, "mongodb find");

        Ok(
            self.get_collection(collection)
                .find(filter)
                .with_options(options)
                .await
                .map_err(backend_error)?
                .try_collect::<Vec<Document>>()
                .await
                .map_err(backend_error)?
                .into_iter()
                .map(|doc| self.restore_document(doc))
                .collect()
        )
    }

    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<usize> {
        let count = self.get_collection(collection)
            .count_documents(Self::filter_document(filter.as_ref())?)
            .await
            .map_err(backend_error)?;

        Ok(count as usize)
    }

    async fn aggregate(&self, pipeline: Pipeline, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        let stages = MongoPipelineTranslator.visit_pipeline(&pipeline)?;
        tracing::debug!(collection, stages = stages.len(), "mongodb aggregate");

        self.get_collection(collection)
            .aggregate(stages)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)
    }

    async fn add_index(&self, collection: &str, index: IndexSpec) -> DocumentStoreResult<()> {
        let keys = index
            .keys
            .iter()
            .map(|(field, kind)| {
                (
                    field.clone(),
                    match kind {
                        IndexKind::Ascending => Bson::Int32(1),
                        IndexKind::Sphere2d => Bson::String("2dsphere".to_string()),
                    },
                )
            })
            .collect::<Document>();

        self.get_collection(collection)
            .create_index(
                IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                    .unique(index.unique)
                    .build()
                )
                .build()
            )
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn shutdown(&self) -> DocumentStoreResult<()> {
        self.client.clone().shutdown().await;

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(MongoDbStore::new(
            Client::with_options(
                ClientOptions::parse(&self.dsn)
                    .await
                    .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            )
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
