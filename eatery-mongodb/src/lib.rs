//! MongoDB backend implementation for eatery.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Filters, geospatial predicates and aggregation pipelines are translated into
//! native MongoDB documents and executed by the server; nothing is evaluated
//! client-side.
//!
//! # Features
//!
//! - **Persistent storage** - Data is persisted to MongoDB Atlas or self-hosted MongoDB
//! - **Native geo queries** - `$geoWithin`/`$centerSphere` filters and `$geoNear` stages
//!   backed by a `2dsphere` index
//! - **Aggregation** - `$match`, `$unwind`, `$group`, `$sort` and `$project` stages
//! - **Atomic updates** - partial updates through `findOneAndUpdate`
//!
//! # Example
//!
//! ```ignore
//! use eatery_core::backend::StoreBackendBuilder;
//! use eatery_mongodb::MongoDbStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoDbStore::builder("mongodb://localhost:27017", "eatery")
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod pipeline;
pub mod query;
pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
