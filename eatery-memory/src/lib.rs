//! In-memory document storage backend for eatery.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for development
//! and tests.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Query support** - Filtering (including spherical geo predicates), multi-key sorting,
//!   pagination and projection
//! - **Pipelines** - Executes the `$geoNear`, `$match`, `$unwind`, `$group`, `$sort` and
//!   `$project` stages by scanning the collection
//!
//! # Quick Start
//!
//! ```ignore
//! use eatery_core::store::DocumentStore;
//! use eatery_memory::InMemoryStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = DocumentStore::new(InMemoryStore::new());
//!     let restaurants = store.typed_collection::<Restaurant>();
//! }
//! ```

pub mod aggregate;
pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
