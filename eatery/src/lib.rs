//! HTTP service for a restaurant directory.
//!
//! The service exposes CRUD endpoints over restaurants, geospatial radius and
//! proximity searches, suburb and cuisine statistics, and a nested reviews
//! resource. Handlers stay thin: they validate input at the boundary, build
//! declarative [`Query`](eatery_core::query::Query) and
//! [`Pipeline`](eatery_core::pipeline::Pipeline) values and hand them to a
//! [`DocumentStore`](eatery_core::store::DocumentStore), whose backend executes
//! them natively.
//!
//! # Quick Start
//!
//! ```ignore
//! use eatery::{prelude::*, memory::InMemoryStore, config::AppConfig, routes, state::AppState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::default();
//!     let store = DocumentStore::new(InMemoryStore::new());
//!     let app = routes::router(AppState::new(store, &config.auth)?);
//!
//!     let listener = tokio::net::TcpListener::bind(config.server.socket_addr()).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB backend (requires `mongodb` feature)

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod geo;
pub mod handlers;
pub mod indexes;
pub mod list_query;
pub mod models;
pub mod prelude;
pub mod response;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use eatery_core::{backend, collection, document, page, pipeline, query, store};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use eatery_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use eatery_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
