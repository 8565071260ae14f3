//! A thin JSON document layer used by the eatery service.
//!
//! This crate provides:
//!
//! - **Document traits** ([`document`]) - Core traits for defining and serializing documents
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Query and filtering API** ([`query`]) - Type-safe query construction, including geospatial predicates
//! - **Aggregation pipelines** ([`pipeline`]) - Declarative stages executed natively by the backend
//! - **Collections interface** ([`collection`]) - High-level API for interacting with document collections
//! - **Document store** ([`store`]) - Shared handle over a backend
//! - **Geospatial primitives** ([`geo`]) - Points and spherical distances
//! - **Pagination** ([`page`]) - Page windows and navigation metadata
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use eatery_core::{document::Document, store::DocumentStore};
//! use uuid::Uuid;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct Dish {
//!     pub id: Uuid,
//!     pub name: String,
//! }
//!
//! impl Document for Dish {
//!     fn id(&self) -> Uuid {
//!         self.id
//!     }
//!
//!     fn collection_name() -> &'static str {
//!         "dishes"
//!     }
//! }
//! ```

pub mod backend;
pub mod collection;
pub mod document;
pub mod error;
pub mod geo;
pub mod page;
pub mod pipeline;
pub mod query;
pub mod store;
