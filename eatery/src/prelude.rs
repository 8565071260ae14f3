//! Convenient re-exports of commonly used types from eatery.
//!
//! ```ignore
//! use eatery::prelude::*;
//! ```

pub use eatery_core::{
    backend::{IndexSpec, StoreBackend, StoreBackendBuilder},
    collection::{Collection, TypedCollection},
    document::{Document, DocumentExt},
    error::{DocumentStoreError, DocumentStoreResult},
    geo::GeoPoint,
    page::{Page, PaginationParams},
    pipeline::{Accumulator, GroupKey, Pipeline},
    query::{Expr, Filter, Projection, Query, Sort, SortDirection},
    store::DocumentStore,
};

pub use crate::{
    error::{ApiError, ApiResult},
    models::{restaurant::Restaurant, review::Review},
    response::Envelope,
    state::AppState,
};
