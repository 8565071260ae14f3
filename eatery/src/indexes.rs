use eatery_core::{
    backend::{IndexKind, IndexSpec},
    document::Document,
    error::DocumentStoreResult,
    store::DocumentStore,
};

use crate::models::{restaurant::Restaurant, review::Review};

/// Creates the indexes the service relies on. Safe to run on every start.
///
/// Geo queries need a `2dsphere` index on `location`; the compound unique index
/// on reviews backs the one-review-per-user rule.
pub async fn ensure_indexes(store: &DocumentStore) -> DocumentStoreResult<()> {
    store
        .collection(Restaurant::collection_name())
        .add_index(IndexSpec::sphere_2d("location"))
        .await?;

    store
        .collection(Review::collection_name())
        .add_index(
            IndexSpec::compound([
                ("restaurant", IndexKind::Ascending),
                ("user", IndexKind::Ascending),
            ])
            .unique(),
        )
        .await?;

    tracing::info!("indexes ensured");

    Ok(())
}
