//! Per-suburb and per-cuisine statistics.

use axum::extract::State;
use bson::Bson;

use eatery_core::{
    document::bson_into,
    pipeline::{Accumulator, GroupKey, Pipeline},
    query::Sort,
};

use crate::{
    error::ApiResult,
    models::restaurant::{CategoryStats, Restaurant},
    response::Envelope,
    state::AppState,
};

/// Groups restaurants by the upper-cased value of `field`, most restaurants first.
///
/// Array fields are unwound first, so a restaurant counts once per tag.
pub fn category_stats(field: &str, unwind: bool) -> Pipeline {
    let builder = Pipeline::builder();
    let builder = if unwind { builder.unwind(field) } else { builder };

    builder
        .group(
            GroupKey::upper(field),
            [
                ("numRestaurants", Accumulator::Count),
                ("numRatings", Accumulator::sum("ratingsQuantity")),
                ("avgRating", Accumulator::avg("ratingsAverage")),
            ],
        )
        .sort([
            Sort::desc("numRestaurants"),
            Sort::desc("numRatings"),
            Sort::desc("avgRating"),
        ])
        .build()
}

async fn run(state: &AppState, pipeline: Pipeline) -> ApiResult<Envelope<Vec<CategoryStats>>> {
    let stats = state
        .store
        .typed_collection::<Restaurant>()
        .untyped()
        .aggregate(pipeline)
        .await?
        .into_iter()
        .map(|row| bson_into::<CategoryStats>(Bson::Document(row)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Envelope::list(stats))
}

pub async fn by_suburb(State(state): State<AppState>) -> ApiResult<Envelope<Vec<CategoryStats>>> {
    run(&state, category_stats("suburb", false)).await
}

pub async fn by_cuisine(State(state): State<AppState>) -> ApiResult<Envelope<Vec<CategoryStats>>> {
    run(&state, category_stats("cuisine", true)).await
}
