//! Radius search and distances from a point.

use axum::extract::State;
use bson::Bson;

use eatery_core::{
    document::bson_into,
    pipeline::Pipeline,
    query::{Filter, Query},
};

use crate::{
    error::ApiResult,
    extract::AppPath,
    geo::{DistanceUnit, parse_distance, parse_lat_lng},
    models::restaurant::{DistanceRow, Restaurant},
    response::Envelope,
    state::AppState,
};

/// `GET /api/restaurants/within/{distance}/{unit}/near/{latlng}`
pub async fn within(
    State(state): State<AppState>,
    AppPath((distance, unit, latlng)): AppPath<(String, String, String)>,
) -> ApiResult<Envelope<Vec<Restaurant>>> {
    let center = parse_lat_lng(&latlng)?;
    let unit: DistanceUnit = unit.parse()?;
    let distance = parse_distance(&distance)?;
    let radius = unit.to_radians(distance);

    let restaurants = state
        .store
        .typed_collection::<Restaurant>()
        .query(
            Query::builder()
                .filter(Filter::geo_within_sphere("location", center, radius))
                .build(),
        )
        .await?;

    tracing::debug!(?center, radius, found = restaurants.len(), "radius search");

    Ok(Envelope::list(restaurants))
}

/// `GET /api/restaurants/distances-from/{latlng}/unit/{unit}`
pub async fn distances(
    State(state): State<AppState>,
    AppPath((latlng, unit)): AppPath<(String, String)>,
) -> ApiResult<Envelope<Vec<DistanceRow>>> {
    let center = parse_lat_lng(&latlng)?;
    let unit: DistanceUnit = unit.parse()?;

    let pipeline = Pipeline::builder()
        .geo_near("location", center, "distance", unit.meters_multiplier())
        .project(["id", "name", "distance"])
        .build();

    let rows = state
        .store
        .typed_collection::<Restaurant>()
        .untyped()
        .aggregate(pipeline)
        .await?
        .into_iter()
        .map(|row| bson_into::<DistanceRow>(Bson::Document(row)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Envelope::list(rows))
}
