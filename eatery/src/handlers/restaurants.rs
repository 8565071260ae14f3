//! CRUD over restaurants.

use axum::extract::State;
use serde_json::Value;
use uuid::Uuid;

use eatery_core::{
    document::bson_to_json,
    page::Page,
    query::{Filter, Query},
};

use crate::{
    auth::{AuthUser, Role},
    error::{ApiError, ApiResult},
    extract::{AppJson, AppPath},
    handlers::reviews::reviews_of,
    list_query::ListQuery,
    models::{
        restaurant::{NewRestaurant, Restaurant, RestaurantDetail, RestaurantPatch},
        review::Review,
    },
    response::Envelope,
    state::AppState,
};

pub async fn list(State(state): State<AppState>, list: ListQuery) -> ApiResult<Envelope<Vec<Value>>> {
    let restaurants = state.store.typed_collection::<Restaurant>().untyped();

    let total = restaurants.count(list.filter.clone()).await?;
    let rows = restaurants
        .query(list.to_query())
        .await?
        .into_iter()
        .map(bson_to_json)
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(total, returned = rows.len(), "listed restaurants");

    Ok(Envelope::page(Page::new(rows, total, &list.pagination)))
}

pub async fn get_one(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Envelope<RestaurantDetail>> {
    let restaurant = state
        .store
        .typed_collection::<Restaurant>()
        .get_one(id)
        .await?
        .ok_or_else(|| ApiError::not_found("restaurant"))?;

    let reviews = reviews_of(&state, id).await?;

    Ok(Envelope::ok(RestaurantDetail { restaurant, reviews }))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(body): AppJson<NewRestaurant>,
) -> ApiResult<Envelope<Restaurant>> {
    user.require(&[Role::Staff, Role::Owner, Role::Admin])?;
    body.validate()?;

    let restaurant = body.into_restaurant(user.id);
    state
        .store
        .typed_collection::<Restaurant>()
        .insert(vec![restaurant.clone()])
        .await?;

    tracing::info!(id = %restaurant.id, name = %restaurant.name, "restaurant created");

    Ok(Envelope::created(restaurant))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(patch): AppJson<RestaurantPatch>,
) -> ApiResult<Envelope<Restaurant>> {
    user.require(&[Role::Staff, Role::Owner, Role::Admin])?;
    patch.validate()?;

    let changes = patch.into_changes()?;
    let restaurants = state.store.typed_collection::<Restaurant>();

    let updated = if changes.is_empty() {
        restaurants.get_one(id).await?
    } else {
        restaurants.find_and_update(id, changes).await?
    };

    Ok(Envelope::ok(updated.ok_or_else(|| ApiError::not_found("restaurant"))?))
}

/// Deletes a restaurant and its reviews, returning the deleted restaurant.
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Envelope<Restaurant>> {
    user.require(&[Role::Owner, Role::Admin])?;

    let restaurants = state.store.typed_collection::<Restaurant>();
    let restaurant = restaurants
        .get_one(id)
        .await?
        .ok_or_else(|| ApiError::not_found("restaurant"))?;

    let reviews = state.store.typed_collection::<Review>();
    let review_ids: Vec<Uuid> = reviews
        .query(
            Query::builder()
                .filter(Filter::eq("restaurant", id.to_string()))
                .build(),
        )
        .await?
        .into_iter()
        .map(|review| review.id)
        .collect();

    if !review_ids.is_empty() {
        reviews.delete(review_ids).await?;
    }
    restaurants.delete(vec![id]).await?;

    tracing::info!(%id, "restaurant deleted");

    Ok(Envelope::ok(restaurant))
}
