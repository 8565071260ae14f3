//! Reviews nested under a restaurant.

use axum::{Router, extract::State, routing::get};
use bson::{Bson, doc};
use serde::Deserialize;
use uuid::Uuid;

use eatery_core::{
    document::bson_into,
    error::DocumentStoreError,
    pipeline::{Accumulator, GroupKey, Pipeline},
    query::{Filter, Projection, Query, SortDirection},
};

use crate::{
    auth::{AuthUser, Role},
    error::{ApiError, ApiResult},
    extract::{AppJson, AppPath},
    models::{
        restaurant::{DEFAULT_RATING, Restaurant, round_rating},
        review::{NewReview, Review, ReviewSummary},
    },
    response::Envelope,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/restaurants/{id}/reviews", get(list).post(create))
}

#[derive(Deserialize)]
struct RatingSummary {
    #[serde(rename = "nRating")]
    count: i64,
    #[serde(rename = "avgRating")]
    average: Option<f64>,
}

fn already_reviewed() -> ApiError {
    ApiError::BadRequest("You have already reviewed this restaurant".to_string())
}

async fn ensure_restaurant(state: &AppState, id: Uuid) -> ApiResult<()> {
    let exists = state
        .store
        .typed_collection::<Restaurant>()
        .count(Some(Filter::eq("id", id.to_string())))
        .await?;

    if exists == 0 {
        return Err(ApiError::not_found("restaurant"));
    }

    Ok(())
}

/// The embedded review fields of a restaurant, oldest first.
pub(crate) async fn reviews_of(state: &AppState, restaurant: Uuid) -> ApiResult<Vec<ReviewSummary>> {
    let rows = state
        .store
        .typed_collection::<Review>()
        .untyped()
        .query(
            Query::builder()
                .filter(Filter::eq("restaurant", restaurant.to_string()))
                .sort("createdAt", SortDirection::Asc)
                .project(Projection::Include(ReviewSummary::FIELDS.map(String::from).to_vec()))
                .build(),
        )
        .await?;

    Ok(rows
        .into_iter()
        .map(bson_into::<ReviewSummary>)
        .collect::<Result<Vec<_>, _>>()?)
}

/// Recomputes a restaurant's rating count and average from its reviews.
pub(crate) async fn update_ratings(state: &AppState, restaurant: Uuid) -> ApiResult<()> {
    let pipeline = Pipeline::builder()
        .filter(Filter::eq("restaurant", restaurant.to_string()))
        .group(
            GroupKey::All,
            [
                ("nRating", Accumulator::Count),
                ("avgRating", Accumulator::avg("rating")),
            ],
        )
        .build();

    let summary = state
        .store
        .typed_collection::<Review>()
        .untyped()
        .aggregate(pipeline)
        .await?
        .into_iter()
        .next()
        .map(|row| bson_into::<RatingSummary>(Bson::Document(row)))
        .transpose()?;

    let (quantity, average) = match summary {
        Some(RatingSummary { count, average }) => (count, average.unwrap_or(DEFAULT_RATING)),
        None => (0, DEFAULT_RATING),
    };

    state
        .store
        .typed_collection::<Restaurant>()
        .find_and_update(
            restaurant,
            doc! { "ratingsQuantity": quantity, "ratingsAverage": round_rating(average) },
        )
        .await?;

    tracing::debug!(%restaurant, quantity, average, "ratings updated");

    Ok(())
}

pub async fn list(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Envelope<Vec<Review>>> {
    ensure_restaurant(&state, id).await?;

    let reviews = state
        .store
        .typed_collection::<Review>()
        .query(
            Query::builder()
                .filter(Filter::eq("restaurant", id.to_string()))
                .sort("createdAt", SortDirection::Desc)
                .build(),
        )
        .await?;

    Ok(Envelope::list(reviews))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(body): AppJson<NewReview>,
) -> ApiResult<Envelope<Review>> {
    user.require(&[Role::User, Role::Admin])?;
    body.validate()?;
    ensure_restaurant(&state, id).await?;

    let reviews = state.store.typed_collection::<Review>();
    let existing = reviews
        .count(Some(Filter::and([
            Filter::eq("restaurant", id.to_string()),
            Filter::eq("user", user.id.to_string()),
        ])))
        .await?;

    if existing > 0 {
        return Err(already_reviewed());
    }

    // A concurrent review from the same user is caught by the unique index.
    let review = body.into_review(id, user.id);
    reviews.insert(vec![review.clone()]).await.map_err(|err| match err {
        DocumentStoreError::DocumentAlreadyExists(_, _) => already_reviewed(),
        other => other.into(),
    })?;
    update_ratings(&state, id).await?;

    tracing::info!(restaurant = %id, review = %review.id, "review created");

    Ok(Envelope::created(review))
}
