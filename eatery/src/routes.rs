//! The HTTP router.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::{
    handlers::{geo, not_found, restaurants, reviews, stats},
    state::AppState,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/restaurants", get(restaurants::list).post(restaurants::create))
        .route("/api/restaurants/stats-by-suburb", get(stats::by_suburb))
        .route("/api/restaurants/stats-by-cuisine", get(stats::by_cuisine))
        .route(
            "/api/restaurants/within/{distance}/{unit}/near/{latlng}",
            get(geo::within),
        )
        .route(
            "/api/restaurants/distances-from/{latlng}/unit/{unit}",
            get(geo::distances),
        )
        .route(
            "/api/restaurants/{id}",
            get(restaurants::get_one)
                .patch(restaurants::update)
                .delete(restaurants::delete),
        )
        .merge(reviews::routes())
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
