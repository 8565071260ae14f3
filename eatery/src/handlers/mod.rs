//! Request handlers, one module per resource.

pub mod geo;
pub mod restaurants;
pub mod reviews;
pub mod stats;

use axum::http::Uri;

use crate::error::ApiError;

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Can't find {} on this server", uri.path()))
}
