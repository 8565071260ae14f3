//! The success envelope shared by every endpoint.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use eatery_core::page::Page;

/// Navigation metadata for paginated lists.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev: Option<usize>,
}

/// `{"status": "success", "count"?, "pagination"?, "data"}`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    #[serde(skip)]
    code: StatusCode,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pagination: Option<Pagination>,
    data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: StatusCode::OK,
            status: "success",
            count: None,
            pagination: None,
            data,
        }
    }

    pub fn created(data: T) -> Self {
        Self { code: StatusCode::CREATED, ..Self::ok(data) }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

impl<T: Serialize> Envelope<Vec<T>> {
    /// A counted list.
    pub fn list(items: Vec<T>) -> Self {
        let count = items.len();
        Self::ok(items).with_count(count)
    }

    /// A counted list with navigation metadata.
    pub fn page(page: Page<T>) -> Self {
        let pagination = Pagination {
            page: page.page,
            limit: page.per_page,
            total: page.total,
            next: page.next_page,
            prev: page.previous_page,
        };

        Self {
            pagination: Some(pagination),
            ..Self::list(page.items)
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        (self.code, Json(self)).into_response()
    }
}
