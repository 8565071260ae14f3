//! Pagination types for managing query results.
//!
//! [`PaginationParams`] describes which window of a result set to fetch, and
//! [`Page`] carries that window together with navigation metadata.

use serde::{Deserialize, Serialize};

/// A single page of results.
///
/// # Example
///
/// ```ignore
/// use eatery_core::page::{Page, PaginationParams};
///
/// let params = PaginationParams::new(2, 10);
/// let page = Page::new(vec!["item"; 10], 35, &params);
///
/// assert_eq!(page.next_page, Some(3));
/// assert_eq!(page.previous_page, Some(1));
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// The items contained in this page.
    pub items: Vec<T>,
    /// Total count of items across all pages.
    pub total: usize,
    /// This page's number (1-indexed).
    pub page: usize,
    /// Page size the window was computed with.
    pub per_page: usize,
    /// The next page number (if more pages exist).
    pub next_page: Option<usize>,
    /// The previous page number (if this is not the first page).
    pub previous_page: Option<usize>,
}

impl<T> Page<T> {
    /// Wraps an already fetched window of items.
    pub fn new(items: Vec<T>, total: usize, params: &PaginationParams) -> Self {
        let end = params.offset().saturating_add(items.len());

        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
            next_page: if end < total { params.page.checked_add(1) } else { None },
            previous_page: (params.page > 1).then(|| params.page - 1),
        }
    }
}

/// Parameters for paginating through large result sets.
///
/// Pages are 1-indexed (page 1 is the first page).
///
/// ```ignore
/// let params = PaginationParams::new(3, 20);
/// assert_eq!(params.offset(), 40);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PaginationParams {
    /// The page number (1-indexed).
    pub page: usize,
    /// Number of items per page.
    pub per_page: usize,
}

impl PaginationParams {
    pub fn new(page: usize, per_page: usize) -> Self {
        Self { page, per_page }
    }

    /// Number of items to skip before this page, or `None` when it does not
    /// fit in a `usize`.
    pub fn checked_offset(&self) -> Option<usize> {
        self.page.saturating_sub(1).checked_mul(self.per_page)
    }

    /// Number of items to skip before this page, saturating at `usize::MAX`.
    pub fn offset(&self) -> usize {
        self.checked_offset().unwrap_or(usize::MAX)
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, per_page: 100 }
    }
}
