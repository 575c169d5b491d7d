//! Response types for REST handlers
//!
//! [`Page`] is the list envelope, [`Created`] renders `201 Created` with a
//! `Location` header and the stored entity.
//!
//! # Example
//!
//! ```rust
//! use organized_scann::handlers::{build_page, PageRequest};
//!
//! let request = PageRequest::normalize(Some(1), Some(1));
//! let page = build_page(request, 2, vec!["Honda"]);
//! assert_eq!(page.total_pages, 2);
//! assert_eq!(page.items, vec!["Honda"]);
//! ```

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::query::PageRequest;

/// One page of a filtered collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub page_number: u64,
    pub page_size: u64,
    pub total: u64,
    pub total_pages: u64,
    pub items: Vec<T>,
}

/// Assemble a page; never holds more than `page_size` items
pub fn build_page<T>(request: PageRequest, total: u64, mut items: Vec<T>) -> Page<T> {
    let page_size = request.page_size.max(1);
    items.truncate(usize::try_from(page_size).unwrap_or(usize::MAX));
    Page {
        page_number: request.page_number,
        page_size,
        total,
        total_pages: total_pages(total, page_size),
        items,
    }
}

/// `ceil(total / page_size)`; zero when the collection is empty
#[must_use]
pub fn total_pages(total: u64, page_size: u64) -> u64 {
    total.div_ceil(page_size.max(1))
}

/// `201 Created` carrying the new resource and its location
#[derive(Debug, Clone)]
pub struct Created<T> {
    pub location: String,
    pub body: T,
}

impl<T> Created<T> {
    pub fn new(location: impl Into<String>, body: T) -> Self {
        Self {
            location: location.into(),
            body,
        }
    }
}

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        if self.location.is_empty() {
            return (StatusCode::CREATED, Json(self.body)).into_response();
        }
        (
            StatusCode::CREATED,
            [(header::LOCATION, self.location)],
            Json(self.body),
        )
            .into_response()
    }
}
