use axum::{response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_PER_PAGE: u64 = 20;
pub const MAX_PER_PAGE: u64 = 100;

#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        Json(self).into_response()
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T: Serialize> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            total.div_ceil(per_page)
        };
        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PaginationQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl PaginationQuery {
    /// `(page, per_page)` with page ≥ 1 and per_page in `1..=MAX_PER_PAGE`.
    pub fn resolve(&self) -> (u64, u64) {
        resolve_page(self.page, self.per_page)
    }
}

pub fn resolve_page(page: Option<u64>, per_page: Option<u64>) -> (u64, u64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    (page, per_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_with_remainder() {
        let resp = PaginatedResponse::<String>::new(vec![], 101, 1, 20);
        assert_eq!(resp.total_pages, 6);
    }

    #[test]
    fn total_pages_exact_division() {
        let resp = PaginatedResponse::<String>::new(vec![], 60, 1, 20);
        assert_eq!(resp.total_pages, 3);
    }

    #[test]
    fn total_pages_zero_total() {
        let resp = PaginatedResponse::<String>::new(vec![], 0, 1, 20);
        assert_eq!(resp.total_pages, 0);
    }

    #[test]
    fn resolve_defaults() {
        assert_eq!(PaginationQuery::default().resolve(), (1, DEFAULT_PER_PAGE));
    }

    #[test]
    fn resolve_clamps() {
        assert_eq!(resolve_page(Some(0), Some(0)), (1, 1));
        assert_eq!(resolve_page(Some(3), Some(1000)), (3, MAX_PER_PAGE));
    }
}
