//! Pagination engine for listing endpoints
//!
//! Page and limit arrive as raw query strings; absent or non-numeric values
//! count as 0 and are then normalized. Total pages are computed from a row
//! count taken before the limit/offset are applied.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

/// Raw pagination query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Normalized page/limit pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    pub page: i64,
    pub limit: i64,
}

impl PageSpec {
    pub fn new(page: i64, limit: i64) -> Self {
        let page = if page < 1 { 1 } else { page };
        let limit = if limit > MAX_LIMIT {
            MAX_LIMIT
        } else if limit <= 0 {
            DEFAULT_LIMIT
        } else {
            limit
        };
        Self { page, limit }
    }

    pub fn from_query(query: &PageQuery) -> Self {
        let page = parse_param(query.page.as_deref());
        let limit = parse_param(query.limit.as_deref());
        Self::new(page, limit)
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    pub fn total_pages(&self, total_rows: i64) -> i64 {
        (total_rows + self.limit - 1) / self.limit
    }

    /// Deterministic cache key for a listing of the given kind
    pub fn cache_key(&self, kind: &str) -> String {
        format!("{}:page:{}:limit:{}", kind, self.page, self.limit)
    }
}

fn parse_param(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.parse().ok()).unwrap_or(0)
}

/// Paginated response envelope
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Paginated<T>
where
    T: for<'s> ToSchema<'s>,
{
    pub page: i64,
    pub limit: i64,
    pub total_rows: i64,
    pub total_pages: i64,
    pub data: Vec<T>,
}

impl<T> Paginated<T>
where
    T: for<'s> ToSchema<'s>,
{
    pub fn new(spec: PageSpec, total_rows: i64, data: Vec<T>) -> Self {
        Self {
            page: spec.page,
            limit: spec.limit,
            total_rows,
            total_pages: spec.total_pages(total_rows),
            data,
        }
    }
}
