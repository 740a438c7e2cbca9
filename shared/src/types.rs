//! Common types used across the workspace

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stored label that does not name a known enum variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {field} value: {value}")]
pub struct ParseEnumError {
    pub field: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

/// Pagination parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub const MAX_PER_PAGE: u32 = 200;

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page.clamp(1, Self::MAX_PER_PAGE))
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page.max(1) - 1) * self.limit()
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
        }
    }
}

/// Paginated response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl PaginationMeta {
    pub fn new(pagination: &Pagination, total_items: u64) -> Self {
        let per_page = pagination.limit() as u32;
        let total_pages = total_items.div_ceil(u64::from(per_page)) as u32;
        Self {
            page: pagination.page.max(1),
            per_page,
            total_items,
            total_pages,
        }
    }
}
