//! Pagination utilities for list endpoints
//!
//! Every list endpoint takes optional `page` and `limit` query parameters and
//! returns a `pagination` block alongside its rows.

use serde::{Deserialize, Serialize};

/// Largest page size a client may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Raw `page`/`limit` query parameters as they arrive on a request
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Sanitized pagination values for a SQL LIMIT/OFFSET query
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Rows per page, clamped to [1, MAX_PAGE_SIZE]
    pub limit: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

/// Pagination metadata returned to the client
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PageInfo {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PageRequest {
    /// Sanitize raw query parameters.
    ///
    /// `default_limit` varies per resource (10 for gate lists, 25 for stock
    /// lists). Page floors at 1; limit clamps to [1, MAX_PAGE_SIZE].
    pub fn from_params(params: PageParams, default_limit: i64) -> Self {
        let limit = params
            .limit
            .unwrap_or(default_limit)
            .clamp(1, MAX_PAGE_SIZE);
        let page = params.page.unwrap_or(1).max(1);

        Self {
            page,
            limit,
            offset: (page - 1) * limit,
        }
    }

    /// Build the response metadata once the total row count is known
    pub fn info(&self, total: i64) -> PageInfo {
        PageInfo {
            page: self.page,
            limit: self.limit,
            total,
            total_pages: (total + self.limit - 1) / self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<i64>, limit: Option<i64>) -> PageParams {
        PageParams { page, limit }
    }

    #[test]
    fn test_defaults_applied() {
        let req = PageRequest::from_params(params(None, None), 25);
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, 25);
        assert_eq!(req.offset, 0);
    }

    #[test]
    fn test_offset_math() {
        let req = PageRequest::from_params(params(Some(3), Some(10)), 25);
        assert_eq!(req.page, 3);
        assert_eq!(req.offset, 20);
    }

    #[test]
    fn test_limit_clamped_high() {
        let req = PageRequest::from_params(params(Some(1), Some(5000)), 25);
        assert_eq!(req.limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_limit_clamped_low() {
        let req = PageRequest::from_params(params(Some(1), Some(0)), 25);
        assert_eq!(req.limit, 1);
    }

    #[test]
    fn test_page_floors_at_one() {
        let req = PageRequest::from_params(params(Some(-4), Some(10)), 25);
        assert_eq!(req.page, 1);
        assert_eq!(req.offset, 0);
    }

    #[test]
    fn test_info_total_pages_rounds_up() {
        let req = PageRequest::from_params(params(Some(1), Some(10)), 25);
        let info = req.info(101);
        assert_eq!(info.total, 101);
        assert_eq!(info.total_pages, 11);
    }

    #[test]
    fn test_info_empty_result_set() {
        let req = PageRequest::from_params(params(Some(1), Some(10)), 25);
        let info = req.info(0);
        assert_eq!(info.total_pages, 0);
    }

    #[test]
    fn test_info_exact_boundary() {
        let req = PageRequest::from_params(params(Some(2), Some(50)), 25);
        let info = req.info(100);
        assert_eq!(info.total_pages, 2);
    }
}
