//! Page-based pagination for the library endpoints.
//!
//! Clients send `page` (1-based) and `limit`. The song list is forgiving about bad values while
//! the lyrics endpoint rejects them, so both are received as raw strings and interpreted by the
//! endpoint.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Page used when `page` is missing, unparsable or below 1.
pub const DEFAULT_PAGE: i64 = 1;

/// Number of songs per page when `limit` is missing, unparsable or below 1.
pub const DEFAULT_LIMIT: i64 = 10;

/// Raw pagination query parameters.
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct PageParams {
    /// Page number, starting at 1
    #[param(value_type = Option<i64>, minimum = 1, example = 1)]
    #[schema(value_type = Option<i64>)]
    pub page: Option<String>,

    /// Maximum items per page
    #[param(value_type = Option<i64>, minimum = 1, example = 10)]
    #[schema(value_type = Option<i64>)]
    pub limit: Option<String>,
}

impl PageParams {
    /// Interpret the parameters leniently: non-positive or unparsable values fall back to
    /// [`DEFAULT_PAGE`] and [`DEFAULT_LIMIT`].
    pub fn lenient(&self) -> PageRequest {
        fn positive(raw: Option<&str>, default: i64) -> i64 {
            raw.and_then(|v| v.trim().parse::<i64>().ok()).filter(|v| *v >= 1).unwrap_or(default)
        }

        PageRequest {
            page: positive(self.page.as_deref(), DEFAULT_PAGE),
            limit: positive(self.limit.as_deref(), DEFAULT_LIMIT),
        }
    }
}

/// A resolved page: `page >= 1`, `limit >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// Rows to skip before this page
    #[inline]
    pub fn skip(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Paginated list response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T: ToSchema> {
    /// The items for the current page
    pub data: Vec<T>,
    /// Total number of items matching the query (before pagination)
    pub total_count: i64,
    /// Page that was returned
    pub page: i64,
    /// Maximum items per page
    pub limit: i64,
}

impl<T: ToSchema> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total_count: i64, request: PageRequest) -> Self {
        Self {
            data,
            total_count,
            page: request.page,
            limit: request.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<&str>, limit: Option<&str>) -> PageParams {
        PageParams {
            page: page.map(str::to_string),
            limit: limit.map(str::to_string),
        }
    }

    #[test]
    fn test_lenient_defaults() {
        assert_eq!(PageParams::default().lenient(), PageRequest { page: 1, limit: 10 });
    }

    #[test]
    fn test_lenient_falls_back_on_bad_values() {
        assert_eq!(params(Some("0"), Some("-3")).lenient(), PageRequest { page: 1, limit: 10 });
        assert_eq!(params(Some("two"), Some("")).lenient(), PageRequest { page: 1, limit: 10 });
        assert_eq!(params(Some("3"), Some("25")).lenient(), PageRequest { page: 3, limit: 25 });
    }

    #[test]
    fn test_skip() {
        assert_eq!(PageRequest { page: 1, limit: 5 }.skip(), 0);
        assert_eq!(PageRequest { page: 2, limit: 5 }.skip(), 5);
        assert_eq!(PageRequest { page: i64::MAX, limit: 10 }.skip(), i64::MAX);
    }
}
