//! Pagination for list endpoints
//!
//! `page` is 1-based (default 1), `limit` defaults to 10 and may not exceed
//! 100. Pages past the end are not clamped; they simply come back empty.

use serde::{Deserialize, Serialize};

use super::validation::FieldErrors;
use crate::error::ApiResult;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Raw `?page=&limit=` query; parsed by hand so bad values become field errors
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageQuery {
    pub fn resolve(&self) -> ApiResult<PageRequest> {
        let mut errors = FieldErrors::new();

        let page = parse_bounded(&mut errors, "page", self.page.as_deref(), DEFAULT_PAGE, 1, i64::MAX);
        let limit = parse_bounded(&mut errors, "limit", self.limit.as_deref(), DEFAULT_LIMIT, 1, MAX_LIMIT);

        errors.finish()?;
        Ok(PageRequest { page, limit })
    }
}

fn parse_bounded(
    errors: &mut FieldErrors,
    field: &str,
    raw: Option<&str>,
    default: i64,
    min: i64,
    max: i64,
) -> i64 {
    let Some(raw) = raw else {
        return default;
    };

    match raw.trim().parse::<i64>() {
        Ok(value) if value < min => {
            errors.add(field, &format!("must be at least {}", min));
            default
        }
        Ok(value) if value > max => {
            errors.add(field, &format!("must be at most {}", max));
            default
        }
        Ok(value) => value,
        Err(_) => {
            errors.add(field, "must be an integer");
            default
        }
    }
}

/// Pagination metadata returned alongside a page of rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

/// Calculate pagination metadata from total results and the requested page
///
/// # Examples
/// ```
/// use leadwell_server::api::pagination::calculate_pagination;
///
/// // 24 rows at 10 per page = 3 pages (10 + 10 + 4)
/// let p = calculate_pagination(24, 2, 10);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.page, 2);
/// ```
pub fn calculate_pagination(total: i64, page: i64, limit: i64) -> Pagination {
    let limit = limit.max(1);
    let total_pages = (total.max(0) + limit - 1) / limit;

    Pagination {
        page,
        limit,
        total,
        total_pages,
    }
}
