//! HTTP API handlers for leadwell-server
//!
//! JSON REST endpoints under `/api`, plus `/health`.

pub mod calls;
pub mod catalog;
pub mod form_submissions;
pub mod health;
pub mod insights;
pub mod leads;
pub mod pagination;
pub mod stats;
pub mod users;
pub mod validation;

pub use calls::call_routes;
pub use catalog::catalog_routes;
pub use form_submissions::form_submission_routes;
pub use health::health_routes;
pub use insights::insight_routes;
pub use leads::lead_routes;
pub use stats::stat_routes;
pub use users::user_routes;

use crate::error::{ApiError, ApiResult};

/// Parse a numeric path id; anything else is "Invalid {what} ID"
pub(crate) fn parse_id(raw: &str, what: &str) -> ApiResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {} ID", what)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42", "lead").unwrap(), 42);
        match parse_id("abc", "lead") {
            Err(ApiError::BadRequest(message)) => assert_eq!(message, "Invalid lead ID"),
            other => panic!("expected bad request, got {:?}", other),
        }
    }
}
