//! Route handlers.

pub mod assignments;
pub mod attempts;
pub mod demo;
pub mod health;
pub mod metrics;
pub mod saga;

use std::str::FromStr;

use crate::error::ApiError;

/// Parses a UUID-backed identifier from a path segment.
pub(crate) fn parse_id<T>(id: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = uuid::Error>,
{
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
