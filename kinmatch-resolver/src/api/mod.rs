//! HTTP API handlers for kinmatch-resolver
//!
//! JSON over HTTP. Requests may name an owner through the `x-owner-id`
//! header; rejections are scoped to that owner.

pub mod analyze;
pub mod health;
pub mod rejections;
pub mod search;

pub use analyze::analyze_routes;
pub use health::health_routes;
pub use rejections::rejection_routes;
pub use search::search_routes;

use crate::error::{ApiError, ApiResult};
use crate::pipeline::DEFAULT_OWNER;
use axum::http::HeaderMap;

/// Header naming the owner of a request
pub const OWNER_HEADER: &str = "x-owner-id";

/// Owner named by the request headers, or the default owner
pub fn owner_from_headers(headers: &HeaderMap) -> ApiResult<String> {
    match headers.get(OWNER_HEADER) {
        None => Ok(DEFAULT_OWNER.to_string()),
        Some(value) => {
            let owner = value
                .to_str()
                .map_err(|_| ApiError::BadRequest(format!("{} must be ASCII", OWNER_HEADER)))?
                .trim();
            if owner.is_empty() {
                return Err(ApiError::BadRequest(format!("{} is empty", OWNER_HEADER)));
            }
            Ok(owner.to_string())
        }
    }
}
