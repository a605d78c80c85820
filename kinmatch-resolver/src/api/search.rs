//! Candidate search endpoint

use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use kinmatch_common::model::Subject;
use serde::Deserialize;
use tracing::warn;

use super::owner_from_headers;
use crate::error::ApiResult;
use crate::pipeline::SearchOutcome;
use crate::sources::aggregator::ProviderStatus;
use crate::AppState;

/// POST /search request
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub subject: Subject,
}

/// POST /search
///
/// Runs the full pipeline for one subject. Provider failures do not fail the
/// request; they are reported per provider and the latest is kept for /health.
pub async fn search_subject(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<SearchOutcome>> {
    let owner = owner_from_headers(&headers)?;
    let outcome = state.pipeline.search(&request.subject, &owner).await?;

    if let Some(report) = outcome
        .provider_reports
        .iter()
        .rev()
        .find(|r| matches!(r.status, ProviderStatus::Failed | ProviderStatus::TimedOut))
    {
        let message = format!(
            "{}: {}",
            report.provider,
            report.error.as_deref().unwrap_or("timed out")
        );
        warn!(search_id = %outcome.search_id, "Provider problem during search: {}", message);
        state.record_error(message).await;
    }

    Ok(Json(outcome))
}

/// Build search routes
pub fn search_routes() -> Router<AppState> {
    Router::new().route("/search", post(search_subject))
}
