//! Single-candidate analysis endpoint

use axum::{extract::State, routing::post, Json, Router};
use kinmatch_common::model::{CandidateRecord, Subject};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::types::MatchAnalysis;
use crate::AppState;

/// POST /analyze request
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub subject: Subject,
    pub candidate: CandidateRecord,
}

/// POST /analyze
pub async fn analyze_candidate(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> ApiResult<Json<MatchAnalysis>> {
    let analysis = state
        .pipeline
        .analyze(&request.subject, &request.candidate)
        .await?;
    Ok(Json(analysis))
}

/// Build analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/analyze", post(analyze_candidate))
}
