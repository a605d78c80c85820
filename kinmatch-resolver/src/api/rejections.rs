//! Rejection ledger endpoints

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use kinmatch_common::model::CandidateRecord;
use serde::{Deserialize, Serialize};

use super::owner_from_headers;
use crate::db::RejectionEntry;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /rejections request
///
/// Either `candidate_id` or a full `candidate` record, which is kept as a
/// snapshot. When both are given the ids must agree.
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub subject_id: String,
    #[serde(default)]
    pub candidate_id: Option<String>,
    #[serde(default)]
    pub candidate: Option<CandidateRecord>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// GET /rejections/:subject_id response
#[derive(Debug, Serialize)]
pub struct RejectionListResponse {
    pub subject_id: String,
    pub owner: String,
    pub rejections: Vec<RejectionEntry>,
}

/// POST /rejections
pub async fn reject_candidate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RejectRequest>,
) -> ApiResult<(StatusCode, Json<RejectionEntry>)> {
    let owner = owner_from_headers(&headers)?;
    let reason = request.reason.as_deref();
    let entry = match (&request.candidate, request.candidate_id.as_deref()) {
        (Some(candidate), Some(id)) if id != candidate.id => {
            return Err(ApiError::BadRequest(format!(
                "candidate_id '{}' does not match candidate record '{}'",
                id, candidate.id
            )));
        }
        (Some(candidate), _) => {
            state
                .pipeline
                .reject_record(&owner, &request.subject_id, candidate, reason)
                .await?
        }
        (None, Some(id)) => {
            state
                .pipeline
                .reject(&owner, &request.subject_id, id, reason)
                .await?
        }
        (None, None) => {
            return Err(ApiError::BadRequest(
                "candidate_id or candidate is required".to_string(),
            ));
        }
    };
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /rejections/:subject_id
pub async fn list_rejections(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(subject_id): Path<String>,
) -> ApiResult<Json<RejectionListResponse>> {
    let owner = owner_from_headers(&headers)?;
    let rejections = state.pipeline.ledger(&owner).list(Some(&subject_id)).await?;
    Ok(Json(RejectionListResponse {
        subject_id,
        owner,
        rejections,
    }))
}

/// Build rejection routes
pub fn rejection_routes() -> Router<AppState> {
    Router::new()
        .route("/rejections", post(reject_candidate))
        .route("/rejections/:subject_id", get(list_rejections))
}
