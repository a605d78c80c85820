//! kinmatch-resolver library interface
//!
//! Matching core, provider federation, rejection ledger and HTTP API.
//! Exposed as a library for the binary and for integration tests.

pub mod analysis;
pub mod api;
pub mod db;
pub mod error;
pub mod names;
pub mod pipeline;
pub mod scoring;
pub mod sources;
pub mod types;
pub mod validators;

pub use crate::error::{ApiError, ApiResult};
pub use crate::pipeline::{MatchPipeline, SearchOutcome, SearchStatus};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub pipeline: Arc<MatchPipeline>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last provider or storage error, for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, pipeline: MatchPipeline) -> Self {
        Self {
            db,
            pipeline: Arc::new(pipeline),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::search_routes())
        .merge(api::analyze_routes())
        .merge(api::rejection_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
