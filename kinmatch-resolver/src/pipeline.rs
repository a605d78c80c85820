//! End-to-end match pipeline
//!
//! subject → search strategy → concurrent provider search → rejection
//! filter → confidence scoring → ranked candidates. A single candidate can be
//! sent back through the orchestrator for a deeper judgment.

use crate::analysis::MatchAnalysisOrchestrator;
use crate::db::{RejectionEntry, RejectionLedger};
use crate::scoring::SearchContext;
use crate::sources::aggregator::{ProviderReport, ProviderStatus};
use crate::sources::SourceAggregator;
use crate::types::{ConfidenceResult, MatchAnalysis, SearchStrategy};
use chrono::{DateTime, Utc};
use kinmatch_common::config::TomlConfig;
use kinmatch_common::model::{CandidateRecord, Subject};
use kinmatch_common::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Owner used when a caller does not name one
pub const DEFAULT_OWNER: &str = "default";

/// Overall result of a search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// No provider was enabled, nothing was searched
    NotAttempted,
    /// Providers were searched and returned nothing usable
    NoResults,
    Found,
}

/// Candidate with its rule-based confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub record: CandidateRecord,
    pub confidence: ConfidenceResult,
}

/// Search result returned to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub search_id: Uuid,
    pub subject_id: String,
    pub status: SearchStatus,
    pub strategy: SearchStrategy,
    /// Sorted by overall confidence, highest first
    pub candidates: Vec<ScoredCandidate>,
    pub provider_reports: Vec<ProviderReport>,
    /// Candidates dropped because the owner had rejected them
    pub filtered_rejections: usize,
    pub searched_at: DateTime<Utc>,
}

/// Match pipeline
pub struct MatchPipeline {
    orchestrator: Arc<MatchAnalysisOrchestrator>,
    aggregator: Arc<SourceAggregator>,
    ledger: RejectionLedger,
}

impl MatchPipeline {
    pub fn new(
        orchestrator: Arc<MatchAnalysisOrchestrator>,
        aggregator: Arc<SourceAggregator>,
        ledger: RejectionLedger,
    ) -> Self {
        Self {
            orchestrator,
            aggregator,
            ledger,
        }
    }

    /// Wire the standard components from configuration
    pub fn from_config(config: &TomlConfig, pool: SqlitePool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("kinmatch/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| kinmatch_common::Error::Config(format!("HTTP client: {}", e)))?;

        Ok(Self::new(
            Arc::new(MatchAnalysisOrchestrator::from_config(config, client.clone())),
            Arc::new(SourceAggregator::from_config(config, client)),
            RejectionLedger::new(pool, DEFAULT_OWNER, config.ledger.capacity),
        ))
    }

    pub fn orchestrator(&self) -> &MatchAnalysisOrchestrator {
        &self.orchestrator
    }

    pub fn aggregator(&self) -> &SourceAggregator {
        &self.aggregator
    }

    /// Ledger scoped to `owner`
    pub fn ledger(&self, owner: &str) -> RejectionLedger {
        if owner == self.ledger.owner() {
            self.ledger.clone()
        } else {
            self.ledger.for_owner(owner)
        }
    }

    /// Search every provider for candidates matching `subject`
    pub async fn search(&self, subject: &Subject, owner: &str) -> Result<SearchOutcome> {
        subject.ensure_matchable()?;
        let search_id = Uuid::new_v4();

        let strategy = self.orchestrator.generate_search_queries(subject).await;
        let results = self.aggregator.search_all_sources(&strategy, subject).await;

        let attempted = results
            .reports
            .iter()
            .any(|r| r.status != ProviderStatus::Disabled);

        let rejected = self.ledger(owner).rejected_candidates(&subject.id).await?;
        let before = results.records.len();
        let records: Vec<CandidateRecord> = results
            .records
            .into_iter()
            .filter(|r| !rejected.contains(&r.id))
            .collect();
        let filtered_rejections = before - records.len();

        let context = SearchContext::from(&strategy);
        let scorer = self.orchestrator.scorer();
        let mut candidates: Vec<ScoredCandidate> = records
            .into_iter()
            .map(|record| {
                let confidence = scorer.calculate_confidence(subject, &record, &context);
                ScoredCandidate { record, confidence }
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.confidence
                .overall_confidence
                .total_cmp(&a.confidence.overall_confidence)
        });

        let status = if !attempted {
            SearchStatus::NotAttempted
        } else if candidates.is_empty() {
            SearchStatus::NoResults
        } else {
            SearchStatus::Found
        };

        info!(
            search_id = %search_id,
            subject = %subject.id,
            owner = %owner,
            status = ?status,
            candidates = candidates.len(),
            filtered_rejections,
            method = strategy.method.as_str(),
            "Search complete"
        );

        Ok(SearchOutcome {
            search_id,
            subject_id: subject.id.clone(),
            status,
            strategy,
            candidates,
            provider_reports: results.reports,
            filtered_rejections,
            searched_at: Utc::now(),
        })
    }

    /// Deep analysis of one candidate
    pub async fn analyze(
        &self,
        subject: &Subject,
        candidate: &CandidateRecord,
    ) -> Result<MatchAnalysis> {
        subject.ensure_matchable()?;
        if candidate.id.trim().is_empty() {
            return Err(kinmatch_common::Error::InvalidInput(
                "candidate id is required".to_string(),
            ));
        }
        Ok(self.orchestrator.analyze_record_match(subject, candidate).await)
    }

    /// Record a human rejection so later searches exclude the candidate
    pub async fn reject(
        &self,
        owner: &str,
        subject_id: &str,
        candidate_id: &str,
        reason: Option<&str>,
    ) -> Result<RejectionEntry> {
        let entry = self
            .ledger(owner)
            .reject(subject_id, candidate_id, reason)
            .await?;
        info!(owner = %owner, subject = %subject_id, candidate = %candidate_id, "Candidate rejected");
        Ok(entry)
    }

    /// [`reject`](Self::reject) keeping a snapshot of the candidate record
    pub async fn reject_record(
        &self,
        owner: &str,
        subject_id: &str,
        candidate: &CandidateRecord,
        reason: Option<&str>,
    ) -> Result<RejectionEntry> {
        let entry = self
            .ledger(owner)
            .reject_with_snapshot(subject_id, candidate, reason)
            .await?;
        info!(owner = %owner, subject = %subject_id, candidate = %candidate.id, "Candidate rejected");
        Ok(entry)
    }
}
