//! Concurrent multi-provider search
//!
//! One future per provider, joined with `join_all` so no failure cancels its
//! siblings. Each provider runs under its own timeout; the overall deadline
//! cancels a shared token and keeps whatever each provider already collected.

use super::chronicling_america::ChroniclingAmericaProvider;
use super::familysearch::FamilySearchProvider;
use super::unsupported::NoPublicApiProvider;
use super::wikitree::WikiTreeProvider;
use super::{ProviderError, ProviderSession, SearchLimits, SearchProvider};
use crate::types::SearchStrategy;
use futures::future::join_all;
use kinmatch_common::config::{resolve_familysearch_client_id, TomlConfig};
use kinmatch_common::model::{CandidateRecord, Subject};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How a provider's part of a search ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderStatus {
    Ok,
    Failed,
    TimedOut,
    /// Stopped by the overall deadline; partial results kept
    Cancelled,
    Disabled,
}

/// Per-provider outcome of one search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderReport {
    pub provider: String,
    pub status: ProviderStatus,
    pub result_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub requests: usize,
    pub elapsed_ms: u64,
}

/// Merged search results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregatedResults {
    /// Deduplicated, sorted descending by initial confidence
    pub records: Vec<CandidateRecord>,
    pub reports: Vec<ProviderReport>,
}

/// Runs every enabled provider concurrently and merges their candidates
pub struct SourceAggregator {
    providers: Vec<Arc<dyn SearchProvider>>,
    limits: SearchLimits,
}

impl SourceAggregator {
    pub fn new(providers: Vec<Arc<dyn SearchProvider>>, limits: SearchLimits) -> Self {
        Self { providers, limits }
    }

    /// Build the standard provider set from configuration
    pub fn from_config(config: &TomlConfig, client: reqwest::Client) -> Self {
        let providers = &config.providers;
        let list: Vec<Arc<dyn SearchProvider>> = vec![
            Arc::new(FamilySearchProvider::new(
                client.clone(),
                &providers.familysearch,
                resolve_familysearch_client_id(config),
            )),
            Arc::new(WikiTreeProvider::new(client.clone(), &providers.wikitree)),
            Arc::new(ChroniclingAmericaProvider::new(
                client,
                &providers.chronicling_america,
            )),
            Arc::new(NoPublicApiProvider::findagrave(&providers.findagrave)),
            Arc::new(NoPublicApiProvider::ancestry(&providers.ancestry)),
        ];

        for provider in &list {
            debug!(
                provider = provider.id(),
                enabled = provider.is_enabled(),
                "Search provider registered"
            );
        }

        Self::new(list, SearchLimits::from(&config.search))
    }

    pub fn limits(&self) -> &SearchLimits {
        &self.limits
    }

    /// Provider ids in registration order
    pub fn provider_ids(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// (id, enabled) for every registered provider
    pub fn provider_states(&self) -> Vec<(&'static str, bool)> {
        self.providers.iter().map(|p| (p.id(), p.is_enabled())).collect()
    }

    /// Search every provider for candidates matching `subject`
    pub async fn search_all_sources(
        &self,
        strategy: &SearchStrategy,
        subject: &Subject,
    ) -> AggregatedResults {
        let cancel = CancellationToken::new();
        let started = Instant::now();

        let runs = self
            .providers
            .iter()
            .map(|provider| self.run_provider(provider.as_ref(), strategy, subject, &cancel));
        let joined = join_all(runs);
        tokio::pin!(joined);

        let outputs = tokio::select! {
            outputs = &mut joined => outputs,
            _ = tokio::time::sleep(self.limits.overall_deadline) => {
                warn!(
                    subject = %subject.id,
                    deadline_secs = self.limits.overall_deadline.as_secs_f64(),
                    "Search deadline reached, cancelling outstanding providers"
                );
                cancel.cancel();
                joined.await
            }
        };

        let mut records = Vec::new();
        let mut reports = Vec::with_capacity(outputs.len());
        for (found, report) in outputs {
            records.extend(found);
            reports.push(report);
        }

        let total = records.len();
        let records = dedup_and_rank(records);

        info!(
            subject = %subject.id,
            found = total,
            unique = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Source search complete"
        );

        AggregatedResults { records, reports }
    }

    async fn run_provider(
        &self,
        provider: &dyn SearchProvider,
        strategy: &SearchStrategy,
        subject: &Subject,
        cancel: &CancellationToken,
    ) -> (Vec<CandidateRecord>, ProviderReport) {
        let id = provider.id();
        let started = Instant::now();

        if !provider.is_enabled() {
            debug!(provider = id, "Provider disabled, skipping");
            return (Vec::new(), report(id, ProviderStatus::Disabled, 0, None, 0, started));
        }

        let session = ProviderSession::new(self.limits.clone(), cancel.child_token());
        let work = async {
            provider.authenticate(&session).await?;
            provider.search(strategy, subject, &session).await
        };

        let (records, status, error) =
            match tokio::time::timeout(self.limits.provider_timeout, work).await {
                Ok(Ok(records)) if session.is_cancelled() => {
                    (records, ProviderStatus::Cancelled, None)
                }
                Ok(Ok(records)) => (records, ProviderStatus::Ok, None),
                Ok(Err(ProviderError::Cancelled)) => {
                    (session.take_collected(), ProviderStatus::Cancelled, None)
                }
                Ok(Err(e)) => {
                    warn!(provider = id, subject = %subject.id, error = %e, "Provider search failed");
                    (Vec::new(), ProviderStatus::Failed, Some(e.to_string()))
                }
                Err(_) => {
                    warn!(
                        provider = id,
                        subject = %subject.id,
                        timeout_secs = self.limits.provider_timeout.as_secs_f64(),
                        "Provider search timed out"
                    );
                    (
                        Vec::new(),
                        ProviderStatus::TimedOut,
                        Some(ProviderError::Timeout.to_string()),
                    )
                }
            };

        debug!(
            provider = id,
            status = ?status,
            results = records.len(),
            requests = session.requests_made(),
            "Provider finished"
        );

        let report = report(id, status, records.len(), error, session.requests_made(), started);
        (records, report)
    }
}

fn report(
    provider: &str,
    status: ProviderStatus,
    result_count: usize,
    error: Option<String>,
    requests: usize,
    started: Instant,
) -> ProviderReport {
    ProviderReport {
        provider: provider.to_string(),
        status,
        result_count,
        error,
        requests,
        elapsed_ms: started.elapsed().as_millis() as u64,
    }
}

/// Drop duplicate `name|birth|location` keys (first occurrence wins) and
/// sort by initial confidence, highest first
pub fn dedup_and_rank(records: Vec<CandidateRecord>) -> Vec<CandidateRecord> {
    let mut seen = HashSet::new();
    let mut unique: Vec<CandidateRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.dedup_key()))
        .collect();
    // Stable sort keeps provider order among equal confidences
    unique.sort_by(|a, b| b.initial_confidence.total_cmp(&a.initial_confidence));
    unique
}
