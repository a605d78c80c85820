//! External record providers
//!
//! Each provider implements [`SearchProvider`] and normalizes its results to
//! [`CandidateRecord`]. The [`aggregator::SourceAggregator`] runs every enabled
//! provider concurrently; a failing provider contributes zero results.
//!
//! # Providers
//! 1. **familysearch** - FamilySearch tree search (OAuth, GedcomX)
//! 2. **wikitree** - WikiTree `searchPerson` (public)
//! 3. **chronicling_america** - Library of Congress newspaper pages (public)
//! 4. **unsupported** - Find a Grave / Ancestry (no public API, always empty)
//!
//! # Request discipline
//! A [`ProviderSession`] is created per provider per search. It caps the
//! number of requests, paces them with a `governor` limiter and aborts them
//! when the overall deadline cancels the search.

pub mod aggregator;
pub mod chronicling_america;
pub mod familysearch;
pub mod token;
pub mod unsupported;
pub mod wikitree;

pub use aggregator::{AggregatedResults, SourceAggregator};

use crate::names::split_display_name;
use crate::types::{DateRange, SearchStrategy};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use kinmatch_common::config::SearchConfig;
use kinmatch_common::model::{CandidateRecord, RecordType, Subject};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Provider errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Search cancelled")]
    Cancelled,

    #[error("Request budget exhausted")]
    BudgetExhausted,

    #[error("Provider disabled: {0}")]
    Disabled(String),
}

impl ProviderError {
    /// Errors that end a provider's search rather than a single query
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProviderError::Auth(_)
                | ProviderError::Cancelled
                | ProviderError::BudgetExhausted
                | ProviderError::Disabled(_)
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_decode() {
            ProviderError::Parse(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

// ============================================================================
// Limits and query planning
// ============================================================================

/// Search fan-out limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_name_variants: usize,
    pub max_location_variants: usize,
    /// Per provider, authentication included
    pub max_total_requests: usize,
    pub request_delay: Duration,
    pub provider_timeout: Duration,
    pub overall_deadline: Duration,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for SearchLimits {
    fn from(config: &SearchConfig) -> Self {
        Self {
            max_name_variants: config.max_name_variants.max(1),
            max_location_variants: config.max_location_variants,
            max_total_requests: config.max_total_requests,
            request_delay: Duration::from_millis(config.request_delay_ms),
            provider_timeout: Duration::from_secs(config.provider_timeout_secs),
            overall_deadline: Duration::from_secs(config.overall_deadline_secs),
        }
    }
}

/// One provider request worth of search parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub given: String,
    pub family: String,
    pub location: Option<String>,
    pub years: Option<DateRange>,
    pub record_types: Vec<RecordType>,
}

impl SearchQuery {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.given, self.family).trim().to_string()
    }
}

/// Expand a strategy into concrete queries
///
/// name variants × location variants × date windows. The subject's own name
/// always leads; variants beyond the configured caps are dropped.
pub fn plan_queries(
    strategy: &SearchStrategy,
    subject: &Subject,
    limits: &SearchLimits,
) -> Vec<SearchQuery> {
    let mut names: Vec<(String, String)> = Vec::new();
    let own = (
        subject.person.name.given.trim().to_string(),
        subject.person.name.family.trim().to_string(),
    );
    names.push(own);
    for variation in &strategy.name_variations {
        let split = split_display_name(variation);
        let pair = (split.given, split.family);
        if !names.iter().any(|n| n.0.eq_ignore_ascii_case(&pair.0) && n.1.eq_ignore_ascii_case(&pair.1)) {
            names.push(pair);
        }
    }
    names.truncate(limits.max_name_variants);

    let mut locations: Vec<Option<String>> = strategy
        .location_variations
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .take(limits.max_location_variants)
        .map(|l| Some(l.to_string()))
        .collect();
    if locations.is_empty() {
        locations.push(None);
    }

    let mut windows: Vec<Option<DateRange>> = strategy.date_ranges.iter().copied().map(Some).collect();
    if windows.is_empty() {
        windows.push(None);
    }

    let mut queries = Vec::with_capacity(names.len() * locations.len() * windows.len());
    for (given, family) in &names {
        for location in &locations {
            for years in &windows {
                queries.push(SearchQuery {
                    given: given.clone(),
                    family: family.clone(),
                    location: location.clone(),
                    years: *years,
                    record_types: strategy.record_types.clone(),
                });
            }
        }
    }
    queries
}

/// Drop the location from planned queries, keeping the first of each
/// remaining name × window pair
pub fn without_locations(queries: Vec<SearchQuery>) -> Vec<SearchQuery> {
    let mut distinct: Vec<SearchQuery> = Vec::with_capacity(queries.len());
    for mut query in queries {
        query.location = None;
        if !distinct.contains(&query) {
            distinct.push(query);
        }
    }
    distinct
}

// ============================================================================
// Provider session
// ============================================================================

/// Per-provider request budget, pacing, cancellation and result sink
pub struct ProviderSession {
    limits: SearchLimits,
    remaining: AtomicUsize,
    limiter: Option<DefaultDirectRateLimiter>,
    cancel: CancellationToken,
    collected: Mutex<Vec<CandidateRecord>>,
}

impl ProviderSession {
    pub fn new(limits: SearchLimits, cancel: CancellationToken) -> Self {
        let limiter = Quota::with_period(limits.request_delay).map(RateLimiter::direct);
        Self {
            remaining: AtomicUsize::new(limits.max_total_requests),
            limits,
            limiter,
            cancel,
            collected: Mutex::new(Vec::new()),
        }
    }

    pub fn limits(&self) -> &SearchLimits {
        &self.limits
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Requests still allowed
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Requests consumed so far
    pub fn requests_made(&self) -> usize {
        self.limits.max_total_requests - self.remaining()
    }

    /// Take one request from the budget and wait for the pacing limiter
    pub async fn acquire(&self) -> Result<(), ProviderError> {
        if self.cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map_err(|_| ProviderError::BudgetExhausted)?;

        if let Some(limiter) = &self.limiter {
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(ProviderError::Cancelled),
                _ = limiter.until_ready() => {}
            }
        }
        Ok(())
    }

    /// Send a request under the session's budget, pacing and cancellation
    pub async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ProviderError> {
        self.acquire().await?;
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ProviderError::Cancelled),
            response = request.send() => response.map_err(ProviderError::from),
        }
    }

    /// Keep records found so far, so they survive cancellation
    pub fn collect(&self, records: &[CandidateRecord]) {
        if let Ok(mut collected) = self.collected.lock() {
            collected.extend_from_slice(records);
        }
    }

    /// Drain the records collected so far
    pub fn take_collected(&self) -> Vec<CandidateRecord> {
        self.collected
            .lock()
            .map(|mut c| std::mem::take(&mut *c))
            .unwrap_or_default()
    }
}

// ============================================================================
// Provider trait
// ============================================================================

/// External record provider
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Stable identifier stored in `CandidateRecord::source`
    fn id(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    fn is_enabled(&self) -> bool;

    /// Obtain (or reuse) an access token; `None` for public APIs
    async fn authenticate(&self, _session: &ProviderSession) -> Result<Option<String>, ProviderError> {
        Ok(None)
    }

    /// Expand a strategy into this provider's queries
    ///
    /// Providers that ignore some query field should collapse the plan so
    /// identical requests are not sent twice.
    fn plan(
        &self,
        strategy: &SearchStrategy,
        subject: &Subject,
        limits: &SearchLimits,
    ) -> Vec<SearchQuery> {
        plan_queries(strategy, subject, limits)
    }

    /// Run a single planned query
    async fn search_query(
        &self,
        query: &SearchQuery,
        subject: &Subject,
        session: &ProviderSession,
    ) -> Result<Vec<CandidateRecord>, ProviderError>;

    /// Run every planned query serially
    ///
    /// Per-query failures are logged and skipped. Budget exhaustion and
    /// cancellation end the search with whatever was already found; an
    /// authentication failure ends it with an error. When every query failed
    /// and nothing was found, the last error is returned.
    async fn search(
        &self,
        strategy: &SearchStrategy,
        subject: &Subject,
        session: &ProviderSession,
    ) -> Result<Vec<CandidateRecord>, ProviderError> {
        let queries = self.plan(strategy, subject, session.limits());
        let mut found = Vec::new();
        let mut last_error = None;
        let mut succeeded = 0usize;

        for query in &queries {
            match self.search_query(query, subject, session).await {
                Ok(records) => {
                    succeeded += 1;
                    debug!(
                        provider = self.id(),
                        query = %query.full_name(),
                        results = records.len(),
                        "Provider query complete"
                    );
                    session.collect(&records);
                    found.extend(records);
                }
                Err(ProviderError::BudgetExhausted) => {
                    debug!(provider = self.id(), "Request budget exhausted");
                    break;
                }
                Err(ProviderError::Cancelled) => {
                    debug!(provider = self.id(), "Search cancelled, keeping partial results");
                    break;
                }
                Err(e) if e.is_terminal() => return Err(e),
                Err(e) => {
                    warn!(
                        provider = self.id(),
                        query = %query.full_name(),
                        error = %e,
                        "Provider query failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if succeeded == 0 && found.is_empty() => Err(e),
            _ => Ok(found),
        }
    }
}

/// Trimmed, non-empty text
pub(crate) fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
