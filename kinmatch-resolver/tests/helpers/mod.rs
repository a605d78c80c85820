//! Shared fixtures for kinmatch-resolver integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use kinmatch_common::model::{
    CandidateRecord, FamilyContext, PersonRecord, RecordType, Sex, SpouseRef, Subject,
};
use kinmatch_resolver::analysis::{
    GenerationRequest, GenerativeError, GenerativeProvider, MatchAnalysisOrchestrator,
    ModelEndpoint,
};
use kinmatch_resolver::db::{init_tables, RejectionLedger};
use kinmatch_resolver::sources::{
    ProviderError, ProviderSession, SearchLimits, SearchProvider, SearchQuery, SourceAggregator,
};
use kinmatch_resolver::types::SearchStrategy;
use kinmatch_resolver::MatchPipeline;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// In-memory database with the resolver tables
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    init_tables(&pool).await.unwrap();
    pool
}

/// Limits with no pacing and short timeouts
pub fn fast_limits() -> SearchLimits {
    SearchLimits {
        max_name_variants: 3,
        max_location_variants: 2,
        max_total_requests: 25,
        request_delay: Duration::ZERO,
        provider_timeout: Duration::from_secs(5),
        overall_deadline: Duration::from_secs(10),
    }
}

/// William Smith, born 1850 in Suffolk, married to Mary Jones
pub fn william_smith() -> Subject {
    let person = PersonRecord::new("William", "Smith")
        .with_sex(Sex::Male)
        .born(Some("12 Mar 1850"), Some("Ipswich, Suffolk, England"))
        .died(Some("1910"), Some("Ipswich, Suffolk, England"));
    let family = FamilyContext {
        father: Some(PersonRecord::new("John", "Smith").born(Some("1820"), None)),
        mother: Some(PersonRecord::new("Ann", "Brown").born(Some("1825"), None)),
        spouses: vec![SpouseRef {
            person: PersonRecord::new("Mary", "Jones"),
            ..Default::default()
        }],
        children: Vec::new(),
    };
    Subject::new("I1", person).with_family(family)
}

pub fn candidate(id: &str, name: &str, birth: Option<&str>, location: Option<&str>) -> CandidateRecord {
    let mut record = CandidateRecord::new(id, "fixed", name);
    record.birth_date = birth.map(str::to_string);
    record.location = location.map(str::to_string);
    record.record_type = RecordType::VitalRecord;
    record.initial_confidence = 0.5;
    record
}

/// Provider returning the same records for every search
pub struct FixedProvider {
    pub id: &'static str,
    pub records: Vec<CandidateRecord>,
    pub enabled: bool,
}

impl FixedProvider {
    pub fn serving(id: &'static str, records: Vec<CandidateRecord>) -> Arc<dyn SearchProvider> {
        Arc::new(Self {
            id,
            records,
            enabled: true,
        })
    }

    pub fn disabled(id: &'static str) -> Arc<dyn SearchProvider> {
        Arc::new(Self {
            id,
            records: Vec::new(),
            enabled: false,
        })
    }
}

#[async_trait]
impl SearchProvider for FixedProvider {
    fn id(&self) -> &'static str {
        self.id
    }

    fn display_name(&self) -> &'static str {
        self.id
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn search_query(
        &self,
        _query: &SearchQuery,
        _subject: &Subject,
        _session: &ProviderSession,
    ) -> Result<Vec<CandidateRecord>, ProviderError> {
        Ok(self.records.clone())
    }

    async fn search(
        &self,
        _strategy: &SearchStrategy,
        _subject: &Subject,
        _session: &ProviderSession,
    ) -> Result<Vec<CandidateRecord>, ProviderError> {
        Ok(self.records.clone())
    }
}

/// Provider whose every search fails
pub struct BrokenProvider;

impl BrokenProvider {
    pub fn shared() -> Arc<dyn SearchProvider> {
        Arc::new(Self)
    }
}

#[async_trait]
impl SearchProvider for BrokenProvider {
    fn id(&self) -> &'static str {
        "broken"
    }

    fn display_name(&self) -> &'static str {
        "Broken"
    }

    fn is_enabled(&self) -> bool {
        true
    }

    async fn search_query(
        &self,
        _query: &SearchQuery,
        _subject: &Subject,
        _session: &ProviderSession,
    ) -> Result<Vec<CandidateRecord>, ProviderError> {
        Err(ProviderError::Api(503, "service unavailable".to_string()))
    }
}

/// Generative provider answering from a fixed script, keyed by model id
pub struct ScriptedGenerator {
    models: Vec<ModelEndpoint>,
    replies: Vec<(&'static str, Result<&'static str, u16>)>,
    pub calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(models: &[&str], replies: Vec<(&'static str, Result<&'static str, u16>)>) -> Arc<Self> {
        Arc::new(Self {
            models: models.iter().map(|m| ModelEndpoint::new(*m)).collect(),
            replies,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeProvider for ScriptedGenerator {
    fn models(&self) -> &[ModelEndpoint] {
        &self.models
    }

    async fn generate(
        &self,
        _request: &GenerationRequest,
        model: &ModelEndpoint,
    ) -> Result<String, GenerativeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.replies.iter().find(|(m, _)| *m == model.model) {
            Some((_, Ok(text))) => Ok(text.to_string()),
            Some((_, Err(status))) => Err(GenerativeError::Status(*status, String::new())),
            None => Err(GenerativeError::Status(404, "unknown model".to_string())),
        }
    }
}

/// Pipeline over the given providers, deterministic analysis, fresh ledger
pub async fn pipeline_with(providers: Vec<Arc<dyn SearchProvider>>) -> MatchPipeline {
    let pool = memory_pool().await;
    MatchPipeline::new(
        Arc::new(MatchAnalysisOrchestrator::new(None)),
        Arc::new(SourceAggregator::new(providers, fast_limits())),
        RejectionLedger::new(pool, "default", 100),
    )
}
