//! Providers without a public search API
//!
//! Find a Grave and Ancestry offer no public record search. They stay
//! configurable so deployments can list them, but a search always comes back
//! empty.

use super::{ProviderError, ProviderSession, SearchProvider, SearchQuery};
use crate::types::SearchStrategy;
use async_trait::async_trait;
use kinmatch_common::config::ToggleConfig;
use kinmatch_common::model::{CandidateRecord, Subject};
use tracing::info;

/// Placeholder provider that never issues requests
pub struct NoPublicApiProvider {
    id: &'static str,
    display_name: &'static str,
    enabled: bool,
}

impl NoPublicApiProvider {
    pub fn new(id: &'static str, display_name: &'static str, config: &ToggleConfig) -> Self {
        Self {
            id,
            display_name,
            enabled: config.enabled,
        }
    }

    pub fn findagrave(config: &ToggleConfig) -> Self {
        Self::new("findagrave", "Find a Grave", config)
    }

    pub fn ancestry(config: &ToggleConfig) -> Self {
        Self::new("ancestry", "Ancestry", config)
    }
}

#[async_trait]
impl SearchProvider for NoPublicApiProvider {
    fn id(&self) -> &'static str {
        self.id
    }

    fn display_name(&self) -> &'static str {
        self.display_name
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
        Ok(Vec::new())
    }

    async fn search(
        &self,
        _strategy: &SearchStrategy,
        subject: &Subject,
        _session: &ProviderSession,
    ) -> Result<Vec<CandidateRecord>, ProviderError> {
        info!(
            provider = self.id,
            subject = %subject.id,
            "{} has no public search API, returning no results",
            self.display_name
        );
        Ok(Vec::new())
    }
}
