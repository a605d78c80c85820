//! FamilySearch tree search provider
//!
//! Authenticates with an `unauthenticated_session` OAuth grant (client id
//! only), then queries `/platform/tree/search`. Results arrive as GedcomX
//! atom JSON: one entry per match, each carrying the matched person plus
//! relatives and relationships.
//!
//! API Documentation: https://www.familysearch.org/developers/docs/api/

use super::token::TokenCache;
use super::{clean, ProviderError, ProviderSession, SearchProvider, SearchQuery};
use async_trait::async_trait;
use kinmatch_common::config::FamilySearchConfig;
use kinmatch_common::model::{CandidateFamily, CandidateRecord, RecordType, Subject};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

const GEDCOMX_ATOM: &str = "application/x-gedcomx-atom+json";
const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;
const RESULT_COUNT: &str = "20";
/// FamilySearch match scores top out around this value
const MAX_SCORE: f64 = 5.0;
const PERSON_URL: &str = "https://www.familysearch.org/tree/person/details";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    /// Kept untyped so each entry's full payload can be retained
    #[serde(default)]
    entries: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: String,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    gedcomx: Option<Gedcomx>,
}

#[derive(Debug, Default, Deserialize)]
struct Gedcomx {
    #[serde(default)]
    persons: Vec<Person>,
    #[serde(default)]
    relationships: Vec<Relationship>,
}

#[derive(Debug, Deserialize)]
struct Person {
    id: String,
    #[serde(default)]
    display: Option<Display>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Display {
    name: Option<String>,
    gender: Option<String>,
    birth_date: Option<String>,
    birth_place: Option<String>,
    death_date: Option<String>,
    death_place: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Relationship {
    #[serde(rename = "type", default)]
    relationship_type: String,
    person1: Option<ResourceRef>,
    person2: Option<ResourceRef>,
}

#[derive(Debug, Deserialize)]
struct ResourceRef {
    #[serde(rename = "resourceId")]
    resource_id: Option<String>,
}

impl Relationship {
    fn ids(&self) -> (Option<&str>, Option<&str>) {
        (
            self.person1.as_ref().and_then(|p| p.resource_id.as_deref()),
            self.person2.as_ref().and_then(|p| p.resource_id.as_deref()),
        )
    }
}

/// FamilySearch provider
pub struct FamilySearchProvider {
    client: Client,
    base_url: String,
    auth_url: String,
    client_id: Option<String>,
    enabled: bool,
    tokens: TokenCache,
}

impl FamilySearchProvider {
    /// # Arguments
    /// * `client` - shared HTTP client
    /// * `config` - `[providers.familysearch]` section
    /// * `client_id` - resolved client id (environment or TOML)
    pub fn new(client: Client, config: &FamilySearchConfig, client_id: Option<String>) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_url: config.auth_url.clone(),
            client_id,
            enabled: config.enabled,
            tokens: TokenCache::new(),
        }
    }

    /// Drop the cached access token
    pub async fn invalidate_token(&self) {
        self.tokens.invalidate().await;
    }

    fn query_params(query: &SearchQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![("count", RESULT_COUNT.to_string())];
        if !query.given.is_empty() {
            params.push(("q.givenName", query.given.clone()));
        }
        if !query.family.is_empty() {
            params.push(("q.surname", query.family.clone()));
        }
        if let Some(years) = query.years {
            params.push(("q.birthLikeDate.from", years.start.to_string()));
            params.push(("q.birthLikeDate.to", years.end.to_string()));
        }
        if let Some(location) = &query.location {
            params.push(("q.anyPlace", location.clone()));
        }
        params
    }
}

#[async_trait]
impl SearchProvider for FamilySearchProvider {
    fn id(&self) -> &'static str {
        "familysearch"
    }

    fn display_name(&self) -> &'static str {
        "FamilySearch"
    }

    fn is_enabled(&self) -> bool {
        self.enabled && self.client_id.is_some()
    }

    async fn authenticate(&self, session: &ProviderSession) -> Result<Option<String>, ProviderError> {
        if let Some(token) = self.tokens.get().await {
            return Ok(Some(token));
        }

        let client_id = self
            .client_id
            .as_deref()
            .ok_or_else(|| ProviderError::Disabled("no FamilySearch client id configured".to_string()))?;

        debug!(url = %self.auth_url, "Requesting FamilySearch session token");

        let request = self
            .client
            .post(&self.auth_url)
            .header(ACCEPT, "application/json")
            .form(&[
                ("grant_type", "unauthenticated_session"),
                ("client_id", client_id),
                ("ip_address", "127.0.0.1"),
            ]);
        let response = session.send(request).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Auth(format!("token request returned {}: {}", status, body)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let ttl = Duration::from_secs(token.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS));
        self.tokens.store(token.access_token.clone(), ttl).await;
        info!("FamilySearch session token acquired");

        Ok(Some(token.access_token))
    }

    async fn search_query(
        &self,
        query: &SearchQuery,
        _subject: &Subject,
        session: &ProviderSession,
    ) -> Result<Vec<CandidateRecord>, ProviderError> {
        let token = self
            .authenticate(session)
            .await?
            .ok_or_else(|| ProviderError::Auth("no access token".to_string()))?;

        let request = self
            .client
            .get(format!("{}/platform/tree/search", self.base_url))
            .header(ACCEPT, GEDCOMX_ATOM)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .query(&Self::query_params(query));
        let response = session.send(request).await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                self.tokens.invalidate().await;
                return Err(ProviderError::Auth("access token rejected".to_string()));
            }
            StatusCode::NO_CONTENT => return Ok(Vec::new()),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::Api(status.as_u16(), body));
            }
            _ => {}
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(body.entries.into_iter().filter_map(entry_to_candidate).collect())
    }
}

fn entry_to_candidate(raw: Value) -> Option<CandidateRecord> {
    let entry: Entry = match serde_json::from_value(raw.clone()) {
        Ok(entry) => entry,
        Err(e) => {
            debug!(error = %e, "Skipping malformed FamilySearch entry");
            return None;
        }
    };
    let gedcomx = entry.content.as_ref()?.gedcomx.as_ref()?;
    let primary = gedcomx
        .persons
        .iter()
        .find(|p| p.id == entry.id)
        .or_else(|| gedcomx.persons.first())?;
    let display = primary.display.as_ref()?;
    let name = clean(display.name.as_deref())?;

    let mut candidate = CandidateRecord::new(primary.id.clone(), "familysearch", name);
    candidate.birth_date = clean(display.birth_date.as_deref());
    candidate.death_date = clean(display.death_date.as_deref());
    candidate.location =
        clean(display.birth_place.as_deref()).or_else(|| clean(display.death_place.as_deref()));
    candidate.url = Some(format!("{}/{}", PERSON_URL, primary.id));
    candidate.record_type = RecordType::FamilyTree;
    candidate.initial_confidence = entry
        .score
        .map(|s| (s / MAX_SCORE).clamp(0.0, 1.0))
        .unwrap_or(0.5);
    candidate.family = relatives(gedcomx, &primary.id);
    if let Some(place) = clean(display.death_place.as_deref()) {
        candidate.additional_info = Some(format!("Died in {}", place));
    }
    candidate.raw = raw;

    Some(candidate)
}

fn relatives(gedcomx: &Gedcomx, primary_id: &str) -> CandidateFamily {
    let name_of = |id: &str| -> Option<(String, Option<String>)> {
        let person = gedcomx.persons.iter().find(|p| p.id == id)?;
        let display = person.display.as_ref()?;
        Some((clean(display.name.as_deref())?, display.gender.clone()))
    };

    let mut family = CandidateFamily::default();
    for rel in &gedcomx.relationships {
        let (p1, p2) = rel.ids();
        if rel.relationship_type.ends_with("ParentChild") && p2 == Some(primary_id) {
            if let Some((name, gender)) = p1.and_then(name_of) {
                match gender.as_deref().map(str::to_lowercase).as_deref() {
                    Some("male") => family.father = Some(name),
                    Some("female") => family.mother = Some(name),
                    _ => {}
                }
            }
        } else if rel.relationship_type.ends_with("Couple") {
            let other = if p1 == Some(primary_id) {
                p2
            } else if p2 == Some(primary_id) {
                p1
            } else {
                None
            };
            if let Some((name, _)) = other.and_then(name_of) {
                family.spouses.push(name);
            }
        }
    }
    family
}
