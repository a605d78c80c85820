//! Chronicling America provider
//!
//! Library of Congress historic newspaper page search. Pages are not person
//! records, so a hit carries the searched name, the paper's city and state and
//! an OCR snippet around the first mention.
//!
//! API Documentation: https://chroniclingamerica.loc.gov/about/api/

use super::{
    clean, plan_queries, without_locations, ProviderError, ProviderSession, SearchLimits,
    SearchProvider, SearchQuery,
};
use crate::types::SearchStrategy;
use async_trait::async_trait;
use kinmatch_common::config::ChroniclingAmericaConfig;
use kinmatch_common::model::{CandidateRecord, RecordType, Subject};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const INITIAL_CONFIDENCE: f64 = 0.3;
/// Characters of OCR text kept either side of a mention
const SNIPPET_RADIUS: usize = 80;

#[derive(Debug, Deserialize)]
struct PageResults {
    /// Kept untyped so each page's full payload can be retained
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct PageItem {
    id: String,
    #[serde(default)]
    title: Option<String>,
    /// YYYYMMDD
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    city: Vec<String>,
    #[serde(default)]
    state: Vec<String>,
    #[serde(default)]
    ocr_eng: Option<String>,
}

/// Chronicling America provider
pub struct ChroniclingAmericaProvider {
    client: Client,
    base_url: String,
    rows: u32,
    enabled: bool,
}

impl ChroniclingAmericaProvider {
    pub fn new(client: Client, config: &ChroniclingAmericaConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rows: config.rows,
            enabled: config.enabled,
        }
    }
}

#[async_trait]
impl SearchProvider for ChroniclingAmericaProvider {
    fn id(&self) -> &'static str {
        "chronicling_america"
    }

    fn display_name(&self) -> &'static str {
        "Chronicling America"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Page search has no place filter, so location variants are dropped
    fn plan(
        &self,
        strategy: &SearchStrategy,
        subject: &Subject,
        limits: &SearchLimits,
    ) -> Vec<SearchQuery> {
        without_locations(plan_queries(strategy, subject, limits))
    }

    async fn search_query(
        &self,
        query: &SearchQuery,
        _subject: &Subject,
        session: &ProviderSession,
    ) -> Result<Vec<CandidateRecord>, ProviderError> {
        let name = query.full_name();
        if name.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/search/pages/results/", self.base_url);
        let mut params: Vec<(&str, String)> = vec![
            ("phrasetext", name.clone()),
            ("rows", self.rows.to_string()),
            ("format", "json".to_string()),
        ];
        if let Some(years) = query.years {
            params.push(("dateFilterType", "yearRange".to_string()));
            params.push(("date1", years.start.to_string()));
            params.push(("date2", years.end.to_string()));
        }

        let response = session.send(self.client.get(&url).query(&params)).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(status.as_u16(), body));
        }

        let results: PageResults = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        debug!(query = %name, pages = results.items.len(), "Chronicling America results");

        Ok(results
            .items
            .into_iter()
            .filter_map(|item| page_to_candidate(item, &name, &self.base_url))
            .collect())
    }
}

fn page_to_candidate(raw: Value, name: &str, base_url: &str) -> Option<CandidateRecord> {
    let item: PageItem = match serde_json::from_value(raw.clone()) {
        Ok(item) => item,
        Err(e) => {
            debug!(error = %e, "Skipping malformed newspaper page");
            return None;
        }
    };

    let mut candidate = CandidateRecord::new(item.id.clone(), "chronicling_america", name);
    candidate.record_type = RecordType::Newspaper;
    candidate.initial_confidence = INITIAL_CONFIDENCE;
    candidate.url = Some(format!("{}{}", base_url, item.id));

    let city = item.city.first().and_then(|c| clean(Some(c.as_str())));
    let state = item.state.first().and_then(|s| clean(Some(s.as_str())));
    candidate.location = match (city, state) {
        (Some(c), Some(s)) => Some(format!("{}, {}", c, s)),
        (c, s) => c.or(s),
    };

    let mut info = Vec::new();
    if let Some(title) = clean(item.title.as_deref()) {
        info.push(title);
    }
    if let Some(date) = item.date.as_deref().and_then(format_page_date) {
        info.push(date);
    }
    if let Some(snippet) = item.ocr_eng.as_deref().and_then(|ocr| snippet(ocr, name)) {
        info.push(format!("\"{}\"", snippet));
    }
    if !info.is_empty() {
        candidate.additional_info = Some(info.join(" - "));
    }
    candidate.raw = raw;

    Some(candidate)
}

/// "18500501" → "1850-05-01"
fn format_page_date(date: &str) -> Option<String> {
    let date = date.trim();
    if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}-{}-{}", &date[0..4], &date[4..6], &date[6..8]))
}

/// OCR text around the first mention of `name`, whitespace collapsed
fn snippet(ocr: &str, name: &str) -> Option<String> {
    let text = ocr.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }

    // ASCII lowercasing keeps byte offsets aligned with `text`
    let haystack = text.to_ascii_lowercase();
    let needle = name.to_ascii_lowercase();
    let hit = haystack.find(&needle).unwrap_or(0);

    let mut start = hit.saturating_sub(SNIPPET_RADIUS);
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (hit + needle.len() + SNIPPET_RADIUS).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }

    Some(text[start..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "totalItems": 1,
        "items": [{
            "id": "/lccn/sn83030214/1850-05-01/ed-1/seq-1/",
            "title": "New-York daily tribune.",
            "date": "18500501",
            "city": ["New York"],
            "state": ["New York"],
            "ocr_eng": "Notice.   Mr. John Smith of Albany\nhas removed to Boston."
        }]
    }"#;

    #[test]
    fn test_page_to_candidate() {
        let results: PageResults = serde_json::from_str(SAMPLE).unwrap();
        let c = page_to_candidate(
            results.items[0].clone(),
            "John Smith",
            "https://chroniclingamerica.loc.gov",
        )
        .unwrap();

        assert_eq!(c.name, "John Smith");
        assert_eq!(c.source, "chronicling_america");
        assert_eq!(c.record_type, RecordType::Newspaper);
        assert_eq!(c.location.as_deref(), Some("New York, New York"));
        assert_eq!(
            c.url.as_deref(),
            Some("https://chroniclingamerica.loc.gov/lccn/sn83030214/1850-05-01/ed-1/seq-1/")
        );
        let info = c.additional_info.unwrap();
        assert!(info.starts_with("New-York daily tribune. - 1850-05-01"));
        assert!(info.contains("Mr. John Smith of Albany has removed"));
        assert_eq!(c.raw, results.items[0]);
    }

    #[test]
    fn test_page_without_id_is_skipped() {
        let page = serde_json::json!({ "title": "The Sun" });
        assert!(page_to_candidate(page, "John Smith", "https://chroniclingamerica.loc.gov").is_none());
    }

    #[test]
    fn test_format_page_date() {
        assert_eq!(format_page_date("18500501").as_deref(), Some("1850-05-01"));
        assert_eq!(format_page_date("1850"), None);
    }

    #[test]
    fn test_snippet_without_mention_starts_at_beginning() {
        let s = snippet("The harvest was plentiful this year.", "Jane Doe").unwrap();
        assert!(s.starts_with("The harvest"));
    }

    #[test]
    fn test_snippet_handles_multibyte_text() {
        let ocr = format!("{} John Smith {}", "é".repeat(100), "ü".repeat(100));
        let s = snippet(&ocr, "John Smith").unwrap();
        assert!(s.contains("John Smith"));
    }
}
