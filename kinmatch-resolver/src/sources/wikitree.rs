//! WikiTree provider
//!
//! Public `searchPerson` action of the WikiTree API; no credentials needed,
//! only an application id. WikiTree encodes unknown date parts as zeros
//! ("1850-00-00"), which are trimmed before the date leaves this module.
//!
//! API Documentation: https://github.com/wikitree/wikitree-api

use super::{clean, ProviderError, ProviderSession, SearchProvider, SearchQuery};
use async_trait::async_trait;
use kinmatch_common::config::WikiTreeConfig;
use kinmatch_common::model::{CandidateFamily, CandidateRecord, RecordType, Subject};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

const FIELDS: &str = "Id,Name,FirstName,RealName,LastNameAtBirth,LastNameCurrent,\
BirthDate,DeathDate,BirthLocation,DeathLocation,Gender,Parents,Spouses";
const RESULT_LIMIT: &str = "20";
const PROFILE_URL: &str = "https://www.wikitree.com/wiki";
const BASE_CONFIDENCE: f64 = 0.5;

/// WikiTree provider
pub struct WikiTreeProvider {
    client: Client,
    base_url: String,
    app_id: String,
    enabled: bool,
}

impl WikiTreeProvider {
    pub fn new(client: Client, config: &WikiTreeConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            app_id: config.app_id.clone(),
            enabled: config.enabled,
        }
    }

    fn query_params(&self, query: &SearchQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("action", "searchPerson".to_string()),
            ("appId", self.app_id.clone()),
            ("fields", FIELDS.to_string()),
            ("limit", RESULT_LIMIT.to_string()),
        ];
        if !query.given.is_empty() {
            params.push(("FirstName", query.given.clone()));
        }
        if !query.family.is_empty() {
            params.push(("LastName", query.family.clone()));
        }
        if let Some(years) = query.years {
            let mid = (years.start + years.end) / 2;
            let spread = ((years.end - years.start) / 2).max(1);
            params.push(("BirthDate", format!("{}-01-01", mid)));
            params.push(("dateSpread", spread.to_string()));
            params.push(("dateInclude", "both".to_string()));
        }
        if let Some(location) = &query.location {
            params.push(("BirthLocation", location.clone()));
        }
        params
    }
}

#[async_trait]
impl SearchProvider for WikiTreeProvider {
    fn id(&self) -> &'static str {
        "wikitree"
    }

    fn display_name(&self) -> &'static str {
        "WikiTree"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn search_query(
        &self,
        query: &SearchQuery,
        _subject: &Subject,
        session: &ProviderSession,
    ) -> Result<Vec<CandidateRecord>, ProviderError> {
        let request = self.client.get(&self.base_url).query(&self.query_params(query));
        let response = session.send(request).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(status.as_u16(), body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        parse_matches(&body)
    }
}

/// Normalize a `searchPerson` response to candidates
fn parse_matches(body: &Value) -> Result<Vec<CandidateRecord>, ProviderError> {
    // The API wraps its payload in a one-element array
    let payload = match body {
        Value::Array(items) => items.first().unwrap_or(&Value::Null),
        other => other,
    };

    if let Some(status) = payload.get("status") {
        let ok = status.as_i64() == Some(0) || status.as_str().map(str::is_empty).unwrap_or(false);
        if !ok {
            return Err(ProviderError::Api(200, format!("WikiTree status {}", status)));
        }
    }

    let matches = match payload.get("matches") {
        Some(Value::Array(m)) => m,
        Some(Value::Null) | None => return Ok(Vec::new()),
        Some(_) => return Err(ProviderError::Parse("'matches' is not an array".to_string())),
    };

    let candidates: Vec<CandidateRecord> = matches.iter().filter_map(match_to_candidate).collect();
    debug!(matches = matches.len(), candidates = candidates.len(), "WikiTree results parsed");
    Ok(candidates)
}

fn match_to_candidate(m: &Value) -> Option<CandidateRecord> {
    let text = |key: &str| clean(m.get(key).and_then(Value::as_str));

    let wiki_id = text("Name").or_else(|| m.get("Id").map(|id| id.to_string()))?;
    let first = text("RealName").or_else(|| text("FirstName"))?;
    let birth_surname = text("LastNameAtBirth");
    let current_surname = text("LastNameCurrent");
    let family = birth_surname.clone().or_else(|| current_surname.clone())?;

    let mut candidate =
        CandidateRecord::new(wiki_id.clone(), "wikitree", format!("{} {}", first, family));
    candidate.birth_date = text("BirthDate").and_then(|d| trim_zero_date(&d));
    candidate.death_date = text("DeathDate").and_then(|d| trim_zero_date(&d));
    candidate.location = text("BirthLocation").or_else(|| text("DeathLocation"));
    candidate.url = Some(format!("{}/{}", PROFILE_URL, wiki_id));
    candidate.record_type = RecordType::FamilyTree;

    if let (Some(birth), Some(current)) = (&birth_surname, &current_surname) {
        if !birth.eq_ignore_ascii_case(current) {
            candidate.additional_info = Some(format!("Later known as {} {}", first, current));
        }
    }

    let present = [&candidate.birth_date, &candidate.death_date, &candidate.location]
        .iter()
        .filter(|v| v.is_some())
        .count();
    candidate.initial_confidence = (BASE_CONFIDENCE + 0.1 * present as f64).min(1.0);

    candidate.family = family_names(m);
    candidate.raw = m.clone();
    Some(candidate)
}

fn family_names(m: &Value) -> CandidateFamily {
    let person_name = |p: &Value| -> Option<String> {
        let first = clean(p.get("RealName").and_then(Value::as_str))
            .or_else(|| clean(p.get("FirstName").and_then(Value::as_str)))?;
        let last = clean(p.get("LastNameAtBirth").and_then(Value::as_str))
            .or_else(|| clean(p.get("LastNameCurrent").and_then(Value::as_str)))
            .unwrap_or_default();
        Some(format!("{} {}", first, last).trim().to_string())
    };

    let mut family = CandidateFamily::default();

    if let Some(Value::Object(parents)) = m.get("Parents") {
        for parent in parents.values() {
            let Some(name) = person_name(parent) else {
                continue;
            };
            match parent.get("Gender").and_then(Value::as_str) {
                Some("Male") => family.father = Some(name),
                Some("Female") => family.mother = Some(name),
                _ => {}
            }
        }
    }

    if let Some(Value::Object(spouses)) = m.get("Spouses") {
        family.spouses = spouses.values().filter_map(person_name).collect();
    }

    family
}

/// "1850-00-00" → "1850", "1850-05-00" → "1850-05", "0000-00-00" → None
fn trim_zero_date(date: &str) -> Option<String> {
    let parts: Vec<&str> = date.split('-').collect();
    let kept: Vec<&str> = parts
        .iter()
        .take_while(|p| p.chars().any(|c| c != '0'))
        .copied()
        .collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept.join("-"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trim_zero_date() {
        assert_eq!(trim_zero_date("1850-00-00").as_deref(), Some("1850"));
        assert_eq!(trim_zero_date("1850-05-00").as_deref(), Some("1850-05"));
        assert_eq!(trim_zero_date("1850-05-12").as_deref(), Some("1850-05-12"));
        assert_eq!(trim_zero_date("0000-00-00"), None);
    }

    #[test]
    fn test_parse_matches() {
        let body = json!([{
            "status": 0,
            "total": 1,
            "matches": [{
                "Id": 101,
                "Name": "Smith-101",
                "FirstName": "John",
                "LastNameAtBirth": "Smith",
                "LastNameCurrent": "Smith",
                "BirthDate": "1850-00-00",
                "DeathDate": "0000-00-00",
                "BirthLocation": "Boston, Massachusetts",
                "Parents": {
                    "90": {"FirstName": "William", "LastNameAtBirth": "Smith", "Gender": "Male"},
                    "91": {"FirstName": "Ann", "LastNameAtBirth": "Brown", "Gender": "Female"}
                },
                "Spouses": {
                    "120": {"FirstName": "Mary", "LastNameAtBirth": "Jones", "Gender": "Female"}
                }
            }]
        }]);

        let candidates = parse_matches(&body).unwrap();
        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.id, "Smith-101");
        assert_eq!(c.name, "John Smith");
        assert_eq!(c.birth_date.as_deref(), Some("1850"));
        assert_eq!(c.death_date, None);
        assert_eq!(c.url.as_deref(), Some("https://www.wikitree.com/wiki/Smith-101"));
        assert_eq!(c.family.father.as_deref(), Some("William Smith"));
        assert_eq!(c.family.mother.as_deref(), Some("Ann Brown"));
        assert_eq!(c.family.spouses, vec!["Mary Jones".to_string()]);
        assert!((c.initial_confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_married_name_noted() {
        let body = json!({"matches": [{
            "Name": "Jones-7", "FirstName": "Mary",
            "LastNameAtBirth": "Jones", "LastNameCurrent": "Smith"
        }]});
        let candidates = parse_matches(&body).unwrap();
        assert_eq!(candidates[0].name, "Mary Jones");
        assert_eq!(
            candidates[0].additional_info.as_deref(),
            Some("Later known as Mary Smith")
        );
    }

    #[test]
    fn test_error_status() {
        let body = json!([{"status": "Illegal action."}]);
        assert!(parse_matches(&body).is_err());
    }

    #[test]
    fn test_no_matches() {
        assert!(parse_matches(&json!([{"status": 0, "matches": []}])).unwrap().is_empty());
        assert!(parse_matches(&json!([{"status": 0}])).unwrap().is_empty());
    }
}
