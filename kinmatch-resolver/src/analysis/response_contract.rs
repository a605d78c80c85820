//! Structural validation of generative responses
//!
//! Models wrap JSON in prose or code fences often enough that parsing starts
//! from the outermost `{...}` span. A response is accepted only when every
//! required field is present with the right JSON type.

use super::generative::GenerativeError;
use crate::types::{AnalysisMethod, DateRange, Recommendation, SearchStrategy};
use kinmatch_common::model::RecordType;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

static YEAR_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})\D+(\d{4})").expect("valid regex"));
static SINGLE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})\b").expect("valid regex"));

const STRATEGY_FIELDS: [&str; 5] = [
    "nameVariations",
    "locationVariations",
    "dateRanges",
    "recordTypes",
    "searchTerms",
];

/// Parsed match-analysis response
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResponse {
    /// 0.0-1.0
    pub confidence: f64,
    pub reasoning: String,
    pub matching_factors: Vec<String>,
    pub concerns: Vec<String>,
    pub recommendation: Recommendation,
}

/// Outermost `{...}` span of `text`
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn parse_object(text: &str) -> Result<serde_json::Map<String, Value>, GenerativeError> {
    let span = extract_json_object(text)
        .ok_or_else(|| GenerativeError::Parse("no JSON object in response".to_string()))?;
    match serde_json::from_str::<Value>(span) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(GenerativeError::InvalidShape("response is not an object".to_string())),
        Err(e) => Err(GenerativeError::Parse(e.to_string())),
    }
}

fn require_array<'a>(
    map: &'a serde_json::Map<String, Value>,
    field: &str,
) -> Result<&'a Vec<Value>, GenerativeError> {
    match map.get(field) {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(GenerativeError::InvalidShape(format!("'{}' must be an array", field))),
        None => Err(GenerativeError::InvalidShape(format!("missing '{}'", field))),
    }
}

fn strings(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse and validate a search-strategy response
///
/// Requires all five arrays. Date ranges may be `{start, end}` objects or
/// "1845-1855" strings; unreadable entries are dropped, a numeric year that
/// does not fit a calendar year rejects the whole strategy.
pub fn parse_search_strategy(text: &str) -> Result<SearchStrategy, GenerativeError> {
    let map = parse_object(text)?;
    for field in STRATEGY_FIELDS {
        require_array(&map, field)?;
    }

    let name_variations = strings(require_array(&map, "nameVariations")?);
    if name_variations.is_empty() {
        return Err(GenerativeError::InvalidShape("'nameVariations' is empty".to_string()));
    }

    let mut record_types: Vec<RecordType> = Vec::new();
    for label in strings(require_array(&map, "recordTypes")?) {
        let record_type = RecordType::from_label(&label);
        if !record_types.contains(&record_type) {
            record_types.push(record_type);
        }
    }

    let mut date_ranges = Vec::new();
    for value in require_array(&map, "dateRanges")? {
        if let Some(range) = parse_date_range(value)? {
            date_ranges.push(range);
        }
    }

    Ok(SearchStrategy {
        name_variations,
        location_variations: strings(require_array(&map, "locationVariations")?),
        date_ranges,
        record_types,
        search_terms: strings(require_array(&map, "searchTerms")?),
        method: AnalysisMethod::Ai,
    })
}

/// Integral JSON year; `Err` when it overflows `i32`
fn numeric_year(n: &serde_json::Number) -> Result<Option<i32>, GenerativeError> {
    match n.as_i64() {
        Some(y) => i32::try_from(y)
            .map(Some)
            .map_err(|_| GenerativeError::InvalidShape(format!("year out of range: {}", y))),
        None if n.is_u64() => Err(GenerativeError::InvalidShape(format!("year out of range: {}", n))),
        None => Ok(None),
    }
}

fn parse_date_range(value: &Value) -> Result<Option<DateRange>, GenerativeError> {
    match value {
        Value::Object(range) => {
            let year = |keys: &[&str]| -> Result<Option<i32>, GenerativeError> {
                for key in keys {
                    let found = match range.get(*key) {
                        Some(Value::Number(n)) => numeric_year(n)?,
                        Some(Value::String(s)) => s.trim().get(..4).and_then(|y| y.parse().ok()),
                        _ => None,
                    };
                    if found.is_some() {
                        return Ok(found);
                    }
                }
                Ok(None)
            };
            let Some(start) = year(&["start", "from", "startYear"][..])? else {
                return Ok(None);
            };
            let end = year(&["end", "to", "endYear"][..])?.unwrap_or(start);
            Ok(Some(DateRange::new(start, end)))
        }
        Value::String(s) => {
            let range = if let Some(caps) = YEAR_SPAN.captures(s) {
                caps[1]
                    .parse()
                    .ok()
                    .zip(caps[2].parse().ok())
                    .map(|(start, end)| DateRange::new(start, end))
            } else {
                SINGLE_YEAR
                    .captures(s)
                    .and_then(|caps| caps[1].parse().ok())
                    .map(|year: i32| DateRange::new(year, year))
            };
            Ok(range)
        }
        Value::Number(n) => Ok(numeric_year(n)?.map(|y| DateRange::new(y, y))),
        _ => Ok(None),
    }
}

/// Smallest confidence read as a percentage
const PERCENT_THRESHOLD: f64 = 2.0;

/// Parse and validate a match-analysis response
///
/// Confidence of 2 or more is read as a percentage; values just above 1 are
/// clamped. An unrecognized recommendation falls back to thresholding the
/// confidence.
pub fn parse_match_analysis(text: &str) -> Result<AnalysisResponse, GenerativeError> {
    let map = parse_object(text)?;

    let raw_confidence = match map.get("confidence") {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| GenerativeError::InvalidShape("'confidence' is not finite".to_string()))?,
        Some(_) => {
            return Err(GenerativeError::InvalidShape("'confidence' must be a number".to_string()))
        }
        None => return Err(GenerativeError::InvalidShape("missing 'confidence'".to_string())),
    };
    if !raw_confidence.is_finite() || raw_confidence < 0.0 {
        return Err(GenerativeError::InvalidShape(format!(
            "'confidence' out of range: {}",
            raw_confidence
        )));
    }
    let confidence = if raw_confidence >= PERCENT_THRESHOLD {
        (raw_confidence / 100.0).min(1.0)
    } else {
        raw_confidence.min(1.0)
    };

    let reasoning = match map.get("reasoning") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(_) => return Err(GenerativeError::InvalidShape("'reasoning' must be a string".to_string())),
        None => return Err(GenerativeError::InvalidShape("missing 'reasoning'".to_string())),
    };

    let matching_factors = strings(require_array(&map, "matchingFactors")?);
    let concerns = strings(require_array(&map, "concerns")?);

    let recommendation = match map.get("recommendation") {
        Some(Value::String(s)) => {
            Recommendation::parse_lenient(s).unwrap_or_else(|| Recommendation::from_score(confidence))
        }
        Some(_) => {
            return Err(GenerativeError::InvalidShape(
                "'recommendation' must be a string".to_string(),
            ))
        }
        None => return Err(GenerativeError::InvalidShape("missing 'recommendation'".to_string())),
    };

    Ok(AnalysisResponse {
        confidence,
        reasoning,
        matching_factors,
        concerns,
        recommendation,
    })
}

/// JSON schema sent with search-strategy requests
pub fn search_strategy_schema() -> Value {
    let string_array = json!({"type": "array", "items": {"type": "string"}});
    json!({
        "type": "object",
        "required": STRATEGY_FIELDS,
        "properties": {
            "nameVariations": string_array,
            "locationVariations": string_array,
            "dateRanges": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["start", "end"],
                    "properties": {
                        "start": {"type": "integer"},
                        "end": {"type": "integer"}
                    }
                }
            },
            "recordTypes": string_array,
            "searchTerms": string_array
        }
    })
}

/// JSON schema sent with match-analysis requests
pub fn match_analysis_schema() -> Value {
    let string_array = json!({"type": "array", "items": {"type": "string"}});
    json!({
        "type": "object",
        "required": ["confidence", "reasoning", "matchingFactors", "concerns", "recommendation"],
        "properties": {
            "confidence": {"type": "number", "minimum": 0, "maximum": 1},
            "reasoning": {"type": "string"},
            "matchingFactors": string_array,
            "concerns": string_array,
            "recommendation": {"type": "string", "enum": ["accept", "review", "reject"]}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_prose() {
        let text = "Here you go:\n```json\n{\"a\": {\"b\": 1}}\n```\nThanks";
        assert_eq!(extract_json_object(text), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(extract_json_object("no json"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn test_parse_strategy() {
        let text = r#"{
            "nameVariations": ["John Smith", "Jon Smyth", ""],
            "locationVariations": ["Boston, MA"],
            "dateRanges": [{"start": 1845, "end": 1855}, "1870-1880", {"from": "1900"}],
            "recordTypes": ["census", "Birth records", "census"],
            "searchTerms": ["John Smith 1850"]
        }"#;
        let strategy = parse_search_strategy(text).unwrap();
        assert_eq!(strategy.name_variations, vec!["John Smith", "Jon Smyth"]);
        assert_eq!(
            strategy.date_ranges,
            vec![
                DateRange::new(1845, 1855),
                DateRange::new(1870, 1880),
                DateRange::new(1900, 1900)
            ]
        );
        assert_eq!(strategy.record_types, vec![RecordType::Census, RecordType::VitalRecord]);
        assert_eq!(strategy.method, AnalysisMethod::Ai);
    }

    #[test]
    fn test_strategy_missing_array_is_invalid() {
        let text = r#"{"nameVariations": ["John"], "locationVariations": [], "dateRanges": [], "recordTypes": []}"#;
        assert!(matches!(
            parse_search_strategy(text),
            Err(GenerativeError::InvalidShape(_))
        ));
    }

    #[test]
    fn test_parse_analysis() {
        let text = r#"Sure. {"confidence": 82, "reasoning": "Names and dates agree",
            "matchingFactors": ["Exact birth year"], "concerns": [],
            "recommendation": "Likely match - review"}"#;
        let analysis = parse_match_analysis(text).unwrap();
        assert!((analysis.confidence - 0.82).abs() < 1e-9);
        assert_eq!(analysis.recommendation, Recommendation::Review);
        assert_eq!(analysis.matching_factors, vec!["Exact birth year"]);
    }

    #[test]
    fn test_confidence_just_above_one_is_clamped() {
        let reply = |c: &str| {
            format!(
                r#"{{"confidence": {}, "reasoning": "", "matchingFactors": [], "concerns": [], "recommendation": "accept"}}"#,
                c
            )
        };
        assert_eq!(parse_match_analysis(&reply("1.2")).unwrap().confidence, 1.0);
        assert_eq!(parse_match_analysis(&reply("1")).unwrap().confidence, 1.0);
        assert!((parse_match_analysis(&reply("2")).unwrap().confidence - 0.02).abs() < 1e-9);
        assert_eq!(parse_match_analysis(&reply("150")).unwrap().confidence, 1.0);
    }

    #[test]
    fn test_overflowing_year_rejects_strategy() {
        let text = r#"{
            "nameVariations": ["John Smith"],
            "locationVariations": [],
            "dateRanges": [{"start": 1845, "end": 4294968146}],
            "recordTypes": [],
            "searchTerms": []
        }"#;
        assert!(matches!(
            parse_search_strategy(text),
            Err(GenerativeError::InvalidShape(_))
        ));

        let text = text.replace("{\"start\": 1845, \"end\": 4294968146}", "18446744073709551615");
        assert!(parse_search_strategy(&text).is_err());
    }

    #[test]
    fn test_analysis_wrong_types_are_invalid() {
        let text = r#"{"confidence": "high", "reasoning": "", "matchingFactors": [], "concerns": [], "recommendation": "accept"}"#;
        assert!(parse_match_analysis(text).is_err());

        let text = r#"{"confidence": 0.9, "reasoning": "ok", "matchingFactors": "names", "concerns": [], "recommendation": "accept"}"#;
        assert!(parse_match_analysis(text).is_err());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        assert!(matches!(
            parse_match_analysis("{not json at all}"),
            Err(GenerativeError::Parse(_))
        ));
    }

    #[test]
    fn test_unknown_recommendation_uses_threshold() {
        let text = r#"{"confidence": 0.9, "reasoning": "", "matchingFactors": [], "concerns": [], "recommendation": "hmm"}"#;
        assert_eq!(parse_match_analysis(text).unwrap().recommendation, Recommendation::Accept);
    }
}
