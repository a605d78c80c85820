//! Placeholder and test-data detection
//!
//! Providers occasionally return seeded demo data ("Mock Cemetery", "John
//! Doe", lorem ipsum). Any hit in any candidate field forces a rejection
//! before the generative provider is consulted.

use kinmatch_common::model::CandidateRecord;
use once_cell::sync::Lazy;
use regex::Regex;

static BUILT_IN: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bmock\b",
        r"(?i)\bplaceholder\b",
        r"(?i)\blorem\s+ipsum\b",
        r"(?i)\b(john|jane)\s+doe\b",
        r"(?i)\b(test|sample|dummy|fake)\s+(person|record|data|cemetery|city|town|county|name|user)\b",
        r"(?i)\bexample\.(com|org|net)\b",
        r"(?i)\bunknown\s+unknown\b",
        r"(?i)\basdf\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Scans candidates for placeholder content
#[derive(Debug, Clone, Default)]
pub struct PlaceholderGuard {
    extra: Vec<Regex>,
}

impl PlaceholderGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add deployment-specific patterns on top of the built-in set
    pub fn with_patterns(mut self, patterns: Vec<Regex>) -> Self {
        self.extra.extend(patterns);
        self
    }

    /// `field: value` for every field that matched a pattern
    pub fn scan(&self, candidate: &CandidateRecord) -> Vec<String> {
        candidate
            .text_fields()
            .into_iter()
            .filter(|(_, value)| self.matches(value))
            .map(|(field, value)| format!("{}: {}", field, value))
            .collect()
    }

    pub fn matches(&self, text: &str) -> bool {
        BUILT_IN.iter().chain(self.extra.iter()).any(|re| re.is_match(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_location_is_flagged() {
        let mut candidate = CandidateRecord::new("c1", "findagrave", "John Smith");
        candidate.location = Some("Mock Cemetery, Mock City".to_string());
        let hits = PlaceholderGuard::new().scan(&candidate);
        assert_eq!(hits, vec!["location: Mock Cemetery, Mock City".to_string()]);
    }

    #[test]
    fn test_real_records_pass() {
        let mut candidate = CandidateRecord::new("KW7S-123", "familysearch", "Johann Mockler");
        candidate.location = Some("Testerton, Yorkshire, England".to_string());
        candidate.additional_info = Some("Sample taken from parish register".to_string());
        assert!(PlaceholderGuard::new().scan(&candidate).is_empty());
    }

    #[test]
    fn test_various_placeholders() {
        let guard = PlaceholderGuard::new();
        assert!(guard.matches("Jane Doe"));
        assert!(guard.matches("Lorem ipsum dolor sit amet"));
        assert!(guard.matches("Test Person"));
        assert!(guard.matches("https://example.com/person/1"));
        assert!(!guard.matches("Doe Run, Missouri"));
    }

    #[test]
    fn test_extra_patterns() {
        let guard = PlaceholderGuard::new().with_patterns(vec![Regex::new(r"(?i)zzz").unwrap()]);
        assert!(guard.matches("Zzzville"));
    }
}
