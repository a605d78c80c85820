//! Place-name comparison
//!
//! Places are compared component by component after splitting on commas.
//! Components match exactly, through a known abbreviation ("MA" ↔
//! "Massachusetts", "Co." ↔ "County"), or partially by substring.

use deunicode::deunicode;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Score for a component that only matches as a substring
pub const SUBSTRING_SCORE: f64 = 0.7;

/// Whole-component aliases (US states, countries)
const COMPONENT_ALIASES: &[(&str, &str)] = &[
    ("al", "alabama"), ("ak", "alaska"), ("az", "arizona"), ("ar", "arkansas"),
    ("ca", "california"), ("co", "colorado"), ("ct", "connecticut"), ("de", "delaware"),
    ("dc", "district of columbia"), ("fl", "florida"), ("ga", "georgia"), ("hi", "hawaii"),
    ("id", "idaho"), ("il", "illinois"), ("in", "indiana"), ("ia", "iowa"),
    ("ks", "kansas"), ("ky", "kentucky"), ("la", "louisiana"), ("me", "maine"),
    ("md", "maryland"), ("ma", "massachusetts"), ("mass", "massachusetts"), ("mi", "michigan"),
    ("mn", "minnesota"), ("ms", "mississippi"), ("mo", "missouri"), ("mt", "montana"),
    ("ne", "nebraska"), ("nv", "nevada"), ("nh", "new hampshire"), ("nj", "new jersey"),
    ("nm", "new mexico"), ("ny", "new york"), ("nc", "north carolina"), ("nd", "north dakota"),
    ("oh", "ohio"), ("ok", "oklahoma"), ("or", "oregon"), ("pa", "pennsylvania"),
    ("penn", "pennsylvania"), ("ri", "rhode island"), ("sc", "south carolina"),
    ("sd", "south dakota"), ("tn", "tennessee"), ("tenn", "tennessee"), ("tx", "texas"),
    ("ut", "utah"), ("vt", "vermont"), ("va", "virginia"), ("wa", "washington"),
    ("wv", "west virginia"), ("wi", "wisconsin"), ("wis", "wisconsin"), ("wy", "wyoming"),
    ("us", "united states"), ("usa", "united states"),
    ("united states of america", "united states"), ("america", "united states"),
    ("uk", "united kingdom"), ("gb", "united kingdom"), ("great britain", "united kingdom"),
    ("deutschland", "germany"), ("eire", "ireland"),
];

/// Token-level abbreviations inside a component
const TOKEN_ALIASES: &[(&str, &str)] = &[
    ("co", "county"),
    ("cty", "county"),
    ("twp", "township"),
    ("st", "saint"),
    ("ste", "sainte"),
    ("mt", "mount"),
    ("ft", "fort"),
    ("pt", "point"),
    ("par", "parish"),
];

static COMPONENTS: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| COMPONENT_ALIASES.iter().copied().collect());
static TOKENS: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| TOKEN_ALIASES.iter().copied().collect());

/// Lowercase ASCII with punctuation other than commas removed
pub fn normalize_place(place: &str) -> String {
    let folded = deunicode(place).to_lowercase();
    let cleaned: String = folded
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == ',' || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned
        .split(',')
        .map(|part| part.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Component with abbreviations expanded
fn canonical_component(part: &str) -> String {
    if let Some(full) = COMPONENTS.get(part) {
        return full.to_string();
    }
    part.split(' ')
        .map(|t| TOKENS.get(t).copied().unwrap_or(t))
        .collect::<Vec<_>>()
        .join(" ")
}

fn component_score(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let ca = canonical_component(a);
    let cb = canonical_component(b);
    if ca == cb {
        1.0
    } else if ca.contains(cb.as_str()) || cb.contains(ca.as_str()) {
        SUBSTRING_SCORE
    } else {
        0.0
    }
}

/// Similarity of two free-text places, 0.0-1.0
///
/// Each component of the shorter place takes its best match in the other;
/// the sum is divided by the larger component count.
pub fn location_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_place(a);
    let b = normalize_place(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let parts_a: Vec<&str> = a.split(", ").collect();
    let parts_b: Vec<&str> = b.split(", ").collect();
    let (short, long) = if parts_a.len() <= parts_b.len() {
        (&parts_a, &parts_b)
    } else {
        (&parts_b, &parts_a)
    };

    let total: f64 = short
        .iter()
        .map(|p| {
            long.iter()
                .map(|q| component_score(p, q))
                .fold(0.0_f64, f64::max)
        })
        .sum();

    (total / long.len() as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert_eq!(location_similarity("Boston, Massachusetts", "boston, massachusetts"), 1.0);
    }

    #[test]
    fn test_abbreviation_equivalent() {
        assert_eq!(location_similarity("Boston, MA", "Boston, Massachusetts"), 1.0);
        assert_eq!(location_similarity("Cook Co., Illinois", "Cook County, IL"), 1.0);
    }

    #[test]
    fn test_partial_component_overlap() {
        let score = location_similarity("Boston, Suffolk, Massachusetts", "Boston, Massachusetts");
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_substring_component() {
        let score = location_similarity("South Boston", "Boston");
        assert!((score - SUBSTRING_SCORE).abs() < 1e-9);
    }

    #[test]
    fn test_unrelated_places() {
        assert_eq!(location_similarity("Cork, Ireland", "Boston, Massachusetts"), 0.0);
        assert_eq!(location_similarity("", "Boston"), 0.0);
    }
}
