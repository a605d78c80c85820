//! Fuzzy personal-name matching
//!
//! [`NameMatcher`] scores two names in 0.0-1.0 by taking the maximum of
//! several independent signals:
//!
//! | Signal | Score |
//! |--------|-------|
//! | exact (after normalization) | 1.00 |
//! | nickname (either direction) | 0.90 |
//! | spelling substitution | 0.88 |
//! | cultural / immigration variant | 0.85 |
//! | Soundex equality | 0.80 |
//! | Soundex 3-char prefix | 0.70 |
//! | normalized Levenshtein | ratio |
//!
//! Normalization folds diacritics, lowercases, strips titles and
//! generational suffixes, drops punctuation other than hyphen and
//! apostrophe and collapses whitespace.

pub mod phonetic;
pub mod tables;

pub use phonetic::soundex;
pub use tables::NameTables;

use crate::types::FullNameMatch;
use kinmatch_common::model::PersonName;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const NICKNAME_SCORE: f64 = 0.90;
pub const SPELLING_SCORE: f64 = 0.88;
pub const CULTURAL_SCORE: f64 = 0.85;
pub const SOUNDEX_SCORE: f64 = 0.80;
pub const SOUNDEX_PREFIX_SCORE: f64 = 0.70;
/// Multiplier applied when only the first given-name token is compared
pub const FIRST_TOKEN_FACTOR: f64 = 0.95;

const GIVEN_WEIGHT: f64 = 0.6;
const FAMILY_WEIGHT: f64 = 0.4;

const TITLES: &[&str] = &[
    "mr", "mrs", "ms", "miss", "dr", "rev", "sir", "lady", "lord", "capt", "col", "gen", "lt",
    "sgt", "maj", "prof", "hon", "mme", "mlle", "herr", "frau",
];
const SUFFIXES: &[&str] = &["jr", "sr", "ii", "iii", "iv", "esq"];

static MAIDEN_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:n[ée]e|born|formerly)\s+([\p{L}'\-]+)").expect("valid regex")
});
static MAIDEN_PAREN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*([^)]+?)\s*\)").expect("valid regex"));
static GEDCOM_SURNAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)/([^/]*)/(.*)$").expect("valid regex"));

/// Heuristic toggles for [`NameMatcher::match_names`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    pub nicknames: bool,
    pub cultural: bool,
    pub spelling: bool,
    pub phonetic: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            nicknames: true,
            cultural: true,
            spelling: true,
            phonetic: true,
        }
    }
}

impl MatchOptions {
    /// Edit distance only
    pub fn strict() -> Self {
        Self {
            nicknames: false,
            cultural: false,
            spelling: false,
            phonetic: false,
        }
    }
}

/// Variants derived from one name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameVariantSet {
    pub original: String,
    pub normalized: String,
    pub nicknames: Vec<String>,
    pub cultural: Vec<String>,
    pub spelling: Vec<String>,
    /// Soundex of the normalized name
    pub phonetic: String,
}

impl NameVariantSet {
    /// All variant strings, title-cased, nickname forms first, no duplicates
    pub fn all(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for v in self
            .nicknames
            .iter()
            .chain(self.cultural.iter())
            .chain(self.spelling.iter())
        {
            let v = title_case(v);
            if !out.contains(&v) {
                out.push(v);
            }
        }
        out
    }
}

/// Name matcher over pluggable reference tables
#[derive(Debug, Clone, Default)]
pub struct NameMatcher {
    tables: Arc<NameTables>,
}

impl NameMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tables(tables: NameTables) -> Self {
        Self {
            tables: Arc::new(tables),
        }
    }

    pub fn tables(&self) -> &NameTables {
        &self.tables
    }

    /// Similarity of two single names (given or family), 0.0-1.0
    ///
    /// Empty input on either side scores 0.
    pub fn match_names(&self, a: &str, b: &str, options: &MatchOptions) -> f64 {
        let a = normalize(a);
        let b = normalize(b);
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        if a == b {
            return 1.0;
        }

        let mut score = self.compare(&a, &b, options);

        let first_a = a.split(' ').next().unwrap_or(a.as_str());
        let first_b = b.split(' ').next().unwrap_or(b.as_str());
        if (first_a != a || first_b != b) && !first_a.is_empty() && !first_b.is_empty() {
            let first = if first_a == first_b {
                1.0
            } else {
                self.compare(first_a, first_b, options)
            };
            score = score.max(first * FIRST_TOKEN_FACTOR);
        }

        score.clamp(0.0, 1.0)
    }

    /// Compare two structured names
    ///
    /// Overall = 0.6 × given + 0.4 × max(family, maiden). The maiden score is
    /// the best cross comparison involving either side's maiden name.
    pub fn match_full_names(
        &self,
        a: &PersonName,
        b: &PersonName,
        options: &MatchOptions,
    ) -> FullNameMatch {
        let mut details = Vec::new();

        if a.is_empty() || b.is_empty() {
            details.push("one of the names is empty".to_string());
            return FullNameMatch {
                overall_score: 0.0,
                given_name_score: 0.0,
                family_name_score: 0.0,
                maiden_name_score: 0.0,
                details,
            };
        }

        let given = self.match_names(&a.given, &b.given, options);
        let family_a = family_core(&a.family);
        let family_b = family_core(&b.family);
        let family = self.match_names(&family_a, &family_b, options);

        let maiden_a = extract_maiden_name(a);
        let maiden_b = extract_maiden_name(b);
        let mut maiden = 0.0_f64;
        if let Some(m) = &maiden_a {
            maiden = maiden.max(self.match_names(m, &family_b, options));
        }
        if let Some(m) = &maiden_b {
            maiden = maiden.max(self.match_names(&family_a, m, options));
        }
        if let (Some(ma), Some(mb)) = (&maiden_a, &maiden_b) {
            maiden = maiden.max(self.match_names(ma, mb, options));
        }

        details.push(format!("given names: {:.2}", given));
        details.push(format!("family names: {:.2}", family));
        if maiden > 0.0 {
            details.push(format!("maiden name: {:.2}", maiden));
        }
        if given < 1.0 && given >= CULTURAL_SCORE {
            details.push(format!("'{}' and '{}' are known variants", a.given.trim(), b.given.trim()));
        }

        let overall = GIVEN_WEIGHT * given + FAMILY_WEIGHT * family.max(maiden);

        FullNameMatch {
            overall_score: overall.clamp(0.0, 1.0),
            given_name_score: given,
            family_name_score: family,
            maiden_name_score: maiden,
            details,
        }
    }

    /// Derive nickname, cultural, spelling and phonetic variants of a name
    ///
    /// Multi-token names vary one token at a time.
    pub fn generate_variants(&self, name: &str) -> NameVariantSet {
        let normalized = normalize(name);
        let tokens: Vec<&str> = normalized.split(' ').filter(|t| !t.is_empty()).collect();

        let per_token = |f: &dyn Fn(&str) -> Vec<String>| -> Vec<String> {
            let mut out: Vec<String> = Vec::new();
            for (i, token) in tokens.iter().enumerate() {
                for variant in f(token) {
                    let mut replaced: Vec<&str> = tokens.clone();
                    replaced[i] = &variant;
                    let joined = replaced.join(" ");
                    if joined != normalized && !out.contains(&joined) {
                        out.push(joined);
                    }
                }
            }
            out
        };

        NameVariantSet {
            original: name.to_string(),
            nicknames: per_token(&|t: &str| self.tables.nickname_variants(t)),
            cultural: per_token(&|t: &str| self.tables.cultural_variants(t)),
            spelling: per_token(&|t: &str| self.tables.spelling_variants(t)),
            phonetic: soundex(&normalized),
            normalized,
        }
    }

    fn compare(&self, a: &str, b: &str, options: &MatchOptions) -> f64 {
        let mut score = strsim::normalized_levenshtein(a, b);

        if options.nicknames && self.tables.are_nicknames(a, b) {
            score = score.max(NICKNAME_SCORE);
        }
        if options.spelling && self.tables.are_spelling_variants(a, b) {
            score = score.max(SPELLING_SCORE);
        }
        if options.cultural && self.tables.are_cultural_variants(a, b) {
            score = score.max(CULTURAL_SCORE);
        }
        if options.phonetic {
            let sa = soundex(a);
            let sb = soundex(b);
            if !sa.is_empty() && !sb.is_empty() {
                if sa == sb {
                    score = score.max(SOUNDEX_SCORE);
                } else if sa[..3] == sb[..3] {
                    score = score.max(SOUNDEX_PREFIX_SCORE);
                }
            }
        }

        score
    }
}

/// Normalize a name for comparison
pub fn normalize(name: &str) -> String {
    let folded = deunicode::deunicode(name).to_lowercase();
    let cleaned: String = folded
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '\'' {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|t| !TITLES.contains(t) && !SUFFIXES.contains(t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Maiden name from the explicit field, a "née / born / formerly X" phrase
/// in the family name, or a parenthetical suffix
pub fn extract_maiden_name(name: &PersonName) -> Option<String> {
    if let Some(m) = name.maiden.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        return Some(m.to_string());
    }
    if let Some(caps) = MAIDEN_PHRASE.captures(&name.family) {
        return Some(caps[1].to_string());
    }
    MAIDEN_PAREN
        .captures(&name.family)
        .map(|caps| caps[1].to_string())
        .filter(|m| !m.trim().is_empty())
}

/// Family name with any embedded maiden phrase or parenthetical removed
pub fn family_core(family: &str) -> String {
    let without_phrase = MAIDEN_PHRASE.replace_all(family, " ");
    let without_paren = MAIDEN_PAREN.replace_all(&without_phrase, " ");
    without_paren.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a provider display name into given and family parts
///
/// Accepts "Family, Given", GEDCOM "Given /Family/" and "Given Family".
/// A single token is treated as a given name.
pub fn split_display_name(display: &str) -> PersonName {
    let display = display.trim();

    if let Some(caps) = GEDCOM_SURNAME.captures(display) {
        let given = format!("{} {}", caps[1].trim(), caps[3].trim());
        return PersonName::new(given.trim(), caps[2].trim());
    }

    if let Some((family, given)) = display.split_once(',') {
        return PersonName::new(given.trim(), family.trim());
    }

    let tokens: Vec<&str> = display.split_whitespace().collect();
    // Keep generational suffixes out of the family slot
    let core_len = tokens
        .iter()
        .rposition(|t| !SUFFIXES.contains(&t.trim_end_matches('.').to_lowercase().as_str()))
        .map(|i| i + 1)
        .unwrap_or(tokens.len());

    match core_len {
        0 => PersonName::default(),
        1 => PersonName::new(tokens[0], ""),
        n => PersonName::new(tokens[..n - 1].join(" "), tokens[n - 1]),
    }
}

/// Initials of a name's tokens, e.g. "john paul" → "jp"
pub fn initials(name: &str) -> String {
    normalize(name)
        .split(' ')
        .filter_map(|t| t.chars().next())
        .collect()
}

fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = true;
    for c in name.chars() {
        if upper_next {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        upper_next = c == ' ' || c == '-';
    }
    out
}
