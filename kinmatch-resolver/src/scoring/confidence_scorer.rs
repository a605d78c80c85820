//! Confidence Scorer
//!
//! Combines name, date, location, family-context and record-quality evidence
//! into one explainable score and an accept / review / reject decision.
//!
//! # Factors
//! | Factor | Weight | Missing data |
//! |--------|--------|--------------|
//! | Name match | 0.35 | n/a (names are required) |
//! | Date match | 0.25 | 0.3 |
//! | Location match | 0.20 | 0.4 |
//! | Family context | 0.15 | 0.5 |
//! | Record quality | 0.05 | n/a |
//!
//! # Thresholds
//! - Accept: ≥0.85
//! - Review: 0.60-0.85
//! - Reject: <0.60

use super::location::{location_similarity, normalize_place};
use crate::names::{
    extract_maiden_name, family_core, initials, normalize, soundex, split_display_name,
    MatchOptions, NameMatcher,
};
use crate::types::{
    ConfidenceResult, FactorScores, Recommendation, SearchStrategy, ACCEPT_THRESHOLD,
    REVIEW_THRESHOLD,
};
use kinmatch_common::dates::year_of;
use kinmatch_common::model::{CandidateRecord, PersonName, Subject};
use tracing::trace;

pub const MISSING_DATE_SCORE: f64 = 0.3;
pub const MISSING_LOCATION_SCORE: f64 = 0.4;
pub const NEUTRAL_FAMILY_SCORE: f64 = 0.5;
/// Floor for a candidate location the search strategy asked for
pub const CONTEXT_LOCATION_SCORE: f64 = 0.8;
const COMPLETENESS_BONUS: f64 = 0.05;

const LEVENSHTEIN_PART: f64 = 0.3;
const JARO_PART: f64 = 0.3;
const SOUNDEX_PART: f64 = 0.2;
const NICKNAME_PART: f64 = 0.15;
const INITIALS_PART: f64 = 0.05;

/// Search-time context that informs scoring
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchContext {
    pub name_variations: Vec<String>,
    pub location_variations: Vec<String>,
}

impl From<&SearchStrategy> for SearchContext {
    fn from(strategy: &SearchStrategy) -> Self {
        Self {
            name_variations: strategy.name_variations.clone(),
            location_variations: strategy.location_variations.clone(),
        }
    }
}

/// Step function over the absolute year difference
pub fn year_difference_score(diff: i32) -> f64 {
    match diff.abs() {
        0 => 1.0,
        1 => 0.95,
        2 => 0.90,
        3 => 0.85,
        4..=5 => 0.75,
        6..=10 => 0.60,
        11..=15 => 0.40,
        16..=20 => 0.20,
        _ => 0.10,
    }
}

/// Confidence Scorer
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    names: NameMatcher,
    /// Accept threshold (default 0.85)
    accept_threshold: f64,
    /// Review threshold (default 0.60)
    review_threshold: f64,
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new(NameMatcher::default())
    }
}

impl ConfidenceScorer {
    pub fn new(names: NameMatcher) -> Self {
        Self {
            names,
            accept_threshold: ACCEPT_THRESHOLD,
            review_threshold: REVIEW_THRESHOLD,
        }
    }

    /// Score one candidate against a subject
    ///
    /// # Arguments
    /// * `subject` - the known person
    /// * `candidate` - the externally discovered record
    /// * `context` - name and location variations the search used
    pub fn calculate_confidence(
        &self,
        subject: &Subject,
        candidate: &CandidateRecord,
        context: &SearchContext,
    ) -> ConfidenceResult {
        let mut factors = Vec::new();
        let mut concerns = Vec::new();

        let candidate_name = split_display_name(&candidate.name);

        let scores = FactorScores {
            name_match: self.name_score(&subject.person.name, &candidate_name, &mut factors, &mut concerns),
            date_match: self.date_score(subject, candidate, &mut factors, &mut concerns),
            location_match: self.location_score(subject, candidate, context, &mut factors, &mut concerns),
            family_context: self.family_score(subject, candidate, &mut factors, &mut concerns),
            record_quality: self.quality_score(candidate, &mut concerns),
        };

        let overall = scores.weighted_sum().clamp(0.0, 1.0);
        let recommendation = if overall >= self.accept_threshold {
            Recommendation::Accept
        } else if overall >= self.review_threshold {
            Recommendation::Review
        } else {
            Recommendation::Reject
        };

        trace!(
            candidate_id = %candidate.id,
            overall,
            name = scores.name_match,
            date = scores.date_match,
            location = scores.location_match,
            family = scores.family_context,
            quality = scores.record_quality,
            "Candidate scored"
        );

        ConfidenceResult {
            overall_confidence: overall,
            scores,
            recommendation,
            matching_factors: factors,
            concerns,
        }
    }

    fn name_score(
        &self,
        subject: &PersonName,
        candidate: &PersonName,
        factors: &mut Vec<String>,
        concerns: &mut Vec<String>,
    ) -> f64 {
        let mut families = vec![family_core(&subject.family)];
        if let Some(maiden) = extract_maiden_name(subject) {
            families.push(maiden);
        }

        let score = families
            .iter()
            .map(|family| self.name_components(&subject.given, family, candidate))
            .fold(0.0_f64, f64::max)
            .clamp(0.0, 1.0);

        if score >= 0.85 {
            factors.push(format!("Strong name match ({:.2})", score));
        } else if score >= 0.6 {
            factors.push(format!("Partial name match ({:.2})", score));
        } else {
            concerns.push(format!(
                "Name '{}' differs from '{}'",
                candidate.full(),
                subject.full()
            ));
        }
        score
    }

    fn name_components(&self, given: &str, family: &str, candidate: &PersonName) -> f64 {
        let subject_full = normalize(&format!("{} {}", given, family));
        let candidate_full = normalize(&candidate.full());
        if subject_full.is_empty() || candidate_full.is_empty() {
            return 0.0;
        }

        let lev = strsim::normalized_levenshtein(&subject_full, &candidate_full);
        let jaro = strsim::jaro(&subject_full, &candidate_full);

        let subject_given = first_token(given);
        let candidate_given = first_token(&candidate.given);
        let subject_family = normalize(family);
        let candidate_family = normalize(&candidate.family);

        let mut phonetic = 0.0;
        let same_code = |a: &str, b: &str| {
            let (sa, sb) = (soundex(a), soundex(b));
            !sa.is_empty() && sa == sb
        };
        if same_code(&subject_given, &candidate_given) {
            phonetic += 0.5;
        }
        if same_code(&subject_family, &candidate_family) {
            phonetic += 0.5;
        }

        let nickname = if !subject_given.is_empty()
            && (subject_given == candidate_given
                || self.names.tables().are_nicknames(&subject_given, &candidate_given))
        {
            1.0
        } else {
            0.0
        };

        let initials_hit = if initials(&subject_full) == initials(&candidate_full) {
            1.0
        } else {
            0.0
        };

        LEVENSHTEIN_PART * lev
            + JARO_PART * jaro
            + SOUNDEX_PART * phonetic
            + NICKNAME_PART * nickname
            + INITIALS_PART * initials_hit
    }

    fn date_score(
        &self,
        subject: &Subject,
        candidate: &CandidateRecord,
        factors: &mut Vec<String>,
        concerns: &mut Vec<String>,
    ) -> f64 {
        let birth = match (
            year_of(subject.person.birth.date_text()),
            year_of(candidate.birth_date.as_deref()),
        ) {
            (Some(s), Some(c)) => Some(s - c),
            _ => None,
        };
        let death = match (
            year_of(subject.person.death.date_text()),
            year_of(candidate.death_date.as_deref()),
        ) {
            (Some(s), Some(c)) => Some(s - c),
            _ => None,
        };

        if let Some(diff) = birth {
            match diff.abs() {
                0 => factors.push("Birth year matches exactly".to_string()),
                1..=3 => factors.push(format!("Birth year within {} years", diff.abs())),
                d if d > 10 => concerns.push(format!("Birth year differs by {} years", d)),
                _ => {}
            }
        }
        if let Some(diff) = death {
            if diff == 0 {
                factors.push("Death year matches exactly".to_string());
            } else if diff.abs() > 10 {
                concerns.push(format!("Death year differs by {} years", diff.abs()));
            }
        }

        match (birth, death) {
            (Some(b), Some(d)) => (year_difference_score(b) + year_difference_score(d)) / 2.0,
            (Some(b), None) => year_difference_score(b),
            (None, Some(d)) => year_difference_score(d),
            (None, None) => {
                concerns.push("No comparable dates".to_string());
                MISSING_DATE_SCORE
            }
        }
    }

    fn location_score(
        &self,
        subject: &Subject,
        candidate: &CandidateRecord,
        context: &SearchContext,
        factors: &mut Vec<String>,
        concerns: &mut Vec<String>,
    ) -> f64 {
        let Some(location) = candidate.location.as_deref().filter(|l| !l.trim().is_empty()) else {
            concerns.push("Candidate has no location".to_string());
            return MISSING_LOCATION_SCORE;
        };

        let places: Vec<&str> = [
            subject.person.birth.place_text(),
            subject.person.death.place_text(),
        ]
        .into_iter()
        .flatten()
        .collect();

        let mut score = places
            .iter()
            .map(|p| location_similarity(p, location))
            .fold(0.0_f64, f64::max);

        let normalized = normalize_place(location);
        let in_context = context
            .location_variations
            .iter()
            .any(|v| normalize_place(v) == normalized);
        if in_context {
            score = score.max(CONTEXT_LOCATION_SCORE);
        }

        if places.is_empty() && !in_context {
            concerns.push("Subject has no recorded places".to_string());
            return MISSING_LOCATION_SCORE;
        }

        if score >= 0.8 {
            factors.push(format!("Location '{}' matches", location));
        } else if score < 0.3 {
            concerns.push(format!("Location '{}' does not match", location));
        }
        score
    }

    fn family_score(
        &self,
        subject: &Subject,
        candidate: &CandidateRecord,
        factors: &mut Vec<String>,
        concerns: &mut Vec<String>,
    ) -> f64 {
        let options = MatchOptions::default();
        let mut pair_scores = Vec::new();

        let parents = [
            ("father", subject.family.father.as_ref(), candidate.family.father.as_deref()),
            ("mother", subject.family.mother.as_ref(), candidate.family.mother.as_deref()),
        ];
        for (role, known, reported) in parents {
            if let (Some(known), Some(reported)) = (known, reported) {
                let score = self
                    .names
                    .match_full_names(&known.name, &split_display_name(reported), &options)
                    .overall_score;
                if score >= 0.85 {
                    factors.push(format!("{} name matches", capitalize(role)));
                } else if score < 0.5 {
                    concerns.push(format!("{} name '{}' differs", capitalize(role), reported));
                }
                pair_scores.push(score);
            }
        }

        if !subject.family.spouses.is_empty() {
            for reported in &candidate.family.spouses {
                let reported_name = split_display_name(reported);
                let best = subject
                    .family
                    .spouses
                    .iter()
                    .map(|s| {
                        self.names
                            .match_full_names(&s.person.name, &reported_name, &options)
                            .overall_score
                    })
                    .fold(0.0_f64, f64::max);
                if best >= 0.85 {
                    factors.push(format!("Spouse '{}' matches", reported));
                }
                pair_scores.push(best);
            }
        }

        if pair_scores.is_empty() {
            NEUTRAL_FAMILY_SCORE
        } else {
            pair_scores.iter().sum::<f64>() / pair_scores.len() as f64
        }
    }

    fn quality_score(&self, candidate: &CandidateRecord, concerns: &mut Vec<String>) -> f64 {
        let reliability = candidate.record_type.reliability();
        if reliability <= 0.6 {
            concerns.push(format!(
                "{} records are less reliable",
                candidate.record_type.as_str().replace('_', " ")
            ));
        }

        let present = [
            candidate.birth_date.as_deref(),
            candidate.location.as_deref(),
            candidate.additional_info.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|v| !v.trim().is_empty())
        .count();

        (reliability + COMPLETENESS_BONUS * present as f64).min(1.0)
    }
}

fn first_token(name: &str) -> String {
    normalize(name)
        .split(' ')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinmatch_common::model::{FamilyContext, PersonRecord, RecordType};

    fn subject() -> Subject {
        Subject::new(
            "I1",
            PersonRecord::new("John", "Smith")
                .born(Some("1850"), Some("Boston, Massachusetts"))
                .died(Some("1910"), None),
        )
    }

    fn candidate(name: &str) -> CandidateRecord {
        let mut c = CandidateRecord::new("c1", "test", name);
        c.birth_date = Some("1850".to_string());
        c.death_date = Some("1910".to_string());
        c.location = Some("Boston, MA".to_string());
        c.record_type = RecordType::VitalRecord;
        c
    }

    #[test]
    fn test_year_difference_steps() {
        assert_eq!(year_difference_score(0), 1.0);
        assert_eq!(year_difference_score(-1), 0.95);
        assert_eq!(year_difference_score(3), 0.85);
        assert_eq!(year_difference_score(5), 0.75);
        assert_eq!(year_difference_score(10), 0.60);
        assert_eq!(year_difference_score(15), 0.40);
        assert_eq!(year_difference_score(20), 0.20);
        assert_eq!(year_difference_score(21), 0.10);
    }

    #[test]
    fn test_exact_candidate_scores_high() {
        let result = ConfidenceScorer::default().calculate_confidence(
            &subject(),
            &candidate("John Smith"),
            &SearchContext::default(),
        );
        assert!((result.scores.name_match - 1.0).abs() < 1e-9);
        assert_eq!(result.scores.date_match, 1.0);
        assert_eq!(result.scores.location_match, 1.0);
        assert_eq!(result.scores.family_context, NEUTRAL_FAMILY_SCORE);
        assert_eq!(result.scores.record_quality, 1.0);
        assert_eq!(result.recommendation, Recommendation::Accept);
    }

    #[test]
    fn test_overall_is_weighted_sum() {
        let result = ConfidenceScorer::default().calculate_confidence(
            &subject(),
            &candidate("Jon Smyth"),
            &SearchContext::default(),
        );
        assert!((result.overall_confidence - result.scores.weighted_sum()).abs() < 1e-12);
        assert!((0.0..=1.0).contains(&result.overall_confidence));
    }

    #[test]
    fn test_missing_data_defaults() {
        let mut c = CandidateRecord::new("c2", "test", "John Smith");
        c.record_type = RecordType::Other;
        let result =
            ConfidenceScorer::default().calculate_confidence(&subject(), &c, &SearchContext::default());
        assert_eq!(result.scores.date_match, MISSING_DATE_SCORE);
        assert_eq!(result.scores.location_match, MISSING_LOCATION_SCORE);
        assert_eq!(result.scores.record_quality, 0.5);
        assert!(!result.concerns.is_empty());
    }

    #[test]
    fn test_context_location_floor() {
        let mut c = candidate("John Smith");
        c.location = Some("Chelsea, Suffolk County".to_string());
        let context = SearchContext {
            name_variations: Vec::new(),
            location_variations: vec!["Chelsea, Suffolk County".to_string()],
        };
        let result = ConfidenceScorer::default().calculate_confidence(&subject(), &c, &context);
        assert!(result.scores.location_match >= CONTEXT_LOCATION_SCORE);
    }

    #[test]
    fn test_family_context_comparison() {
        let subject = subject().with_family(FamilyContext {
            father: Some(PersonRecord::new("William", "Smith")),
            ..Default::default()
        });
        let mut c = candidate("John Smith");
        c.family.father = Some("Bill Smith".to_string());
        let result =
            ConfidenceScorer::default().calculate_confidence(&subject, &c, &SearchContext::default());
        assert!(result.scores.family_context > 0.9);

        c.family.father = Some("Zebulon Quist".to_string());
        let result =
            ConfidenceScorer::default().calculate_confidence(&subject, &c, &SearchContext::default());
        assert!(result.scores.family_context < 0.5);
    }

    #[test]
    fn test_unrelated_candidate_rejected() {
        let mut c = CandidateRecord::new("c3", "test", "Maria Gonzalez");
        c.birth_date = Some("1790".to_string());
        c.location = Some("Seville, Spain".to_string());
        let result =
            ConfidenceScorer::default().calculate_confidence(&subject(), &c, &SearchContext::default());
        assert_eq!(result.recommendation, Recommendation::Reject);
    }
}
