//! Data Quality Scorer
//!
//! Informational assessment of how complete and precise a person record is.
//! The score never affects validity; it feeds the validator's blended
//! confidence and the human-readable report.
//!
//! # Scoring Algorithm
//! `score = completeness × date_precision × source_reliability × issue_penalty`
//!
//! - **Completeness**: fraction of {name, birth date, birth place, death date,
//!   death place} present
//! - **Date precision**: mean precision factor over present dates
//!   (exact 1.0, month/year 0.9, year 0.8, circa 0.7, unparsable 0.5);
//!   1.0 when no dates are present
//! - **Source reliability**: mean reliability of cited record types;
//!   1.0 when nothing is cited
//! - **Issue penalty**: `max(0, 1 − 0.2·errors − 0.05·warnings)`

use crate::types::{QualityAssessment, QualityFactors, QualityRecommendation};
use kinmatch_common::dates::parse_partial_date;
use kinmatch_common::model::PersonRecord;
use tracing::trace;

const ERROR_PENALTY: f64 = 0.2;
const WARNING_PENALTY: f64 = 0.05;

/// Quality scorer for person records
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityScorer;

impl QualityScorer {
    pub fn new() -> Self {
        Self
    }

    /// Assess a person record
    ///
    /// # Arguments
    /// * `person` - record being assessed
    /// * `errors` - error-severity issues found by validation
    /// * `warnings` - warning-severity issues plus warning-list entries
    pub fn assess(&self, person: &PersonRecord, errors: usize, warnings: usize) -> QualityAssessment {
        let completeness = completeness(person);
        let date_precision = date_precision(person);
        let source_reliability = source_reliability(person);
        let issue_penalty =
            (1.0 - ERROR_PENALTY * errors as f64 - WARNING_PENALTY * warnings as f64).max(0.0);

        let score =
            (completeness * date_precision * source_reliability * issue_penalty).clamp(0.0, 1.0);

        trace!(
            completeness,
            date_precision,
            source_reliability,
            issue_penalty,
            score,
            "Quality assessed"
        );

        QualityAssessment {
            score,
            completeness,
            factors: QualityFactors {
                completeness,
                date_precision,
                source_reliability,
                issue_penalty,
            },
            recommendation: QualityRecommendation::from_score(score),
        }
    }
}

fn completeness(person: &PersonRecord) -> f64 {
    let present = [
        !person.name.is_empty(),
        person.birth.date_text().is_some(),
        person.birth.place_text().is_some(),
        person.death.date_text().is_some(),
        person.death.place_text().is_some(),
    ];
    present.iter().filter(|p| **p).count() as f64 / present.len() as f64
}

fn date_precision(person: &PersonRecord) -> f64 {
    let factors: Vec<f64> = [person.birth.date_text(), person.death.date_text()]
        .into_iter()
        .flatten()
        .filter_map(parse_partial_date)
        .map(|d| d.precision.quality_factor())
        .collect();

    if factors.is_empty() {
        1.0
    } else {
        factors.iter().sum::<f64>() / factors.len() as f64
    }
}

fn source_reliability(person: &PersonRecord) -> f64 {
    if person.sources.is_empty() {
        return 1.0;
    }
    person
        .sources
        .iter()
        .map(|s| s.record_type.reliability())
        .sum::<f64>()
        / person.sources.len() as f64
}
