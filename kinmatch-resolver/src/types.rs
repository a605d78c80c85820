//! Core result types shared by the matching components
//!
//! - **ValidationResult**: RecordValidator output
//! - **ConfidenceResult**: ConfidenceScorer output
//! - **SearchStrategy**: search-query plan fed to the SourceAggregator
//! - **MatchAnalysis**: MatchAnalysisOrchestrator output
//!
//! All scores are `f64` in 0.0-1.0.

use kinmatch_common::model::RecordType;
use serde::{Deserialize, Serialize};

// ============================================================================
// Recommendations
// ============================================================================

/// Score at or above which a candidate is accepted
pub const ACCEPT_THRESHOLD: f64 = 0.85;
/// Score at or above which a candidate goes to human review
pub const REVIEW_THRESHOLD: f64 = 0.60;

/// Accept / review / reject decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Accept,
    Review,
    Reject,
}

impl Recommendation {
    /// Threshold a score: ≥0.85 accept, ≥0.60 review, else reject
    pub fn from_score(score: f64) -> Self {
        if score >= ACCEPT_THRESHOLD {
            Recommendation::Accept
        } else if score >= REVIEW_THRESHOLD {
            Recommendation::Review
        } else {
            Recommendation::Reject
        }
    }

    /// Lenient parse of free-text recommendations ("likely match", "REJECT", ...)
    pub fn parse_lenient(text: &str) -> Option<Self> {
        let text = text.trim().to_lowercase();
        if text.contains("reject") || text.contains("no match") || text.contains("not a match") {
            Some(Recommendation::Reject)
        } else if text.contains("review") || text.contains("possible") || text.contains("uncertain") {
            Some(Recommendation::Review)
        } else if text.contains("accept") || text.contains("match") || text.contains("confirm") {
            Some(Recommendation::Accept)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Accept => "accept",
            Recommendation::Review => "review",
            Recommendation::Reject => "reject",
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Single plausibility finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Machine-readable issue code, e.g. "parent_too_young"
    #[serde(rename = "type")]
    pub issue_type: String,
    pub severity: Severity,
    pub message: String,
}

impl ValidationIssue {
    pub fn error(issue_type: &str, message: impl Into<String>) -> Self {
        Self {
            issue_type: issue_type.to_string(),
            severity: Severity::Error,
            message: message.into(),
        }
    }

    pub fn warning(issue_type: &str, message: impl Into<String>) -> Self {
        Self {
            issue_type: issue_type.to_string(),
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// Coarse data-quality verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityRecommendation {
    HighQuality,
    Acceptable,
    NeedsImprovement,
    Poor,
}

impl QualityRecommendation {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            QualityRecommendation::HighQuality
        } else if score >= 0.6 {
            QualityRecommendation::Acceptable
        } else if score >= 0.4 {
            QualityRecommendation::NeedsImprovement
        } else {
            QualityRecommendation::Poor
        }
    }
}

/// Factors that multiplied into the quality score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityFactors {
    pub completeness: f64,
    pub date_precision: f64,
    pub source_reliability: f64,
    pub issue_penalty: f64,
}

/// Informational data-quality assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub score: f64,
    pub completeness: f64,
    pub factors: QualityFactors,
    pub recommendation: QualityRecommendation,
}

/// RecordValidator output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub validation_score: f64,
    /// 0.7 × validation score + 0.3 × quality score
    pub confidence: f64,
    pub issues: Vec<ValidationIssue>,
    pub warnings: Vec<String>,
    pub quality_assessment: QualityAssessment,
}

impl ValidationResult {
    /// Deduction per error-severity issue
    pub const ERROR_PENALTY: f64 = 0.25;
    /// Deduction per warning-severity issue
    pub const WARNING_ISSUE_PENALTY: f64 = 0.10;
    /// Deduction per warning-list entry
    pub const WARNING_NOTE_PENALTY: f64 = 0.05;

    /// Assemble a result, deriving validity and scores from the findings
    pub fn from_findings(
        issues: Vec<ValidationIssue>,
        warnings: Vec<String>,
        quality_assessment: QualityAssessment,
    ) -> Self {
        let mut score = 1.0_f64;
        for issue in &issues {
            score -= match issue.severity {
                Severity::Error => Self::ERROR_PENALTY,
                Severity::Warning => Self::WARNING_ISSUE_PENALTY,
            };
        }
        score -= Self::WARNING_NOTE_PENALTY * warnings.len() as f64;
        let validation_score = score.max(0.0);

        let is_valid = !issues.iter().any(|i| i.severity == Severity::Error);
        let confidence = 0.7 * validation_score + 0.3 * quality_assessment.score;

        Self {
            is_valid,
            validation_score,
            confidence,
            issues,
            warnings,
            quality_assessment,
        }
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn has_issue(&self, issue_type: &str) -> bool {
        self.issues.iter().any(|i| i.issue_type == issue_type)
    }
}

// ============================================================================
// Confidence
// ============================================================================

/// Per-factor scores feeding the overall confidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorScores {
    pub name_match: f64,
    pub date_match: f64,
    pub location_match: f64,
    pub family_context: f64,
    pub record_quality: f64,
}

impl FactorScores {
    pub const NAME_WEIGHT: f64 = 0.35;
    pub const DATE_WEIGHT: f64 = 0.25;
    pub const LOCATION_WEIGHT: f64 = 0.20;
    pub const FAMILY_WEIGHT: f64 = 0.15;
    pub const QUALITY_WEIGHT: f64 = 0.05;

    /// Σ weight × score
    pub fn weighted_sum(&self) -> f64 {
        self.name_match * Self::NAME_WEIGHT
            + self.date_match * Self::DATE_WEIGHT
            + self.location_match * Self::LOCATION_WEIGHT
            + self.family_context * Self::FAMILY_WEIGHT
            + self.record_quality * Self::QUALITY_WEIGHT
    }
}

/// ConfidenceScorer output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceResult {
    pub overall_confidence: f64,
    pub scores: FactorScores,
    pub recommendation: Recommendation,
    pub matching_factors: Vec<String>,
    pub concerns: Vec<String>,
}

// ============================================================================
// Search strategy
// ============================================================================

/// How a strategy or judgment was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMethod {
    /// Structurally valid generative response
    Ai,
    /// No generative provider configured
    Fallback,
    /// Generative provider configured but every attempt failed
    EnhancedFallback,
}

impl AnalysisMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMethod::Ai => "ai",
            AnalysisMethod::Fallback => "fallback",
            AnalysisMethod::EnhancedFallback => "enhanced_fallback",
        }
    }
}

/// Inclusive year window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: i32,
    pub end: i32,
}

impl DateRange {
    pub fn new(start: i32, end: i32) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    pub fn around(year: i32, radius: i32) -> Self {
        Self::new(year - radius, year + radius)
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }
}

/// Search plan for the SourceAggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchStrategy {
    pub name_variations: Vec<String>,
    pub location_variations: Vec<String>,
    pub date_ranges: Vec<DateRange>,
    pub record_types: Vec<RecordType>,
    pub search_terms: Vec<String>,
    pub method: AnalysisMethod,
}

// ============================================================================
// Match analysis
// ============================================================================

/// Structured judgment, from the generative provider or the fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiJudgment {
    pub confidence: f64,
    pub reasoning: String,
    pub matching_factors: Vec<String>,
    pub concerns: Vec<String>,
    pub recommendation: Recommendation,
    pub method: AnalysisMethod,
    /// Model that produced the judgment (AI method only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Blended final verdict
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FinalRecommendation {
    /// 0.6 × ai.confidence + 0.4 × confidence.overall_confidence
    pub score: f64,
    pub recommendation: Recommendation,
}

impl FinalRecommendation {
    pub const AI_WEIGHT: f64 = 0.6;
    pub const RULE_WEIGHT: f64 = 0.4;

    pub fn blend(ai_confidence: f64, rule_confidence: f64) -> Self {
        let score =
            (Self::AI_WEIGHT * ai_confidence + Self::RULE_WEIGHT * rule_confidence).clamp(0.0, 1.0);
        Self {
            score,
            recommendation: Recommendation::from_score(score),
        }
    }
}

/// Name comparison breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullNameMatch {
    pub overall_score: f64,
    pub given_name_score: f64,
    pub family_name_score: f64,
    pub maiden_name_score: f64,
    pub details: Vec<String>,
}

/// Complete analysis of one subject/candidate pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchAnalysis {
    pub subject_id: String,
    pub candidate_id: String,
    pub ai: AiJudgment,
    pub confidence: ConfidenceResult,
    pub validation: ValidationResult,
    pub name_match: FullNameMatch,
    pub final_recommendation: FinalRecommendation,
    /// Set when the placeholder guard forced a rejection
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub placeholder_hits: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quality(score: f64) -> QualityAssessment {
        QualityAssessment {
            score,
            completeness: score,
            factors: QualityFactors {
                completeness: score,
                date_precision: 1.0,
                source_reliability: 1.0,
                issue_penalty: 1.0,
            },
            recommendation: QualityRecommendation::from_score(score),
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        let sum = FactorScores::NAME_WEIGHT
            + FactorScores::DATE_WEIGHT
            + FactorScores::LOCATION_WEIGHT
            + FactorScores::FAMILY_WEIGHT
            + FactorScores::QUALITY_WEIGHT;
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_recommendation_thresholds() {
        assert_eq!(Recommendation::from_score(0.85), Recommendation::Accept);
        assert_eq!(Recommendation::from_score(0.8499), Recommendation::Review);
        assert_eq!(Recommendation::from_score(0.60), Recommendation::Review);
        assert_eq!(Recommendation::from_score(0.5999), Recommendation::Reject);
    }

    #[test]
    fn test_lenient_recommendation_parse() {
        assert_eq!(Recommendation::parse_lenient("ACCEPT"), Some(Recommendation::Accept));
        assert_eq!(Recommendation::parse_lenient("needs review"), Some(Recommendation::Review));
        assert_eq!(Recommendation::parse_lenient("Not a match"), Some(Recommendation::Reject));
        assert_eq!(Recommendation::parse_lenient("banana"), None);
    }

    #[test]
    fn test_validation_score_deductions() {
        let result = ValidationResult::from_findings(
            vec![
                ValidationIssue::error("negative_lifespan", "x"),
                ValidationIssue::warning("unusual_lifespan", "y"),
            ],
            vec!["note".to_string()],
            quality(1.0),
        );
        assert!(!result.is_valid);
        assert!((result.validation_score - 0.60).abs() < 1e-9);
        assert!((result.confidence - (0.7 * 0.60 + 0.3)).abs() < 1e-9);
    }

    #[test]
    fn test_validation_score_floors_at_zero() {
        let issues = (0..6)
            .map(|_| ValidationIssue::error("future_date", "x"))
            .collect();
        let result = ValidationResult::from_findings(issues, Vec::new(), quality(0.0));
        assert_eq!(result.validation_score, 0.0);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_warnings_only_is_valid() {
        let result = ValidationResult::from_findings(
            vec![ValidationIssue::warning("parent_too_old", "x")],
            Vec::new(),
            quality(0.5),
        );
        assert!(result.is_valid);
    }

    #[test]
    fn test_final_recommendation_blend() {
        let fr = FinalRecommendation::blend(1.0, 0.5);
        assert!((fr.score - 0.8).abs() < 1e-9);
        assert_eq!(fr.recommendation, Recommendation::Review);
    }

    #[test]
    fn test_date_range_normalizes_order() {
        let r = DateRange::new(1900, 1890);
        assert_eq!((r.start, r.end), (1890, 1900));
        assert!(r.contains(1895));
    }
}
