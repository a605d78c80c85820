//! Record Validator
//!
//! Biological and chronological plausibility checks for a person and their
//! family context.
//!
//! # Checks
//! 1. **Dates**: no future dates, no birth before year 1000
//! 2. **Lifespan**: not negative, at most 122 years (warning above 100)
//! 3. **Parent ages**: parents at least 12 at a child's birth (warning above 60),
//!    for both the subject's parents and the subject's own children
//! 4. **Spouses**: age gap above 25 is unusual, nobody marries before 12
//! 5. **Timeline**: marriages fall within the subject's life, parents are alive
//!    at (or shortly before, for fathers) a child's birth
//! 6. **Places**: place names are used within their historical window
//!
//! Issues never abort validation. A record is valid when no check produced
//! an error-severity issue.

use super::historical_places::HistoricalPlaces;
use super::quality_scorer::QualityScorer;
use crate::names::split_display_name;
use crate::types::{Severity, ValidationIssue, ValidationResult};
use kinmatch_common::dates::{current_year, parse_partial_date, DatePrecision, PartialDate};
use kinmatch_common::model::{
    CandidateRecord, FamilyContext, LifeEvent, PersonRecord, Sex, SourceCitation, Subject,
};
use tracing::debug;

pub const MIN_PLAUSIBLE_YEAR: i32 = 1000;
pub const MAX_LIFESPAN: i32 = 122;
pub const UNUSUAL_LIFESPAN: i32 = 100;
pub const MIN_PARENT_AGE: i32 = 12;
pub const MAX_PARENT_AGE: i32 = 60;
pub const MAX_SPOUSE_GAP: i32 = 25;
pub const MIN_MARRIAGE_AGE: i32 = 12;
/// Years a father may predecease his child's birth
pub const POSTHUMOUS_TOLERANCE: i32 = 1;

/// Plausibility validator
#[derive(Debug, Clone, Default)]
pub struct RecordValidator {
    /// Fixed "current" year; `None` reads the clock
    current_year: Option<i32>,
    places: HistoricalPlaces,
    quality: QualityScorer,
}

/// Findings accumulated while validating one record
#[derive(Default)]
struct Findings {
    issues: Vec<ValidationIssue>,
    warnings: Vec<String>,
}

impl Findings {
    fn error(&mut self, issue_type: &str, message: String) {
        self.issues.push(ValidationIssue::error(issue_type, message));
    }

    fn warn(&mut self, issue_type: &str, message: String) {
        self.issues.push(ValidationIssue::warning(issue_type, message));
    }

    fn note(&mut self, message: String) {
        self.warnings.push(message);
    }
}

impl RecordValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the current year, for deterministic results
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = Some(year);
        self
    }

    pub fn with_places(mut self, places: HistoricalPlaces) -> Self {
        self.places = places;
        self
    }

    fn this_year(&self) -> i32 {
        self.current_year.unwrap_or_else(current_year)
    }

    /// Validate a subject and its family context
    pub fn validate_subject(&self, subject: &Subject) -> ValidationResult {
        self.validate_person_record(&subject.person, &subject.family)
    }

    /// Validate a candidate record on its own
    ///
    /// The candidate's location is treated as its birth place and its
    /// provider as a single cited source.
    pub fn validate_candidate(&self, candidate: &CandidateRecord) -> ValidationResult {
        let person = PersonRecord {
            id: Some(candidate.id.clone()),
            name: split_display_name(&candidate.name),
            sex: Sex::Unknown,
            birth: LifeEvent::new(candidate.birth_date.as_deref(), candidate.location.as_deref()),
            death: LifeEvent::new(candidate.death_date.as_deref(), None),
            sources: vec![SourceCitation {
                title: candidate.source.clone(),
                record_type: candidate.record_type,
            }],
        };
        self.validate_person_record(&person, &FamilyContext::default())
    }

    /// Validate one person against their family context
    pub fn validate_person_record(
        &self,
        person: &PersonRecord,
        family: &FamilyContext,
    ) -> ValidationResult {
        let mut findings = Findings::default();

        let birth = self.parse_event_date(&person.birth, "birth", &mut findings);
        let death = self.parse_event_date(&person.death, "death", &mut findings);

        self.check_dates(birth, death, &mut findings);
        self.check_lifespan(birth, death, &mut findings);
        self.check_parents(birth, family, &mut findings);
        self.check_children(person, birth, death, family, &mut findings);
        self.check_spouses(birth, death, family, &mut findings);
        self.check_places(person, birth, death, &mut findings);

        let errors = findings
            .issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count();
        let warning_issues = findings.issues.len() - errors;
        let quality = self
            .quality
            .assess(person, errors, warning_issues + findings.warnings.len());

        let result = ValidationResult::from_findings(findings.issues, findings.warnings, quality);

        debug!(
            person = %person.name.full(),
            is_valid = result.is_valid,
            score = result.validation_score,
            errors,
            warnings = warning_issues,
            "Record validation complete"
        );

        result
    }

    /// Parse a date, noting unparsable text; only dates with a year are returned
    fn parse_event_date(
        &self,
        event: &LifeEvent,
        label: &str,
        findings: &mut Findings,
    ) -> Option<PartialDate> {
        let text = event.date_text()?;
        let parsed = parse_partial_date(text)?;
        if parsed.precision == DatePrecision::Unparsable || parsed.year.is_none() {
            findings.note(format!("Could not parse {} date '{}'", label, text));
            return None;
        }
        Some(parsed)
    }

    fn check_dates(
        &self,
        birth: Option<PartialDate>,
        death: Option<PartialDate>,
        findings: &mut Findings,
    ) {
        let now = self.this_year();
        if let Some(by) = year(birth) {
            if by > now {
                findings.error("future_date", format!("Birth year {} is in the future", by));
            }
            if by < MIN_PLAUSIBLE_YEAR {
                findings.error(
                    "implausible_birth_year",
                    format!("Birth year {} is before {}", by, MIN_PLAUSIBLE_YEAR),
                );
            }
        }
        if let Some(dy) = year(death) {
            if dy > now {
                findings.error("future_date", format!("Death year {} is in the future", dy));
            }
        }
    }

    fn check_lifespan(
        &self,
        birth: Option<PartialDate>,
        death: Option<PartialDate>,
        findings: &mut Findings,
    ) {
        let (Some(b), Some(d)) = (birth, death) else {
            return;
        };
        let (Some(by), Some(dy)) = (b.year, d.year) else {
            return;
        };

        if d.is_before(&b) {
            findings.error(
                "negative_lifespan",
                format!("Death ({}) precedes birth ({})", dy, by),
            );
            return;
        }

        let lifespan = dy - by;
        if lifespan > MAX_LIFESPAN {
            findings.error(
                "exceeds_max_lifespan",
                format!("Lifespan of {} years exceeds {}", lifespan, MAX_LIFESPAN),
            );
        } else if lifespan > UNUSUAL_LIFESPAN {
            findings.warn(
                "unusual_lifespan",
                format!("Lifespan of {} years is unusual", lifespan),
            );
        }
    }

    fn check_parents(
        &self,
        birth: Option<PartialDate>,
        family: &FamilyContext,
        findings: &mut Findings,
    ) {
        let Some(child_birth) = birth else {
            return;
        };

        let parents = [
            ("Father", family.father.as_ref(), POSTHUMOUS_TOLERANCE),
            ("Mother", family.mother.as_ref(), 0),
        ];
        for (role, parent, tolerance) in parents {
            let Some(parent) = parent else {
                continue;
            };
            let parent_birth = self.parse_event_date(&parent.birth, "parent birth", findings);
            let parent_death = self.parse_event_date(&parent.death, "parent death", findings);

            check_parent_age(role, "the subject", parent_birth, child_birth, findings);
            check_alive_at_birth(role, "the subject", parent_death, child_birth, tolerance, findings);
        }
    }

    fn check_children(
        &self,
        person: &PersonRecord,
        birth: Option<PartialDate>,
        death: Option<PartialDate>,
        family: &FamilyContext,
        findings: &mut Findings,
    ) {
        let tolerance = match person.sex {
            Sex::Female => 0,
            _ => POSTHUMOUS_TOLERANCE,
        };

        for child in &family.children {
            let Some(child_birth) = self.parse_event_date(&child.birth, "child birth", findings)
            else {
                continue;
            };
            let child_name = child.name.full();
            let child_label = if child_name.is_empty() {
                "a child".to_string()
            } else {
                child_name
            };

            check_parent_age("Subject", &child_label, birth, child_birth, findings);
            check_alive_at_birth("Subject", &child_label, death, child_birth, tolerance, findings);
        }
    }

    fn check_spouses(
        &self,
        birth: Option<PartialDate>,
        death: Option<PartialDate>,
        family: &FamilyContext,
        findings: &mut Findings,
    ) {
        let subject_year = year(birth);

        for spouse in &family.spouses {
            let spouse_birth = self.parse_event_date(&spouse.person.birth, "spouse birth", findings);
            let spouse_year = year(spouse_birth);
            let marriage = self.parse_event_date(&spouse.marriage, "marriage", findings);

            if let (Some(sy), Some(py)) = (subject_year, spouse_year) {
                let gap = (sy - py).abs();
                if gap > MAX_SPOUSE_GAP {
                    findings.warn(
                        "large_spouse_age_gap",
                        format!("Spouse age gap of {} years", gap),
                    );
                }
            }

            let Some(m) = marriage else {
                continue;
            };
            let Some(my) = m.year else {
                continue;
            };

            match birth {
                Some(b) if m.is_before(&b) => findings.error(
                    "marriage_before_birth",
                    format!("Marriage ({}) precedes the subject's birth", my),
                ),
                Some(b) => {
                    if let Some(by) = b.year {
                        if my - by < MIN_MARRIAGE_AGE {
                            findings.error(
                                "marriage_too_young",
                                format!("Subject was {} at marriage", my - by),
                            );
                        }
                    }
                }
                None => {}
            }

            if let Some(py) = spouse_year {
                if my - py < MIN_MARRIAGE_AGE {
                    findings.error(
                        "marriage_too_young",
                        format!("Spouse was {} at marriage", my - py),
                    );
                }
            }

            if let Some(d) = death {
                if d.is_before(&m) {
                    findings.error(
                        "timeline_inconsistency",
                        format!("Marriage ({}) is after the subject's death", my),
                    );
                }
            }
        }
    }

    fn check_places(
        &self,
        person: &PersonRecord,
        birth: Option<PartialDate>,
        death: Option<PartialDate>,
        findings: &mut Findings,
    ) {
        let events = [
            (person.birth.place_text(), year(birth)),
            (person.death.place_text(), year(death)),
        ];
        for (place, year) in events {
            if let (Some(place), Some(year)) = (place, year) {
                for warning in self.places.check(place, year) {
                    findings.note(warning);
                }
            }
        }
    }
}

fn year(date: Option<PartialDate>) -> Option<i32> {
    date.and_then(|d| d.year)
}

fn check_parent_age(
    role: &str,
    child: &str,
    parent_birth: Option<PartialDate>,
    child_birth: PartialDate,
    findings: &mut Findings,
) {
    let (Some(py), Some(cy)) = (year(parent_birth), child_birth.year) else {
        return;
    };
    let age = cy - py;
    if age < MIN_PARENT_AGE {
        findings.error(
            "parent_too_young",
            format!("{} was {} at the birth of {}", role, age, child),
        );
    } else if age > MAX_PARENT_AGE {
        findings.warn(
            "parent_too_old",
            format!("{} was {} at the birth of {}", role, age, child),
        );
    }
}

fn check_alive_at_birth(
    role: &str,
    child: &str,
    parent_death: Option<PartialDate>,
    child_birth: PartialDate,
    tolerance_years: i32,
    findings: &mut Findings,
) {
    let Some(death) = parent_death else {
        return;
    };
    let died_before = if tolerance_years == 0 {
        death.is_before(&child_birth)
    } else {
        match (death.year, child_birth.year) {
            (Some(dy), Some(cy)) => cy - dy > tolerance_years,
            _ => false,
        }
    };
    if died_before {
        findings.error(
            "parent_died_before_birth",
            format!(
                "{} died ({}) before the birth of {}",
                role,
                death.year.unwrap_or_default(),
                child
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinmatch_common::model::SpouseRef;

    fn validator() -> RecordValidator {
        RecordValidator::new().with_current_year(2024)
    }

    fn subject_born(date: &str) -> PersonRecord {
        PersonRecord::new("John", "Smith").born(Some(date), None)
    }

    #[test]
    fn test_clean_record_is_valid() {
        let person = PersonRecord::new("John", "Smith")
            .born(Some("1850"), Some("Boston"))
            .died(Some("1920"), Some("Boston"));
        let result = validator().validate_person_record(&person, &FamilyContext::default());
        assert!(result.is_valid);
        assert!(result.issues.is_empty());
        assert_eq!(result.validation_score, 1.0);
    }

    #[test]
    fn test_future_birth() {
        let result =
            validator().validate_person_record(&subject_born("2030"), &FamilyContext::default());
        assert!(!result.is_valid);
        assert!(result.has_issue("future_date"));
    }

    #[test]
    fn test_implausible_birth_year() {
        let result =
            validator().validate_person_record(&subject_born("850"), &FamilyContext::default());
        assert!(result.has_issue("implausible_birth_year"));
    }

    #[test]
    fn test_negative_lifespan() {
        let person = subject_born("1900").died(Some("1890"), None);
        let result = validator().validate_person_record(&person, &FamilyContext::default());
        assert!(result.has_issue("negative_lifespan"));
    }

    #[test]
    fn test_lifespan_bounds() {
        let person = subject_born("1800").died(Some("1930"), None);
        let result = validator().validate_person_record(&person, &FamilyContext::default());
        assert!(result.has_issue("exceeds_max_lifespan"));

        let person = subject_born("1800").died(Some("1905"), None);
        let result = validator().validate_person_record(&person, &FamilyContext::default());
        assert!(result.has_issue("unusual_lifespan"));
        assert!(result.is_valid);
    }

    #[test]
    fn test_parent_too_young() {
        let family = FamilyContext {
            father: Some(PersonRecord::new("Adam", "Smith").born(Some("1955-01-01"), None)),
            ..Default::default()
        };
        let result = validator().validate_person_record(&subject_born("1920-03-15"), &family);
        assert!(result.has_issue("parent_too_young"));
        assert!(!result.is_valid);
    }

    #[test]
    fn test_parent_too_old_is_warning() {
        let family = FamilyContext {
            mother: Some(PersonRecord::new("Eve", "Smith").born(Some("1830"), None)),
            ..Default::default()
        };
        let result = validator().validate_person_record(&subject_born("1895"), &family);
        assert!(result.has_issue("parent_too_old"));
        assert!(result.is_valid);
    }

    #[test]
    fn test_father_posthumous_tolerance() {
        let family = FamilyContext {
            father: Some(
                PersonRecord::new("Adam", "Smith")
                    .born(Some("1860"), None)
                    .died(Some("1889"), None),
            ),
            ..Default::default()
        };
        let result = validator().validate_person_record(&subject_born("1890"), &family);
        assert!(!result.has_issue("parent_died_before_birth"));

        let family = FamilyContext {
            father: Some(
                PersonRecord::new("Adam", "Smith")
                    .born(Some("1860"), None)
                    .died(Some("1887"), None),
            ),
            ..Default::default()
        };
        let result = validator().validate_person_record(&subject_born("1890"), &family);
        assert!(result.has_issue("parent_died_before_birth"));
    }

    #[test]
    fn test_mother_died_before_birth() {
        let family = FamilyContext {
            mother: Some(
                PersonRecord::new("Eve", "Smith")
                    .born(Some("1860"), None)
                    .died(Some("1889-05-01"), None),
            ),
            ..Default::default()
        };
        let result = validator().validate_person_record(&subject_born("1890-02-01"), &family);
        assert!(result.has_issue("parent_died_before_birth"));
    }

    #[test]
    fn test_child_born_after_subject_death() {
        let person = PersonRecord::new("Mary", "Smith")
            .with_sex(Sex::Female)
            .born(Some("1850"), None)
            .died(Some("1880"), None);
        let family = FamilyContext {
            children: vec![PersonRecord::new("Tom", "Smith").born(Some("1885"), None)],
            ..Default::default()
        };
        let result = validator().validate_person_record(&person, &family);
        assert!(result.has_issue("parent_died_before_birth"));
    }

    #[test]
    fn test_subject_too_young_as_parent() {
        let family = FamilyContext {
            children: vec![PersonRecord::new("Tom", "Smith").born(Some("1858"), None)],
            ..Default::default()
        };
        let result = validator().validate_person_record(&subject_born("1850"), &family);
        assert!(result.has_issue("parent_too_young"));
    }

    #[test]
    fn test_spouse_checks() {
        let family = FamilyContext {
            spouses: vec![SpouseRef {
                person: PersonRecord::new("Ann", "Jones").born(Some("1880"), None),
                marriage: LifeEvent::new(Some("1890"), None),
            }],
            ..Default::default()
        };
        let result = validator().validate_person_record(&subject_born("1850"), &family);
        assert!(result.has_issue("large_spouse_age_gap"));
        assert!(result.has_issue("marriage_too_young"));
    }

    #[test]
    fn test_marriage_outside_lifetime() {
        let family = FamilyContext {
            spouses: vec![SpouseRef {
                person: PersonRecord::new("Ann", "Jones"),
                marriage: LifeEvent::new(Some("1840"), None),
            }],
            ..Default::default()
        };
        let result = validator().validate_person_record(&subject_born("1850"), &family);
        assert!(result.has_issue("marriage_before_birth"));

        let person = subject_born("1850").died(Some("1870"), None);
        let family = FamilyContext {
            spouses: vec![SpouseRef {
                person: PersonRecord::new("Ann", "Jones"),
                marriage: LifeEvent::new(Some("1875"), None),
            }],
            ..Default::default()
        };
        let result = validator().validate_person_record(&person, &family);
        assert!(result.has_issue("timeline_inconsistency"));
    }

    #[test]
    fn test_unparsable_date_is_warning_entry() {
        let result = validator()
            .validate_person_record(&subject_born("sometime"), &FamilyContext::default());
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
        assert!((result.validation_score - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_historical_place_warning() {
        let person = PersonRecord::new("Ivan", "Petrov").born(Some("1850"), Some("Zagreb, Yugoslavia"));
        let result = validator().validate_person_record(&person, &FamilyContext::default());
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_validate_candidate_adapter() {
        let mut candidate = CandidateRecord::new("c1", "wikitree", "John Smith");
        candidate.birth_date = Some("1900".to_string());
        candidate.death_date = Some("1850".to_string());
        let result = validator().validate_candidate(&candidate);
        assert!(result.has_issue("negative_lifespan"));
    }
}
