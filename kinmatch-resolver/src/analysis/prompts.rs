//! Prompt construction for the generative provider

use crate::types::{ConfidenceResult, ValidationResult};
use kinmatch_common::model::{CandidateRecord, FamilyContext, PersonRecord, Subject};
use std::fmt::Write;

const STRATEGY_SYSTEM: &str = "You are an expert genealogist planning record searches. \
Respond with a single JSON object and nothing else. The object must contain exactly these \
fields: \"nameVariations\" (array of full-name strings, including spelling, nickname and \
cultural variants), \"locationVariations\" (array of place strings, most specific first), \
\"dateRanges\" (array of {\"start\": year, \"end\": year}), \"recordTypes\" (array of strings \
such as \"census\", \"vital record\", \"military\", \"immigration\", \"cemetery\", \
\"newspaper\"), \"searchTerms\" (array of free-text search strings).";

const ANALYSIS_SYSTEM: &str = "You are an expert genealogist deciding whether an external \
record describes a known person. Weigh names, dates, places and family members, allowing for \
transcription errors and naming conventions of the period. Respond with a single JSON object \
and nothing else, containing exactly: \"confidence\" (number between 0 and 1), \"reasoning\" \
(string), \"matchingFactors\" (array of strings), \"concerns\" (array of strings), \
\"recommendation\" (one of \"accept\", \"review\", \"reject\").";

/// (system, user) prompt pair for search-strategy generation
pub fn search_strategy_prompt(subject: &Subject) -> (String, String) {
    let mut user = String::from("Plan searches for this person.\n\n");
    describe_person(&mut user, "Person", &subject.person);
    describe_family(&mut user, &subject.family);
    (STRATEGY_SYSTEM.to_string(), user)
}

/// (system, user) prompt pair for match analysis
pub fn match_analysis_prompt(
    subject: &Subject,
    candidate: &CandidateRecord,
    confidence: &ConfidenceResult,
    validation: &ValidationResult,
) -> (String, String) {
    let mut user = String::from("Does the candidate record describe the known person?\n\n");
    describe_person(&mut user, "Known person", &subject.person);
    describe_family(&mut user, &subject.family);

    let _ = writeln!(user, "\nCandidate record ({}):", candidate.source);
    let _ = writeln!(user, "  Name: {}", candidate.name);
    line(&mut user, "Birth", candidate.birth_date.as_deref());
    line(&mut user, "Death", candidate.death_date.as_deref());
    line(&mut user, "Location", candidate.location.as_deref());
    let _ = writeln!(user, "  Record type: {}", candidate.record_type.as_str());
    line(&mut user, "Details", candidate.additional_info.as_deref());
    line(&mut user, "Father", candidate.family.father.as_deref());
    line(&mut user, "Mother", candidate.family.mother.as_deref());
    if !candidate.family.spouses.is_empty() {
        let _ = writeln!(user, "  Spouses: {}", candidate.family.spouses.join("; "));
    }

    let _ = writeln!(
        user,
        "\nRule-based score: {:.2} ({}). Name {:.2}, dates {:.2}, place {:.2}, family {:.2}.",
        confidence.overall_confidence,
        confidence.recommendation.as_str(),
        confidence.scores.name_match,
        confidence.scores.date_match,
        confidence.scores.location_match,
        confidence.scores.family_context,
    );
    if !validation.issues.is_empty() {
        user.push_str("Candidate consistency problems:\n");
        for issue in &validation.issues {
            let _ = writeln!(user, "  - {}", issue.message);
        }
    }

    (ANALYSIS_SYSTEM.to_string(), user)
}

fn describe_person(out: &mut String, label: &str, person: &PersonRecord) {
    let _ = writeln!(out, "{}:", label);
    let _ = writeln!(out, "  Name: {}", person.name.full());
    line(out, "Maiden name", person.name.maiden.as_deref());
    line(out, "Birth date", person.birth.date_text());
    line(out, "Birth place", person.birth.place_text());
    line(out, "Death date", person.death.date_text());
    line(out, "Death place", person.death.place_text());
}

fn describe_family(out: &mut String, family: &FamilyContext) {
    if let Some(father) = &family.father {
        relative(out, "Father", father);
    }
    if let Some(mother) = &family.mother {
        relative(out, "Mother", mother);
    }
    for spouse in &family.spouses {
        relative(out, "Spouse", &spouse.person);
    }
    for child in &family.children {
        relative(out, "Child", child);
    }
}

fn relative(out: &mut String, label: &str, person: &PersonRecord) {
    let _ = write!(out, "  {}: {}", label, person.name.full());
    if let Some(born) = person.birth.date_text() {
        let _ = write!(out, " (b. {})", born);
    }
    out.push('\n');
}

fn line(out: &mut String, label: &str, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        let _ = writeln!(out, "  {}: {}", label, value);
    }
}
