//! Shared data model
//!
//! Canonical shapes exchanged between the genealogy-data collaborator, the
//! resolver core and the HTTP layer. Every component takes these types
//! directly; callers normalize their own representations before invoking the
//! resolver.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// People
// ============================================================================

/// Recorded sex of a person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    #[default]
    Unknown,
}

/// Structured personal name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    /// Given name(s), space separated
    #[serde(default)]
    pub given: String,
    /// Family name(s); may embed a maiden name ("Smith née Jones")
    #[serde(default)]
    pub family: String,
    /// Explicit maiden name, if recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maiden: Option<String>,
}

impl PersonName {
    pub fn new(given: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            given: given.into(),
            family: family.into(),
            maiden: None,
        }
    }

    pub fn with_maiden(mut self, maiden: impl Into<String>) -> Self {
        self.maiden = Some(maiden.into());
        self
    }

    /// "Given Family" display form
    pub fn full(&self) -> String {
        format!("{} {}", self.given.trim(), self.family.trim())
            .trim()
            .to_string()
    }

    /// True when neither given nor family name carries any text
    pub fn is_empty(&self) -> bool {
        self.given.trim().is_empty() && self.family.trim().is_empty()
    }
}

/// Date and place of a life event, both free text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifeEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
}

impl LifeEvent {
    pub fn new(date: Option<&str>, place: Option<&str>) -> Self {
        Self {
            date: date.map(str::to_string),
            place: place.map(str::to_string),
        }
    }

    /// Date text if present and non-blank
    pub fn date_text(&self) -> Option<&str> {
        non_blank(self.date.as_deref())
    }

    /// Place text if present and non-blank
    pub fn place_text(&self) -> Option<&str> {
        non_blank(self.place.as_deref())
    }
}

/// Kind of record a source or candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    VitalRecord,
    Census,
    Military,
    Immigration,
    Cemetery,
    Newspaper,
    FamilyTree,
    #[default]
    Other,
}

impl RecordType {
    /// Source reliability (0.0-1.0) used by quality and confidence scoring
    pub fn reliability(&self) -> f64 {
        match self {
            RecordType::VitalRecord => 0.95,
            RecordType::Census => 0.85,
            RecordType::Military => 0.85,
            RecordType::Immigration => 0.80,
            RecordType::Cemetery => 0.75,
            RecordType::Newspaper => 0.70,
            RecordType::FamilyTree => 0.60,
            RecordType::Other => 0.50,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::VitalRecord => "vital_record",
            RecordType::Census => "census",
            RecordType::Military => "military",
            RecordType::Immigration => "immigration",
            RecordType::Cemetery => "cemetery",
            RecordType::Newspaper => "newspaper",
            RecordType::FamilyTree => "family_tree",
            RecordType::Other => "other",
        }
    }

    /// Lenient parse of free-text record type labels
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        if label.contains("vital")
            || label.contains("birth")
            || label.contains("death")
            || label.contains("marriage")
        {
            RecordType::VitalRecord
        } else if label.contains("census") {
            RecordType::Census
        } else if label.contains("military") || label.contains("draft") {
            RecordType::Military
        } else if label.contains("immigra") || label.contains("passenger") || label.contains("natural") {
            RecordType::Immigration
        } else if label.contains("cemetery") || label.contains("burial") || label.contains("grave") {
            RecordType::Cemetery
        } else if label.contains("newspaper") || label.contains("obituar") {
            RecordType::Newspaper
        } else if label.contains("tree") {
            RecordType::FamilyTree
        } else {
            RecordType::Other
        }
    }
}

/// Source citation attached to a person
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCitation {
    pub title: String,
    #[serde(default)]
    pub record_type: RecordType,
}

/// One person as recorded in the user's genealogy dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: PersonName,
    #[serde(default)]
    pub sex: Sex,
    #[serde(default)]
    pub birth: LifeEvent,
    #[serde(default)]
    pub death: LifeEvent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceCitation>,
}

impl PersonRecord {
    pub fn new(given: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            name: PersonName::new(given, family),
            ..Default::default()
        }
    }

    pub fn with_sex(mut self, sex: Sex) -> Self {
        self.sex = sex;
        self
    }

    pub fn born(mut self, date: Option<&str>, place: Option<&str>) -> Self {
        self.birth = LifeEvent::new(date, place);
        self
    }

    pub fn died(mut self, date: Option<&str>, place: Option<&str>) -> Self {
        self.death = LifeEvent::new(date, place);
        self
    }

    pub fn with_maiden(mut self, maiden: impl Into<String>) -> Self {
        self.name.maiden = Some(maiden.into());
        self
    }
}

/// Spouse reference with marriage details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpouseRef {
    pub person: PersonRecord,
    #[serde(default)]
    pub marriage: LifeEvent,
}

/// Resolved family context for a subject
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub father: Option<PersonRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mother: Option<PersonRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spouses: Vec<SpouseRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PersonRecord>,
}

/// The known person a match is being sought for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub person: PersonRecord,
    #[serde(default)]
    pub family: FamilyContext,
}

impl Subject {
    pub fn new(id: impl Into<String>, person: PersonRecord) -> Self {
        Self {
            id: id.into(),
            person,
            family: FamilyContext::default(),
        }
    }

    pub fn with_family(mut self, family: FamilyContext) -> Self {
        self.family = family;
        self
    }

    /// Reject subjects that cannot be matched at all
    pub fn ensure_matchable(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::InvalidInput("subject id is required".to_string()));
        }
        if self.person.name.is_empty() {
            return Err(Error::InvalidInput(format!(
                "subject {} has no given or family name",
                self.id
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Candidates
// ============================================================================

/// Family names a provider reported alongside a candidate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFamily {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub father: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mother: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spouses: Vec<String>,
}

impl CandidateFamily {
    pub fn is_empty(&self) -> bool {
        self.father.is_none() && self.mother.is_none() && self.spouses.is_empty()
    }
}

/// Externally discovered record proposed as a possible match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: String,
    /// Provider identifier ("wikitree", "familysearch", ...)
    pub source: String,
    /// Display name as the provider reported it
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    #[serde(default)]
    pub record_type: RecordType,
    /// Provider-assigned confidence used for initial ranking
    #[serde(default)]
    pub initial_confidence: f64,
    #[serde(default, skip_serializing_if = "CandidateFamily::is_empty")]
    pub family: CandidateFamily,
    /// Raw provider payload, retained for re-analysis
    #[serde(default)]
    pub raw: serde_json::Value,
}

impl CandidateRecord {
    pub fn new(id: impl Into<String>, source: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Deduplication key: name + birth + location, exact text
    pub fn dedup_key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.name,
            self.birth_date.as_deref().unwrap_or(""),
            self.location.as_deref().unwrap_or("")
        )
    }

    /// All human-readable text fields, for content scanning
    pub fn text_fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![("id", self.id.as_str()), ("name", self.name.as_str())];
        let optional = [
            ("birth_date", &self.birth_date),
            ("death_date", &self.death_date),
            ("location", &self.location),
            ("url", &self.url),
            ("additional_info", &self.additional_info),
            ("father", &self.family.father),
            ("mother", &self.family.mother),
        ];
        for (label, value) in optional {
            if let Some(v) = value.as_deref() {
                fields.push((label, v));
            }
        }
        for spouse in &self.family.spouses {
            fields.push(("spouse", spouse.as_str()));
        }
        fields
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_without_name_is_not_matchable() {
        let subject = Subject::new("I1", PersonRecord::new("  ", ""));
        assert!(matches!(subject.ensure_matchable(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_subject_without_id_is_not_matchable() {
        let subject = Subject::new("", PersonRecord::new("John", "Smith"));
        assert!(subject.ensure_matchable().is_err());
    }

    #[test]
    fn test_dedup_key_uses_name_birth_location() {
        let mut a = CandidateRecord::new("a", "wikitree", "John Smith");
        a.birth_date = Some("1850".to_string());
        a.location = Some("Ohio".to_string());
        let mut b = CandidateRecord::new("b", "familysearch", "John Smith");
        b.birth_date = Some("1850".to_string());
        b.location = Some("Ohio".to_string());
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn test_record_type_labels() {
        assert_eq!(RecordType::from_label("1880 Census"), RecordType::Census);
        assert_eq!(RecordType::from_label("Birth certificate"), RecordType::VitalRecord);
        assert_eq!(RecordType::from_label("Obituary"), RecordType::Newspaper);
        assert_eq!(RecordType::from_label("something"), RecordType::Other);
    }

    #[test]
    fn test_subject_json_shape() {
        let json = r#"{
            "id": "I1",
            "person": {
                "name": {"given": "Mary", "family": "Jones"},
                "sex": "female",
                "birth": {"date": "1850", "place": "Cork, Ireland"}
            }
        }"#;
        let subject: Subject = serde_json::from_str(json).unwrap();
        assert_eq!(subject.person.sex, Sex::Female);
        assert_eq!(subject.person.birth.place_text(), Some("Cork, Ireland"));
        assert!(subject.family.father.is_none());
    }
}
