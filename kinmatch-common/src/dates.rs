//! Partial date parsing for free-text genealogical dates
//!
//! Genealogy data records dates with widely varying precision: "1920-03-15",
//! "15 Mar 1920", "March 1920", "1920", "abt. 1920", or nothing usable at all.
//! This module extracts whatever calendar components are present and records
//! how precise the source text was.

use chrono::{Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// How precisely a date was recorded, from most to least precise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePrecision {
    Exact,
    MonthYear,
    YearOnly,
    Circa,
    Unparsable,
}

impl DatePrecision {
    /// Quality factor applied by data-quality assessment
    pub fn quality_factor(&self) -> f64 {
        match self {
            DatePrecision::Exact => 1.0,
            DatePrecision::MonthYear => 0.9,
            DatePrecision::YearOnly => 0.8,
            DatePrecision::Circa => 0.7,
            DatePrecision::Unparsable => 0.5,
        }
    }
}

/// Calendar components extracted from free text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDate {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub precision: DatePrecision,
}

impl PartialDate {
    fn unparsable() -> Self {
        Self {
            year: None,
            month: None,
            day: None,
            precision: DatePrecision::Unparsable,
        }
    }

    /// Ordinal key for chronological comparison (missing parts sort first)
    pub fn sort_key(&self) -> Option<(i32, u32, u32)> {
        self.year
            .map(|y| (y, self.month.unwrap_or(0), self.day.unwrap_or(0)))
    }

    /// Whether this date is strictly before `other` at the precision both share
    ///
    /// "1920" is not before "1920-03-15": shared precision is the year only.
    pub fn is_before(&self, other: &PartialDate) -> bool {
        let (Some(y1), Some(y2)) = (self.year, other.year) else {
            return false;
        };
        if y1 != y2 {
            return y1 < y2;
        }
        match ((self.month, other.month), (self.day, other.day)) {
            ((Some(m1), Some(m2)), _) if m1 != m2 => m1 < m2,
            ((Some(_), Some(_)), (Some(d1), Some(d2))) => d1 < d2,
            _ => false,
        }
    }
}

static CIRCA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(^~|\b(abt|about|circa|ca|c|approx|approximately|est|estimated|bef|before|aft|after|bet|between|around)\b\.?)")
        .expect("valid circa regex")
});
static ISO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})[-/](\d{1,2})(?:[-/](\d{1,2}))?\b").expect("valid iso regex"));
static NUMERIC_MDY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").expect("valid mdy regex"));
static DAY_MONTH_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+([a-z]{3,9})\.?,?\s+(\d{3,4})\b")
        .expect("valid dmy regex")
});
static MONTH_DAY_YEAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([a-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{3,4})\b")
        .expect("valid mdy-name regex")
});
static MONTH_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b([a-z]{3,9})\.?,?\s+(\d{3,4})\b").expect("valid my regex"));
static DECADE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{2,3}0)'?s\b").expect("valid decade regex"));
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{3,4})\b").expect("valid year regex"));

/// Parse a free-text date
///
/// Returns `None` for blank input. Non-blank text without a recognizable year
/// yields a `PartialDate` with `DatePrecision::Unparsable`.
pub fn parse_partial_date(text: &str) -> Option<PartialDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let circa = CIRCA_RE.is_match(text);
    let mut parsed = parse_components(text);

    if circa && parsed.year.is_some() {
        parsed.precision = DatePrecision::Circa;
    }
    Some(parsed)
}

/// Year component of an optional free-text date
pub fn year_of(text: Option<&str>) -> Option<i32> {
    text.and_then(parse_partial_date).and_then(|d| d.year)
}

/// Current calendar year (UTC)
pub fn current_year() -> i32 {
    Utc::now().year()
}

fn parse_components(text: &str) -> PartialDate {
    if let Some(caps) = ISO_RE.captures(text) {
        let year = caps[1].parse().ok();
        let month = caps[2].parse().ok();
        let day = caps.get(3).and_then(|d| d.as_str().parse().ok());
        return build(year, month, day);
    }

    if let Some(caps) = NUMERIC_MDY_RE.captures(text) {
        let month = caps[1].parse().ok();
        let day = caps[2].parse().ok();
        let year = caps[3].parse().ok();
        return build(year, month, day);
    }

    if let Some(caps) = DAY_MONTH_YEAR_RE.captures(text) {
        if let Some(month) = month_number(&caps[2]) {
            return build(caps[3].parse().ok(), Some(month), caps[1].parse().ok());
        }
    }

    if let Some(caps) = MONTH_DAY_YEAR_RE.captures(text) {
        if let Some(month) = month_number(&caps[1]) {
            return build(caps[3].parse().ok(), Some(month), caps[2].parse().ok());
        }
    }

    if let Some(caps) = MONTH_YEAR_RE.captures(text) {
        if let Some(month) = month_number(&caps[1]) {
            return build(caps[2].parse().ok(), Some(month), None);
        }
    }

    // "1850s" reads as the decade's first year, circa
    if let Some(caps) = DECADE_RE.captures(text) {
        let mut decade = build(caps[1].parse().ok(), None, None);
        if decade.year.is_some() {
            decade.precision = DatePrecision::Circa;
        }
        return decade;
    }

    if let Some(caps) = YEAR_RE.captures(text) {
        return build(caps[1].parse().ok(), None, None);
    }

    PartialDate::unparsable()
}

/// Assemble components, downgrading precision when a part is out of range
fn build(year: Option<i32>, month: Option<u32>, day: Option<u32>) -> PartialDate {
    let Some(year) = year else {
        return PartialDate::unparsable();
    };

    let month = month.filter(|m| (1..=12).contains(m));
    let day = match (month, day) {
        (Some(m), Some(d)) if NaiveDate::from_ymd_opt(year, m, d).is_some() => Some(d),
        _ => None,
    };

    let precision = match (month, day) {
        (Some(_), Some(_)) => DatePrecision::Exact,
        (Some(_), None) => DatePrecision::MonthYear,
        _ => DatePrecision::YearOnly,
    };

    PartialDate {
        year: Some(year),
        month,
        day,
        precision,
    }
}

/// Whole month names and their usual abbreviations only
fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "jan" | "january" => 1,
        "feb" | "february" => 2,
        "mar" | "march" => 3,
        "apr" | "april" => 4,
        "may" => 5,
        "jun" | "june" => 6,
        "jul" | "july" => 7,
        "aug" | "august" => 8,
        "sep" | "sept" | "september" => 9,
        "oct" | "october" => 10,
        "nov" | "november" => 11,
        "dec" | "december" => 12,
        _ => return None,
    };
    Some(month)
}
