//! Primitive extractors shared by every resource mapper.
//!
//! All functions here are total: missing or malformed input produces an empty string or
//! `None`, never a panic or an error.

use crate::datatypes::{CodeableConcept, Reference};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Resolve a CodeableConcept to human-readable text.
///
/// Precedence:
/// 1. `text`, verbatim, when non-empty;
/// 2. the first coding with a non-empty `display`;
/// 3. the `code` of the first coding;
/// 4. the empty string.
pub fn codeable_concept_text(concept: Option<&CodeableConcept>) -> String {
    let Some(concept) = concept else {
        return String::new();
    };

    if let Some(text) = concept.text.as_deref().filter(|t| !t.is_empty()) {
        return text.to_owned();
    }

    if let Some(display) = concept
        .coding
        .iter()
        .filter_map(|c| c.display.as_deref())
        .find(|d| !d.is_empty())
    {
        return display.to_owned();
    }

    concept.first_code().unwrap_or_default().to_owned()
}

/// Return the `code` of the first coding whose `system` equals `system` exactly.
pub fn code_for_system(concept: Option<&CodeableConcept>, system: &str) -> Option<String> {
    concept?
        .coding
        .iter()
        .find(|c| c.system.as_deref() == Some(system))
        .and_then(|c| c.code.clone())
}

/// Non-empty `display` of a Reference.
pub fn reference_display(reference: Option<&Reference>) -> Option<String> {
    reference
        .and_then(|r| r.display.as_deref())
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_owned)
}

/// Parse a FHIR `date`, `dateTime` or `instant` string.
///
/// Accepted precisions are `YYYY`, `YYYY-MM`, `YYYY-MM-DD` and full datetimes. Partial
/// dates resolve to the first instant of the period they name. Datetimes without an
/// offset are read as UTC.
pub fn parse_fhir_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = value?.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    let date = match raw.len() {
        4 if raw.bytes().all(|b| b.is_ascii_digit()) => {
            let year = raw.parse::<i32>().ok()?;
            NaiveDate::from_ymd_opt(year, 1, 1)
        }
        7 => NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d").ok(),
        10 => NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok(),
        _ => None,
    }?;

    date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc())
}

/// Return the first candidate that parses as a FHIR date.
///
/// Callers order candidates by preference, typically an explicit `dateTime` followed by a
/// `Period.start`.
pub fn best_date(candidates: &[Option<&str>]) -> Option<DateTime<Utc>> {
    candidates
        .iter()
        .find_map(|candidate| parse_fhir_date(*candidate))
}

/// Trimmed, non-empty copy of `value`.
pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
