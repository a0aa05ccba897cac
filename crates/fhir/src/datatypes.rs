//! FHIR R4 general-purpose datatypes (wire models).
//!
//! Only the elements read by the mappers are modelled. Every element is optional and
//! unknown keys are ignored.
//!
//! Resource-specific backbone elements (for example `Observation.referenceRange`) live
//! next to the resource that owns them.

use serde::Deserialize;

/// [Coding](https://hl7.org/fhir/R4/datatypes.html#Coding): one `system`/`code`/`display`
/// triple.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Coding {
    pub system: Option<String>,
    pub code: Option<String>,
    pub display: Option<String>,
}

/// [CodeableConcept](https://hl7.org/fhir/R4/datatypes.html#CodeableConcept): optional
/// free text plus an ordered list of codings.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CodeableConcept {
    pub coding: Vec<Coding>,
    pub text: Option<String>,
}

impl CodeableConcept {
    /// Code of the first coding entry, if any.
    pub fn first_code(&self) -> Option<&str> {
        self.coding.first().and_then(|c| c.code.as_deref())
    }
}

/// [Reference](https://hl7.org/fhir/R4/references.html#Reference).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Reference {
    pub reference: Option<String>,
    pub display: Option<String>,
}

/// [Period](https://hl7.org/fhir/R4/datatypes.html#Period).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Period {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// [Quantity](https://hl7.org/fhir/R4/datatypes.html#Quantity).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Quantity {
    pub value: Option<f64>,
    pub comparator: Option<String>,
    pub unit: Option<String>,
    pub system: Option<String>,
    pub code: Option<String>,
}

impl Quantity {
    /// Human unit, falling back to the UCUM code when `unit` is absent.
    pub fn display_unit(&self) -> Option<&str> {
        self.unit
            .as_deref()
            .or(self.code.as_deref())
            .filter(|u| !u.trim().is_empty())
    }
}

/// [Meta](https://hl7.org/fhir/R4/resource.html#Meta).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Meta {
    pub version_id: Option<String>,
    pub last_updated: Option<String>,
}

/// [HumanName](https://hl7.org/fhir/R4/datatypes.html#HumanName).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct HumanName {
    #[serde(rename = "use")]
    pub use_type: Option<String>,
    pub text: Option<String>,
    pub family: Option<String>,
    pub given: Vec<String>,
}

/// [Address](https://hl7.org/fhir/R4/datatypes.html#Address).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Address {
    #[serde(rename = "use")]
    pub use_type: Option<String>,
    pub text: Option<String>,
    pub line: Vec<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

/// [ContactPoint](https://hl7.org/fhir/R4/datatypes.html#ContactPoint).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ContactPoint {
    pub system: Option<String>,
    pub value: Option<String>,
    #[serde(rename = "use")]
    pub use_type: Option<String>,
}

/// [Annotation](https://hl7.org/fhir/R4/datatypes.html#Annotation).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Annotation {
    pub text: Option<String>,
}

/// [Timing](https://hl7.org/fhir/R4/datatypes.html#Timing).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Timing {
    pub repeat: Option<TimingRepeat>,
    pub code: Option<CodeableConcept>,
}

/// The `Timing.repeat` element, reduced to the fields needed for a frequency sentence.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TimingRepeat {
    pub frequency: Option<u32>,
    pub period: Option<f64>,
    pub period_unit: Option<String>,
}

/// [Dosage](https://hl7.org/fhir/R4/dosage.html).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Dosage {
    pub text: Option<String>,
    pub patient_instruction: Option<String>,
    pub timing: Option<Timing>,
    pub as_needed_boolean: Option<bool>,
    pub route: Option<CodeableConcept>,
    pub dose_and_rate: Vec<DoseAndRate>,
}

/// The `Dosage.doseAndRate` element.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DoseAndRate {
    pub dose_quantity: Option<Quantity>,
}

/// Join the non-empty `text` of each annotation with a blank line.
pub(crate) fn join_annotations(notes: &[Annotation]) -> Option<String> {
    let texts: Vec<&str> = notes
        .iter()
        .filter_map(|n| n.text.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    if texts.is_empty() {
        None
    } else {
        Some(texts.join("\n\n"))
    }
}
