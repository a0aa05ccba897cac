//! FHIR `Observation` wire model and its mapping to the internal [`LabResult`].
//!
//! Responsibilities:
//! - Resolve the observed value from whichever `value[x]` variant is populated
//! - Classify the result through the HL7 v3 ObservationInterpretation table, or against
//!   the reference range when no interpretation is supplied
//! - Flatten panel `component` entries one level deep
//!
//! Notes:
//! - Value priority is quantity, string, boolean, integer, then CodeableConcept
//! - Nested components of components do not exist in FHIR R4 and are not modelled

use crate::constants::{systems, BOOLEAN_NEGATIVE, BOOLEAN_POSITIVE, OBSERVATION_ID_PREFIX};
use crate::datatypes::{join_annotations, Annotation, CodeableConcept, Meta, Period, Quantity};
use crate::extract::{best_date, code_for_system, codeable_concept_text, non_empty};
use crate::resource::impl_fhir_resource;
use crate::result::{MappingContext, MappingResult, Provenance};
use crate::vocabulary::{CodeTable, StatusTable, VocabularyCode};
use crate::MappingOptions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Public domain-level types
// ============================================================================

/// Clinical interpretation of a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Interpretation {
    CriticalLow,
    Low,
    Normal,
    High,
    CriticalHigh,
    Abnormal,
}

/// Result lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObservationStatus {
    Pending,
    Preliminary,
    Final,
    Amended,
    Cancelled,
}

impl VocabularyCode for ObservationStatus {
    fn as_str(self) -> &'static str {
        match self {
            ObservationStatus::Pending => "pending",
            ObservationStatus::Preliminary => "preliminary",
            ObservationStatus::Final => "final",
            ObservationStatus::Amended => "amended",
            ObservationStatus::Cancelled => "cancelled",
        }
    }
}

/// Bounds of the first `referenceRange` entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// One sub-result of a panel observation.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentResult {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loinc_code: Option<String>,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<Interpretation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_range: Option<ReferenceRange>,
}

/// A lab or observation result derived from a FHIR `Observation`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabResult {
    /// `fhir-obs-<id>`.
    pub id: String,

    pub test_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub loinc_code: Option<String>,

    /// First category code, e.g. `laboratory` or `vital-signs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Display form of the value (may be empty for panels).
    pub value: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_value: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<Interpretation>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_range: Option<ReferenceRange>,

    pub status: ObservationStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    pub component_results: Vec<ComponentResult>,

    #[serde(flatten)]
    pub provenance: Provenance,
}

// ============================================================================
// Wire types
// ============================================================================

/// Wire representation of a FHIR R4 `Observation`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FhirObservation {
    pub resource_type: String,
    pub id: Option<String>,
    pub meta: Option<Meta>,
    pub status: Option<String>,
    pub category: Vec<CodeableConcept>,
    pub code: Option<CodeableConcept>,
    pub effective_date_time: Option<String>,
    pub effective_period: Option<Period>,
    pub issued: Option<String>,
    #[serde(flatten)]
    pub value: ObservationValue,
    pub interpretation: Vec<CodeableConcept>,
    pub reference_range: Vec<ObservationReferenceRange>,
    pub component: Vec<ObservationComponent>,
    pub note: Vec<Annotation>,
}

/// The `value[x]` variants read by the mapper, shared by observations and components.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ObservationValue {
    pub value_quantity: Option<Quantity>,
    pub value_string: Option<String>,
    pub value_boolean: Option<bool>,
    pub value_integer: Option<i64>,
    pub value_codeable_concept: Option<CodeableConcept>,
}

/// The `Observation.referenceRange` backbone element.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObservationReferenceRange {
    pub low: Option<Quantity>,
    pub high: Option<Quantity>,
    pub text: Option<String>,
}

/// The `Observation.component` backbone element.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ObservationComponent {
    pub code: Option<CodeableConcept>,
    #[serde(flatten)]
    pub value: ObservationValue,
    pub interpretation: Vec<CodeableConcept>,
    pub reference_range: Vec<ObservationReferenceRange>,
}

impl_fhir_resource!(FhirObservation, "Observation");

// ============================================================================
// Vocabulary tables
// ============================================================================

const STATUS: StatusTable<ObservationStatus> = StatusTable {
    field: "Observation.status",
    field_es: "estado del resultado",
    entries: &[
        ("registered", ObservationStatus::Pending),
        ("preliminary", ObservationStatus::Preliminary),
        ("final", ObservationStatus::Final),
        ("amended", ObservationStatus::Amended),
        ("corrected", ObservationStatus::Amended),
        ("cancelled", ObservationStatus::Cancelled),
        ("entered-in-error", ObservationStatus::Cancelled),
    ],
    default: ObservationStatus::Pending,
};

/// HL7 v3 ObservationInterpretation codes.
const INTERPRETATION: CodeTable<Interpretation> = CodeTable {
    field: "Observation.interpretation",
    field_es: "interpretación del resultado",
    entries: &[
        ("LL", Interpretation::CriticalLow),
        ("<", Interpretation::CriticalLow),
        ("L", Interpretation::Low),
        ("LU", Interpretation::Low),
        ("N", Interpretation::Normal),
        ("NEG", Interpretation::Normal),
        ("H", Interpretation::High),
        ("HU", Interpretation::High),
        ("HH", Interpretation::CriticalHigh),
        (">", Interpretation::CriticalHigh),
        ("A", Interpretation::Abnormal),
        ("AA", Interpretation::Abnormal),
        ("POS", Interpretation::Abnormal),
        ("ABN", Interpretation::Abnormal),
    ],
};

// ============================================================================
// Mapping
// ============================================================================

/// Map a FHIR `Observation` to an internal [`LabResult`].
pub fn map_observation(
    resource: &FhirObservation,
    options: &MappingOptions,
) -> MappingResult<LabResult> {
    let mut ctx = MappingContext::begin(resource, options);

    let test_name = codeable_concept_text(resource.code.as_ref());
    if test_name.is_empty() {
        ctx.warn(
            "Observation has no code or name",
            "La observación no tiene código ni nombre",
        );
    }

    let value = resolve_value(&resource.value);
    if value.is_none() && resource.component.is_empty() {
        ctx.warn("Observation has no value", "La observación no tiene valor");
    }
    let value = value.unwrap_or_default();

    let reference_range = first_reference_range(&resource.reference_range);
    let interpretation = interpret(
        &resource.interpretation,
        &value,
        reference_range.as_ref(),
        &mut ctx,
    );

    let component_results = resource
        .component
        .iter()
        .map(|component| map_component(component, &mut ctx))
        .collect();

    let result = LabResult {
        id: ctx.entity_id(OBSERVATION_ID_PREFIX),
        test_name,
        loinc_code: code_for_system(resource.code.as_ref(), systems::LOINC),
        category: resource
            .category
            .first()
            .and_then(|c| c.first_code())
            .and_then(|c| non_empty(Some(c))),
        value: value.text,
        numeric_value: value.numeric,
        unit: value.unit,
        interpretation,
        reference_range,
        status: STATUS.resolve(resource.status.as_deref(), &mut ctx),
        effective_date: best_date(&[
            resource.effective_date_time.as_deref(),
            resource
                .effective_period
                .as_ref()
                .and_then(|p| p.start.as_deref()),
            resource.issued.as_deref(),
        ]),
        notes: join_annotations(&resource.note),
        component_results,
        provenance: ctx.provenance(resource.meta.as_ref()),
    };

    ctx.finish(result)
}

fn map_component(component: &ObservationComponent, ctx: &mut MappingContext) -> ComponentResult {
    let name = codeable_concept_text(component.code.as_ref());
    if name.is_empty() {
        ctx.warn(
            "Observation component has no code or name",
            "Un componente de la observación no tiene código ni nombre",
        );
    }

    let value = resolve_value(&component.value).unwrap_or_default();
    let reference_range = first_reference_range(&component.reference_range);
    let interpretation = interpret(
        &component.interpretation,
        &value,
        reference_range.as_ref(),
        ctx,
    );

    ComponentResult {
        name,
        loinc_code: code_for_system(component.code.as_ref(), systems::LOINC),
        value: value.text,
        numeric_value: value.numeric,
        unit: value.unit,
        interpretation,
        reference_range,
    }
}

/// The value of an observation or component in display form.
#[derive(Debug, Default, PartialEq)]
struct ResolvedValue {
    text: String,
    numeric: Option<f64>,
    /// `Quantity.comparator`; the true value lies somewhere beyond `numeric`.
    comparator: Option<String>,
    unit: Option<String>,
}

/// Resolve the first populated `value[x]` variant.
fn resolve_value(value: &ObservationValue) -> Option<ResolvedValue> {
    if let Some(quantity) = &value.value_quantity {
        if let Some(number) = quantity.value {
            let comparator = non_empty(quantity.comparator.as_deref());
            return Some(ResolvedValue {
                text: format!("{}{number}", comparator.as_deref().unwrap_or_default()),
                numeric: Some(number),
                comparator,
                unit: quantity.display_unit().map(str::to_owned),
            });
        }
    }

    if let Some(text) = non_empty(value.value_string.as_deref()) {
        return Some(ResolvedValue {
            text,
            ..Default::default()
        });
    }

    if let Some(flag) = value.value_boolean {
        let text = if flag {
            BOOLEAN_POSITIVE
        } else {
            BOOLEAN_NEGATIVE
        };
        return Some(ResolvedValue {
            text: text.to_owned(),
            ..Default::default()
        });
    }

    if let Some(integer) = value.value_integer {
        return Some(ResolvedValue {
            text: integer.to_string(),
            numeric: Some(integer as f64),
            ..Default::default()
        });
    }

    let coded = codeable_concept_text(value.value_codeable_concept.as_ref());
    if !coded.is_empty() {
        return Some(ResolvedValue {
            text: coded,
            ..Default::default()
        });
    }

    None
}

fn first_reference_range(ranges: &[ObservationReferenceRange]) -> Option<ReferenceRange> {
    let range = ranges.first()?;
    let low = range.low.as_ref();
    let high = range.high.as_ref();

    let mapped = ReferenceRange {
        low: low.and_then(|q| q.value),
        high: high.and_then(|q| q.value),
        unit: low
            .and_then(Quantity::display_unit)
            .or_else(|| high.and_then(Quantity::display_unit))
            .map(str::to_owned),
        text: non_empty(range.text.as_deref()),
    };

    if mapped == ReferenceRange::default() {
        None
    } else {
        Some(mapped)
    }
}

/// Interpretation from the first coded interpretation, else from the reference range.
fn interpret(
    interpretation: &[CodeableConcept],
    value: &ResolvedValue,
    range: Option<&ReferenceRange>,
    ctx: &mut MappingContext,
) -> Option<Interpretation> {
    let code = interpretation.first().and_then(|c| c.first_code());
    if code.is_some_and(|c| !c.trim().is_empty()) {
        return INTERPRETATION.resolve(code, ctx);
    }

    classify_against_range(value.numeric?, value.comparator.as_deref(), range?)
}

/// Classify a value against the range bounds.
///
/// A comparator only yields the conclusion its direction proves: `<50` against a low bound
/// of 70 is low, while `<200` against 70-99 could be anything and stays unclassified.
fn classify_against_range(
    value: f64,
    comparator: Option<&str>,
    range: &ReferenceRange,
) -> Option<Interpretation> {
    let (low, high) = (range.low, range.high);
    if low.is_none() && high.is_none() {
        return None;
    }

    match comparator {
        None if low.is_some_and(|low| value < low) => Some(Interpretation::Low),
        None if high.is_some_and(|high| value > high) => Some(Interpretation::High),
        None => Some(Interpretation::Normal),
        Some("<") if low.is_some_and(|low| value <= low) => Some(Interpretation::Low),
        Some("<=") if low.is_some_and(|low| value < low) => Some(Interpretation::Low),
        Some(">") if high.is_some_and(|high| value >= high) => Some(Interpretation::High),
        Some(">=") if high.is_some_and(|high| value > high) => Some(Interpretation::High),
        Some(_) => None,
    }
}
