//! FHIR `MedicationRequest` wire model and its mapping to the internal [`Medication`].
//!
//! Only the first `dosageInstruction` is read. Dose, frequency and route are taken from
//! it in the order: structured quantity, then free text.

use crate::constants::{systems, MEDICATION_ID_PREFIX};
use crate::datatypes::{CodeableConcept, Dosage, Meta, Period, Reference};
use crate::extract::{
    code_for_system, codeable_concept_text, non_empty, parse_fhir_date, reference_display,
};
use crate::resource::impl_fhir_resource;
use crate::result::{MappingContext, MappingResult, Provenance};
use crate::timing::format_frequency;
use crate::vocabulary::{StatusTable, VocabularyCode};
use crate::MappingOptions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Public domain-level types
// ============================================================================

/// Prescription lifecycle as shown to patients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MedicationStatus {
    Active,
    OnHold,
    Completed,
    Discontinued,
    EnteredInError,
}

impl VocabularyCode for MedicationStatus {
    fn as_str(self) -> &'static str {
        match self {
            MedicationStatus::Active => "active",
            MedicationStatus::OnHold => "on-hold",
            MedicationStatus::Completed => "completed",
            MedicationStatus::Discontinued => "discontinued",
            MedicationStatus::EnteredInError => "entered-in-error",
        }
    }
}

/// A prescribed medication derived from a FHIR `MedicationRequest`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    /// `fhir-med-<id>`.
    pub id: String,

    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rxnorm_code: Option<String>,

    /// `"<value> <unit>"`, or the dosage free text, or empty.
    pub dosage: String,

    /// Spanish frequency sentence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,

    pub as_needed: bool,

    /// Every `reasonCode`, comma-separated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indication: Option<String>,

    pub status: MedicationStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prescriber: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    #[serde(flatten)]
    pub provenance: Provenance,
}

// ============================================================================
// Wire types
// ============================================================================

/// Wire representation of a FHIR R4 `MedicationRequest`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FhirMedicationRequest {
    pub resource_type: String,
    pub id: Option<String>,
    pub meta: Option<Meta>,
    pub status: Option<String>,
    pub medication_codeable_concept: Option<CodeableConcept>,
    pub medication_reference: Option<Reference>,
    pub authored_on: Option<String>,
    pub requester: Option<Reference>,
    pub reason_code: Vec<CodeableConcept>,
    pub dosage_instruction: Vec<Dosage>,
    pub dispense_request: Option<DispenseRequest>,
}

/// The `MedicationRequest.dispenseRequest` backbone element.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DispenseRequest {
    pub validity_period: Option<Period>,
}

impl_fhir_resource!(FhirMedicationRequest, "MedicationRequest");

/// `draft` and `unknown` read as active.
const STATUS: StatusTable<MedicationStatus> = StatusTable {
    field: "MedicationRequest.status",
    field_es: "estado de la receta",
    entries: &[
        ("active", MedicationStatus::Active),
        ("draft", MedicationStatus::Active),
        ("unknown", MedicationStatus::Active),
        ("on-hold", MedicationStatus::OnHold),
        ("completed", MedicationStatus::Completed),
        ("stopped", MedicationStatus::Discontinued),
        ("cancelled", MedicationStatus::Discontinued),
        ("entered-in-error", MedicationStatus::EnteredInError),
    ],
    default: MedicationStatus::Active,
};

// ============================================================================
// Mapping
// ============================================================================

/// Map a FHIR `MedicationRequest` to an internal [`Medication`].
pub fn map_medication(
    resource: &FhirMedicationRequest,
    options: &MappingOptions,
) -> MappingResult<Medication> {
    let mut ctx = MappingContext::begin(resource, options);

    let concept = resource.medication_codeable_concept.as_ref();
    let mut name = codeable_concept_text(concept);
    if name.is_empty() {
        name = reference_display(resource.medication_reference.as_ref()).unwrap_or_default();
    }
    if name.is_empty() {
        ctx.warn(
            "MedicationRequest has no medication name",
            "La receta no tiene nombre de medicamento",
        );
    }

    let dosage = resource.dosage_instruction.first();
    let indications: Vec<String> = resource
        .reason_code
        .iter()
        .map(|reason| codeable_concept_text(Some(reason)))
        .filter(|text| !text.is_empty())
        .collect();

    let medication = Medication {
        id: ctx.entity_id(MEDICATION_ID_PREFIX),
        name,
        rxnorm_code: code_for_system(concept, systems::RXNORM),
        dosage: dose_text(dosage),
        frequency: dosage.and_then(frequency_text),
        route: dosage
            .map(|d| codeable_concept_text(d.route.as_ref()))
            .filter(|r| !r.is_empty()),
        as_needed: dosage.and_then(|d| d.as_needed_boolean).unwrap_or(false),
        indication: if indications.is_empty() {
            None
        } else {
            Some(indications.join(", "))
        },
        status: STATUS.resolve(resource.status.as_deref(), &mut ctx),
        start_date: parse_fhir_date(resource.authored_on.as_deref()),
        end_date: parse_fhir_date(
            resource
                .dispense_request
                .as_ref()
                .and_then(|d| d.validity_period.as_ref())
                .and_then(|p| p.end.as_deref()),
        ),
        prescriber: reference_display(resource.requester.as_ref()),
        instructions: dosage.and_then(|d| non_empty(d.patient_instruction.as_deref())),
        provenance: ctx.provenance(resource.meta.as_ref()),
    };

    ctx.finish(medication)
}

/// `"<value> <unit>"` from the first dose quantity, else the dosage free text.
fn dose_text(dosage: Option<&Dosage>) -> String {
    let Some(dosage) = dosage else {
        return String::new();
    };

    let quantity = dosage
        .dose_and_rate
        .first()
        .and_then(|dr| dr.dose_quantity.as_ref());

    if let Some(quantity) = quantity {
        if let Some(value) = quantity.value {
            return match quantity.display_unit() {
                Some(unit) => format!("{value} {unit}"),
                None => value.to_string(),
            };
        }
    }

    non_empty(dosage.text.as_deref()).unwrap_or_default()
}

/// Structured `timing.repeat` sentence, else the timing code's text.
fn frequency_text(dosage: &Dosage) -> Option<String> {
    let timing = dosage.timing.as_ref()?;

    timing
        .repeat
        .as_ref()
        .and_then(format_frequency)
        .or_else(|| Some(codeable_concept_text(timing.code.as_ref())).filter(|t| !t.is_empty()))
}
