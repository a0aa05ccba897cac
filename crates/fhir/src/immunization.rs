//! FHIR `Immunization` wire model and its mapping to the internal [`Vaccination`].
//!
//! An immunization without a usable occurrence keeps `administered_date` unset and warns;
//! the administration date is never filled in from the mapping time.

use crate::constants::{systems, IMMUNIZATION_ID_PREFIX};
use crate::datatypes::{join_annotations, Annotation, CodeableConcept, Meta, Reference};
use crate::extract::{
    best_date, code_for_system, codeable_concept_text, non_empty, reference_display,
};
use crate::resource::impl_fhir_resource;
use crate::result::{MappingContext, MappingResult, Provenance};
use crate::vocabulary::{StatusTable, VocabularyCode};
use crate::MappingOptions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Public domain-level types
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VaccinationStatus {
    Completed,
    EnteredInError,
    NotDone,
}

impl VocabularyCode for VaccinationStatus {
    fn as_str(self) -> &'static str {
        match self {
            VaccinationStatus::Completed => "completed",
            VaccinationStatus::EnteredInError => "entered-in-error",
            VaccinationStatus::NotDone => "not-done",
        }
    }
}

/// An administered (or refused) vaccine dose derived from a FHIR `Immunization`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vaccination {
    pub id: String,
    pub vaccine_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cvx_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub administered_date: Option<DateTime<Utc>>,
    pub status: VaccinationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_number: Option<String>,
    /// Dose position in the series, e.g. `"2"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dose_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performer: Option<String>,
    /// Why the dose was not given, for `not-done` records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub provenance: Provenance,
}

// ============================================================================
// Wire types
// ============================================================================

/// Wire representation of a FHIR R4 `Immunization`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FhirImmunization {
    pub resource_type: String,
    pub id: Option<String>,
    pub meta: Option<Meta>,
    pub status: Option<String>,
    pub status_reason: Option<CodeableConcept>,
    pub vaccine_code: Option<CodeableConcept>,
    pub occurrence_date_time: Option<String>,
    pub occurrence_string: Option<String>,
    pub lot_number: Option<String>,
    pub site: Option<CodeableConcept>,
    pub route: Option<CodeableConcept>,
    pub performer: Vec<ImmunizationPerformer>,
    pub protocol_applied: Vec<ProtocolApplied>,
    pub note: Vec<Annotation>,
}

/// The `Immunization.performer` backbone element.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImmunizationPerformer {
    pub actor: Option<Reference>,
}

/// The `Immunization.protocolApplied` backbone element.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ProtocolApplied {
    pub dose_number_positive_int: Option<u32>,
    pub dose_number_string: Option<String>,
}

impl_fhir_resource!(FhirImmunization, "Immunization");

const STATUS: StatusTable<VaccinationStatus> = StatusTable {
    field: "Immunization.status",
    field_es: "estado de la vacuna",
    entries: &[
        ("completed", VaccinationStatus::Completed),
        ("entered-in-error", VaccinationStatus::EnteredInError),
        ("not-done", VaccinationStatus::NotDone),
    ],
    default: VaccinationStatus::Completed,
};

// ============================================================================
// Mapping
// ============================================================================

/// Map a FHIR `Immunization` to an internal [`Vaccination`].
pub fn map_immunization(
    resource: &FhirImmunization,
    options: &MappingOptions,
) -> MappingResult<Vaccination> {
    let mut ctx = MappingContext::begin(resource, options);

    let vaccine_name = codeable_concept_text(resource.vaccine_code.as_ref());
    if vaccine_name.is_empty() {
        ctx.warn(
            "Immunization has no vaccine code or name",
            "La vacuna no tiene código ni nombre",
        );
    }

    let administered_date = best_date(&[
        resource.occurrence_date_time.as_deref(),
        resource.occurrence_string.as_deref(),
    ]);
    if administered_date.is_none() {
        ctx.warn(
            "Immunization has no administration date",
            "La vacuna no tiene fecha de aplicación",
        );
    }

    let vaccination = Vaccination {
        id: ctx.entity_id(IMMUNIZATION_ID_PREFIX),
        vaccine_name,
        cvx_code: code_for_system(resource.vaccine_code.as_ref(), systems::CVX),
        administered_date,
        status: STATUS.resolve(resource.status.as_deref(), &mut ctx),
        lot_number: non_empty(resource.lot_number.as_deref()),
        dose_number: resource.protocol_applied.first().and_then(dose_number),
        site: concept_text(resource.site.as_ref()),
        route: concept_text(resource.route.as_ref()),
        performer: resource
            .performer
            .iter()
            .find_map(|p| reference_display(p.actor.as_ref())),
        status_reason: concept_text(resource.status_reason.as_ref()),
        notes: join_annotations(&resource.note),
        provenance: ctx.provenance(resource.meta.as_ref()),
    };

    ctx.finish(vaccination)
}

fn dose_number(protocol: &ProtocolApplied) -> Option<String> {
    protocol
        .dose_number_positive_int
        .map(|n| n.to_string())
        .or_else(|| non_empty(protocol.dose_number_string.as_deref()))
}

fn concept_text(concept: Option<&CodeableConcept>) -> Option<String> {
    let text = codeable_concept_text(concept);
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_resource;

    const INFLUENZA: &str = r#"{
        "resourceType": "Immunization",
        "id": "imm-1",
        "meta": { "lastUpdated": "2023-10-05T16:00:00Z" },
        "status": "completed",
        "vaccineCode": {
            "coding": [{ "system": "http://hl7.org/fhir/sid/cvx", "code": "150", "display": "Influenza, injectable, quadrivalent" }],
            "text": "Vacuna contra la influenza"
        },
        "occurrenceDateTime": "2023-10-05T10:30:00-05:00",
        "lotNumber": "FL2023-88",
        "site": { "coding": [{ "code": "LA", "display": "Left arm" }], "text": "Brazo izquierdo" },
        "route": { "coding": [{ "code": "IM", "display": "Intramuscular" }] },
        "performer": [{ "actor": { "reference": "Practitioner/7", "display": "Enf. Lucía Gómez" } }],
        "protocolApplied": [{ "doseNumberPositiveInt": 1 }]
    }"#;

    fn parse(json: &str) -> FhirImmunization {
        parse_resource(json).expect("parse immunization")
    }

    #[test]
    fn maps_completed_immunization() {
        let result = map_immunization(&parse(INFLUENZA), &MappingOptions::default());
        let vaccination = &result.data;

        assert!(
            result.warnings.is_empty(),
            "warnings: {:?}",
            result.warnings
        );
        assert_eq!(vaccination.id, "fhir-imm-imm-1");
        assert_eq!(vaccination.vaccine_name, "Vacuna contra la influenza");
        assert_eq!(vaccination.cvx_code.as_deref(), Some("150"));
        assert_eq!(vaccination.status, VaccinationStatus::Completed);
        assert_eq!(
            vaccination
                .administered_date
                .map(|d| d.to_rfc3339())
                .as_deref(),
            Some("2023-10-05T15:30:00+00:00")
        );
        assert_eq!(vaccination.lot_number.as_deref(), Some("FL2023-88"));
        assert_eq!(vaccination.dose_number.as_deref(), Some("1"));
        assert_eq!(vaccination.site.as_deref(), Some("Brazo izquierdo"));
        assert_eq!(vaccination.route.as_deref(), Some("Intramuscular"));
        assert_eq!(vaccination.performer.as_deref(), Some("Enf. Lucía Gómez"));
        assert_eq!(vaccination.provenance.fhir_reference, "Immunization/imm-1");
    }

    #[test]
    fn missing_occurrence_is_none_with_warning() {
        let input = r#"{
            "resourceType": "Immunization",
            "id": "imm-2",
            "status": "completed",
            "vaccineCode": { "text": "Hepatitis B" }
        }"#;
        let result = map_immunization(&parse(input), &MappingOptions::default());

        assert_eq!(result.data.administered_date, None);
        assert_eq!(result.warnings, ["Immunization has no administration date"]);
        assert_eq!(
            result.warnings_es,
            ["La vacuna no tiene fecha de aplicación"]
        );
    }

    #[test]
    fn occurrence_string_is_used_when_parseable() {
        let input = r#"{
            "resourceType": "Immunization",
            "id": "imm-3",
            "status": "completed",
            "vaccineCode": { "text": "Tdap" },
            "occurrenceString": "2019-04"
        }"#;
        let result = map_immunization(&parse(input), &MappingOptions::default());

        assert_eq!(
            result
                .data
                .administered_date
                .map(|d| d.to_rfc3339())
                .as_deref(),
            Some("2019-04-01T00:00:00+00:00")
        );
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn not_done_keeps_status_reason() {
        let input = r#"{
            "resourceType": "Immunization",
            "id": "imm-4",
            "status": "not-done",
            "statusReason": { "coding": [{ "code": "PATOBJ", "display": "patient objection" }], "text": "Rechazo del paciente" },
            "vaccineCode": { "coding": [{ "system": "http://hl7.org/fhir/sid/cvx", "code": "208" }] },
            "occurrenceDateTime": "2021-06-01",
            "protocolApplied": [{ "doseNumberString": "refuerzo" }]
        }"#;
        let result = map_immunization(&parse(input), &MappingOptions::default());

        assert_eq!(result.data.status, VaccinationStatus::NotDone);
        assert_eq!(
            result.data.status_reason.as_deref(),
            Some("Rechazo del paciente")
        );
        assert_eq!(result.data.vaccine_name, "208");
        assert_eq!(result.data.dose_number.as_deref(), Some("refuerzo"));
    }

    #[test]
    fn unknown_status_defaults_to_completed() {
        let input = INFLUENZA.replace(r#""status": "completed""#, r#""status": "given""#);
        let result = map_immunization(&parse(&input), &MappingOptions::default());

        assert_eq!(result.data.status, VaccinationStatus::Completed);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("'given'"));
    }
}
