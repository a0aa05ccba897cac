//! FHIR `Condition` wire model and its mapping to the internal [`Condition`].
//!
//! Responsibilities:
//! - Define the internal diagnosis entity and its status vocabularies
//! - Define a lenient wire model for the `Condition` elements that are read
//! - Translate clinical/verification status and severity through closed tables
//!
//! Notes:
//! - The coarse [`ConditionStatus`] is derived, not read: see [`infer_status`]

use crate::constants::{systems, CONDITION_ID_PREFIX};
use crate::datatypes::{join_annotations, Annotation, CodeableConcept, Meta, Period};
use crate::extract::{best_date, code_for_system, codeable_concept_text, parse_fhir_date};
use crate::resource::impl_fhir_resource;
use crate::result::{MappingContext, MappingResult, Provenance};
use crate::vocabulary::{CodeTable, StatusTable, VocabularyCode};
use crate::MappingOptions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Public domain-level types
// ============================================================================

/// Coarse lifecycle used by patient-facing views.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionStatus {
    Active,
    Chronic,
    Resolved,
}

/// `Condition.clinicalStatus` translated to the internal vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClinicalStatus {
    Active,
    Recurrence,
    Relapse,
    Inactive,
    Remission,
    Resolved,
    Unknown,
}

impl VocabularyCode for ClinicalStatus {
    fn as_str(self) -> &'static str {
        match self {
            ClinicalStatus::Active => "active",
            ClinicalStatus::Recurrence => "recurrence",
            ClinicalStatus::Relapse => "relapse",
            ClinicalStatus::Inactive => "inactive",
            ClinicalStatus::Remission => "remission",
            ClinicalStatus::Resolved => "resolved",
            ClinicalStatus::Unknown => "unknown",
        }
    }
}

/// `Condition.verificationStatus` translated to the internal vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationStatus {
    Unconfirmed,
    Provisional,
    Differential,
    Confirmed,
    Refuted,
    EnteredInError,
    Unknown,
}

impl VocabularyCode for VerificationStatus {
    fn as_str(self) -> &'static str {
        match self {
            VerificationStatus::Unconfirmed => "unconfirmed",
            VerificationStatus::Provisional => "provisional",
            VerificationStatus::Differential => "differential",
            VerificationStatus::Confirmed => "confirmed",
            VerificationStatus::Refuted => "refuted",
            VerificationStatus::EnteredInError => "entered-in-error",
            VerificationStatus::Unknown => "unknown",
        }
    }
}

/// Condition severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

/// A diagnosis derived from a FHIR `Condition`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// `fhir-cond-<id>`.
    pub id: String,

    /// Display name of the condition code (may be empty).
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub icd10_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub snomed_code: Option<String>,

    pub status: ConditionStatus,
    pub clinical_status: ClinicalStatus,
    pub verification_status: VerificationStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,

    /// From `recordedDate`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosed_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub onset_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub abatement_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    #[serde(flatten)]
    pub provenance: Provenance,
}

// ============================================================================
// Wire types
// ============================================================================

/// Wire representation of a FHIR R4 `Condition`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FhirCondition {
    pub resource_type: String,
    pub id: Option<String>,
    pub meta: Option<Meta>,
    pub clinical_status: Option<CodeableConcept>,
    pub verification_status: Option<CodeableConcept>,
    pub severity: Option<CodeableConcept>,
    pub code: Option<CodeableConcept>,
    pub onset_date_time: Option<String>,
    pub onset_period: Option<Period>,
    pub abatement_date_time: Option<String>,
    pub abatement_period: Option<Period>,
    pub recorded_date: Option<String>,
    pub note: Vec<Annotation>,
}

impl_fhir_resource!(FhirCondition, "Condition");

// ============================================================================
// Vocabulary tables
// ============================================================================

const CLINICAL_STATUS: StatusTable<ClinicalStatus> = StatusTable {
    field: "Condition.clinicalStatus",
    field_es: "estado clínico de la condición",
    entries: &[
        ("active", ClinicalStatus::Active),
        ("recurrence", ClinicalStatus::Recurrence),
        ("relapse", ClinicalStatus::Relapse),
        ("inactive", ClinicalStatus::Inactive),
        ("remission", ClinicalStatus::Remission),
        ("resolved", ClinicalStatus::Resolved),
    ],
    default: ClinicalStatus::Unknown,
};

const VERIFICATION_STATUS: StatusTable<VerificationStatus> = StatusTable {
    field: "Condition.verificationStatus",
    field_es: "estado de verificación de la condición",
    entries: &[
        ("unconfirmed", VerificationStatus::Unconfirmed),
        ("provisional", VerificationStatus::Provisional),
        ("differential", VerificationStatus::Differential),
        ("confirmed", VerificationStatus::Confirmed),
        ("refuted", VerificationStatus::Refuted),
        ("entered-in-error", VerificationStatus::EnteredInError),
    ],
    default: VerificationStatus::Unknown,
};

/// Severity codes: the SNOMED CT concepts bound by the FHIR condition-severity value set,
/// plus their plain-text equivalents.
const SEVERITY: CodeTable<Severity> = CodeTable {
    field: "Condition.severity",
    field_es: "gravedad de la condición",
    entries: &[
        ("255604002", Severity::Mild),
        ("6736007", Severity::Moderate),
        ("24484000", Severity::Severe),
        ("mild", Severity::Mild),
        ("moderate", Severity::Moderate),
        ("severe", Severity::Severe),
    ],
};

// ============================================================================
// Mapping
// ============================================================================

/// Map a FHIR `Condition` to an internal [`Condition`].
pub fn map_condition(
    resource: &FhirCondition,
    options: &MappingOptions,
) -> MappingResult<Condition> {
    let mut ctx = MappingContext::begin(resource, options);

    let name = codeable_concept_text(resource.code.as_ref());
    if name.is_empty() {
        ctx.warn(
            "Condition has no code or name",
            "La condición no tiene código ni nombre",
        );
    }

    let clinical_status = CLINICAL_STATUS.resolve(
        resource
            .clinical_status
            .as_ref()
            .and_then(|c| c.first_code()),
        &mut ctx,
    );
    let verification_status = VERIFICATION_STATUS.resolve(
        resource
            .verification_status
            .as_ref()
            .and_then(|c| c.first_code()),
        &mut ctx,
    );
    let severity = SEVERITY.resolve(
        resource.severity.as_ref().and_then(|c| c.first_code()),
        &mut ctx,
    );

    let onset_date = best_date(&[
        resource.onset_date_time.as_deref(),
        resource
            .onset_period
            .as_ref()
            .and_then(|p| p.start.as_deref()),
    ]);
    let abatement_date = best_date(&[
        resource.abatement_date_time.as_deref(),
        resource
            .abatement_period
            .as_ref()
            .and_then(|p| p.end.as_deref()),
    ]);

    let condition = Condition {
        id: ctx.entity_id(CONDITION_ID_PREFIX),
        name,
        icd10_code: code_for_system(resource.code.as_ref(), systems::ICD10_CM),
        snomed_code: code_for_system(resource.code.as_ref(), systems::SNOMED_CT),
        status: infer_status(clinical_status, abatement_date.is_some()),
        clinical_status,
        verification_status,
        severity,
        diagnosed_date: parse_fhir_date(resource.recorded_date.as_deref()),
        onset_date,
        abatement_date,
        notes: join_annotations(&resource.note),
        provenance: ctx.provenance(resource.meta.as_ref()),
    };

    ctx.finish(condition)
}

/// Derive the coarse status.
///
/// A recorded abatement always means resolved; otherwise recurrence and relapse read as
/// chronic, and inactive/remission/resolved read as resolved.
fn infer_status(clinical_status: ClinicalStatus, abated: bool) -> ConditionStatus {
    if abated {
        return ConditionStatus::Resolved;
    }

    match clinical_status {
        ClinicalStatus::Resolved | ClinicalStatus::Inactive | ClinicalStatus::Remission => {
            ConditionStatus::Resolved
        }
        ClinicalStatus::Recurrence | ClinicalStatus::Relapse => ConditionStatus::Chronic,
        ClinicalStatus::Active | ClinicalStatus::Unknown => ConditionStatus::Active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_resource;

    const DIABETES: &str = r#"{
        "resourceType": "Condition",
        "id": "123",
        "meta": { "lastUpdated": "2024-05-01T12:00:00Z" },
        "clinicalStatus": {
            "coding": [{
                "system": "http://terminology.hl7.org/CodeSystem/condition-clinical",
                "code": "active"
            }]
        },
        "verificationStatus": {
            "coding": [{
                "system": "http://terminology.hl7.org/CodeSystem/condition-ver-status",
                "code": "confirmed"
            }]
        },
        "severity": {
            "coding": [{ "system": "http://snomed.info/sct", "code": "6736007", "display": "Moderate" }]
        },
        "code": {
            "coding": [
                { "system": "http://snomed.info/sct", "code": "44054006", "display": "Type 2 diabetes mellitus" },
                { "system": "http://hl7.org/fhir/sid/icd-10-cm", "code": "E11.9" }
            ],
            "text": "Diabetes tipo 2"
        },
        "onsetPeriod": { "start": "2019-06" },
        "recordedDate": "2019-07-02",
        "note": [{ "text": "Controlada con dieta" }]
    }"#;

    fn parse(json: &str) -> FhirCondition {
        parse_resource(json).expect("parse condition")
    }

    #[test]
    fn maps_complete_condition() {
        let result = map_condition(&parse(DIABETES), &MappingOptions::default());
        let condition = &result.data;

        assert!(
            result.warnings.is_empty(),
            "warnings: {:?}",
            result.warnings
        );
        assert_eq!(result.fhir_resource_id, "123");
        assert_eq!(condition.id, "fhir-cond-123");
        assert_eq!(condition.name, "Diabetes tipo 2");
        assert_eq!(condition.icd10_code.as_deref(), Some("E11.9"));
        assert_eq!(condition.snomed_code.as_deref(), Some("44054006"));
        assert_eq!(condition.clinical_status, ClinicalStatus::Active);
        assert_eq!(condition.verification_status, VerificationStatus::Confirmed);
        assert_eq!(condition.status, ConditionStatus::Active);
        assert_eq!(condition.severity, Some(Severity::Moderate));
        assert_eq!(
            condition.onset_date.map(|d| d.to_rfc3339()).as_deref(),
            Some("2019-06-01T00:00:00+00:00")
        );
        assert!(condition.diagnosed_date.is_some());
        assert_eq!(condition.notes.as_deref(), Some("Controlada con dieta"));
        assert_eq!(condition.provenance.fhir_reference, "Condition/123");
    }

    #[test]
    fn unrecognized_clinical_status_is_unknown_with_warning() {
        let input = DIABETES.replace(r#""code": "active""#, r#""code": "dormant""#);
        let result = map_condition(&parse(&input), &MappingOptions::default());

        assert_eq!(result.data.clinical_status, ClinicalStatus::Unknown);
        assert!(!result.warnings.is_empty());
        assert!(result.warnings.iter().any(|w| w.contains("dormant")));
        assert_eq!(result.warnings.len(), result.warnings_es.len());
    }

    #[test]
    fn minimal_condition_warns_but_maps() {
        let result = map_condition(
            &parse(r#"{ "resourceType": "Condition", "id": "c9" }"#),
            &MappingOptions::default(),
        );

        assert_eq!(result.data.name, "");
        assert_eq!(result.data.clinical_status, ClinicalStatus::Unknown);
        assert_eq!(result.data.verification_status, VerificationStatus::Unknown);
        assert_eq!(result.data.severity, None);
        assert_eq!(result.data.status, ConditionStatus::Active);
        // name, clinicalStatus, verificationStatus
        assert_eq!(result.warnings.len(), 3);
    }

    #[test]
    fn severity_requires_a_full_code_match() {
        let input = DIABETES.replace(r#""code": "6736007""#, r#""code": "moderately-severe""#);
        let result = map_condition(&parse(&input), &MappingOptions::default());

        assert_eq!(result.data.severity, None);
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("Condition.severity")));
    }

    #[test]
    fn abatement_resolves_condition() {
        let input = DIABETES.replace(
            r#""recordedDate""#,
            r#""abatementDateTime": "2023-01-10", "recordedDate""#,
        );
        let result = map_condition(&parse(&input), &MappingOptions::default());

        assert_eq!(result.data.status, ConditionStatus::Resolved);
        assert!(result.data.abatement_date.is_some());
    }

    #[test]
    fn infers_coarse_status_from_clinical_status() {
        assert_eq!(
            infer_status(ClinicalStatus::Relapse, false),
            ConditionStatus::Chronic
        );
        assert_eq!(
            infer_status(ClinicalStatus::Remission, false),
            ConditionStatus::Resolved
        );
        assert_eq!(
            infer_status(ClinicalStatus::Unknown, false),
            ConditionStatus::Active
        );
        assert_eq!(
            infer_status(ClinicalStatus::Active, true),
            ConditionStatus::Resolved
        );
    }

    #[test]
    fn mapping_is_idempotent() {
        let resource = parse(DIABETES);
        let first = map_condition(&resource, &MappingOptions::default());
        let second = map_condition(&resource, &MappingOptions::default());

        assert_eq!(first.data, second.data);
        assert_eq!(first.warnings, second.warnings);
    }

    #[test]
    fn serialises_internal_vocabulary() {
        let result = map_condition(&parse(DIABETES), &MappingOptions::default());
        let json = serde_json::to_value(&result.data).expect("serialise");

        assert_eq!(json["id"], "fhir-cond-123");
        assert_eq!(json["icd10Code"], "E11.9");
        assert_eq!(json["clinicalStatus"], "active");
        assert_eq!(json["source"], "fhir");
        assert_eq!(json["fhirReference"], "Condition/123");
        assert!(json.get("abatementDate").is_none());
    }
}
