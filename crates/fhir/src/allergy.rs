//! FHIR `AllergyIntolerance` wire model and its mapping to the internal [`Allergy`].
//!
//! Every `reaction` entry is kept: its manifestations are flattened into one display
//! string, next to the reaction severity and free-text description.

use crate::constants::{systems, ALLERGY_ID_PREFIX};
use crate::datatypes::{join_annotations, Annotation, CodeableConcept, Meta, Period};
use crate::extract::{best_date, code_for_system, codeable_concept_text, non_empty, parse_fhir_date};
use crate::resource::impl_fhir_resource;
use crate::result::{MappingContext, MappingResult, Provenance};
use crate::vocabulary::{CodeTable, StatusTable, VocabularyCode};
use crate::MappingOptions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Public domain-level types
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllergyStatus {
    Active,
    Inactive,
    Resolved,
}

impl VocabularyCode for AllergyStatus {
    fn as_str(self) -> &'static str {
        match self {
            AllergyStatus::Active => "active",
            AllergyStatus::Inactive => "inactive",
            AllergyStatus::Resolved => "resolved",
        }
    }
}

/// Certainty that the allergy exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllergyVerification {
    Unconfirmed,
    Confirmed,
    Refuted,
    EnteredInError,
}

/// Potential for a serious, life-threatening reaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Criticality {
    Low,
    High,
    UnableToAssess,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllergyCategory {
    Food,
    Medication,
    Environment,
    Biologic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReactionSeverity {
    Mild,
    Moderate,
    Severe,
}

/// One observed reaction to the allergen.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllergyReaction {
    /// Manifestation texts joined with `", "`.
    pub manifestation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<ReactionSeverity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An allergy or intolerance derived from a FHIR `AllergyIntolerance`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Allergy {
    pub id: String,
    pub allergen: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snomed_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<AllergyCategory>,
    pub status: AllergyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_status: Option<AllergyVerification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criticality: Option<Criticality>,
    pub reactions: Vec<AllergyReaction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onset_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(flatten)]
    pub provenance: Provenance,
}

// ============================================================================
// Wire types
// ============================================================================

/// Wire representation of a FHIR R4 `AllergyIntolerance`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FhirAllergyIntolerance {
    pub resource_type: String,
    pub id: Option<String>,
    pub meta: Option<Meta>,
    pub clinical_status: Option<CodeableConcept>,
    pub verification_status: Option<CodeableConcept>,
    pub category: Vec<String>,
    pub criticality: Option<String>,
    pub code: Option<CodeableConcept>,
    pub onset_date_time: Option<String>,
    pub onset_period: Option<Period>,
    pub recorded_date: Option<String>,
    pub reaction: Vec<FhirAllergyReaction>,
    pub note: Vec<Annotation>,
}

/// The `AllergyIntolerance.reaction` backbone element.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FhirAllergyReaction {
    pub manifestation: Vec<CodeableConcept>,
    pub description: Option<String>,
    pub severity: Option<String>,
}

impl_fhir_resource!(FhirAllergyIntolerance, "AllergyIntolerance");

// ============================================================================
// Vocabulary tables
// ============================================================================

const CLINICAL_STATUS: StatusTable<AllergyStatus> = StatusTable {
    field: "AllergyIntolerance.clinicalStatus",
    field_es: "estado clínico de la alergia",
    entries: &[
        ("active", AllergyStatus::Active),
        ("inactive", AllergyStatus::Inactive),
        ("resolved", AllergyStatus::Resolved),
    ],
    default: AllergyStatus::Active,
};

const VERIFICATION_STATUS: CodeTable<AllergyVerification> = CodeTable {
    field: "AllergyIntolerance.verificationStatus",
    field_es: "estado de verificación de la alergia",
    entries: &[
        ("unconfirmed", AllergyVerification::Unconfirmed),
        ("confirmed", AllergyVerification::Confirmed),
        ("refuted", AllergyVerification::Refuted),
        ("entered-in-error", AllergyVerification::EnteredInError),
    ],
};

const CRITICALITY: CodeTable<Criticality> = CodeTable {
    field: "AllergyIntolerance.criticality",
    field_es: "criticidad de la alergia",
    entries: &[
        ("low", Criticality::Low),
        ("high", Criticality::High),
        ("unable-to-assess", Criticality::UnableToAssess),
    ],
};

const CATEGORY: CodeTable<AllergyCategory> = CodeTable {
    field: "AllergyIntolerance.category",
    field_es: "categoría de la alergia",
    entries: &[
        ("food", AllergyCategory::Food),
        ("medication", AllergyCategory::Medication),
        ("environment", AllergyCategory::Environment),
        ("biologic", AllergyCategory::Biologic),
    ],
};

const REACTION_SEVERITY: CodeTable<ReactionSeverity> = CodeTable {
    field: "AllergyIntolerance.reaction.severity",
    field_es: "gravedad de la reacción",
    entries: &[
        ("mild", ReactionSeverity::Mild),
        ("moderate", ReactionSeverity::Moderate),
        ("severe", ReactionSeverity::Severe),
    ],
};

// ============================================================================
// Mapping
// ============================================================================

/// Map a FHIR `AllergyIntolerance` to an internal [`Allergy`].
pub fn map_allergy(
    resource: &FhirAllergyIntolerance,
    options: &MappingOptions,
) -> MappingResult<Allergy> {
    let mut ctx = MappingContext::begin(resource, options);

    let allergen = codeable_concept_text(resource.code.as_ref());
    if allergen.is_empty() {
        ctx.warn(
            "AllergyIntolerance has no allergen code or name",
            "La alergia no tiene código ni nombre de alérgeno",
        );
    }

    let status = CLINICAL_STATUS.resolve(
        resource
            .clinical_status
            .as_ref()
            .and_then(CodeableConcept::first_code),
        &mut ctx,
    );
    let verification_status = VERIFICATION_STATUS.resolve(
        resource
            .verification_status
            .as_ref()
            .and_then(CodeableConcept::first_code),
        &mut ctx,
    );
    let criticality = CRITICALITY.resolve(resource.criticality.as_deref(), &mut ctx);
    let category = CATEGORY.resolve(resource.category.first().map(String::as_str), &mut ctx);

    let reactions = resource
        .reaction
        .iter()
        .map(|reaction| AllergyReaction {
            manifestation: join_manifestations(&reaction.manifestation),
            severity: REACTION_SEVERITY.resolve(reaction.severity.as_deref(), &mut ctx),
            description: non_empty(reaction.description.as_deref()),
        })
        .collect();

    let allergy = Allergy {
        id: ctx.entity_id(ALLERGY_ID_PREFIX),
        allergen,
        snomed_code: code_for_system(resource.code.as_ref(), systems::SNOMED_CT),
        category,
        status,
        verification_status,
        criticality,
        reactions,
        onset_date: best_date(&[
            resource.onset_date_time.as_deref(),
            resource
                .onset_period
                .as_ref()
                .and_then(|p| p.start.as_deref()),
        ]),
        recorded_date: parse_fhir_date(resource.recorded_date.as_deref()),
        notes: join_annotations(&resource.note),
        provenance: ctx.provenance(resource.meta.as_ref()),
    };

    ctx.finish(allergy)
}

fn join_manifestations(manifestations: &[CodeableConcept]) -> String {
    manifestations
        .iter()
        .map(|m| codeable_concept_text(Some(m)))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_resource;

    const PENICILLIN: &str = r#"{
        "resourceType": "AllergyIntolerance",
        "id": "al-1",
        "meta": { "lastUpdated": "2023-11-20T10:00:00Z" },
        "clinicalStatus": {
            "coding": [{ "system": "http://terminology.hl7.org/CodeSystem/allergyintolerance-clinical", "code": "active" }]
        },
        "verificationStatus": {
            "coding": [{ "system": "http://terminology.hl7.org/CodeSystem/allergyintolerance-verification", "code": "confirmed" }]
        },
        "category": ["medication"],
        "criticality": "high",
        "code": {
            "coding": [{ "system": "http://snomed.info/sct", "code": "764146007", "display": "Penicillin" }],
            "text": "Penicilina"
        },
        "onsetDateTime": "2010",
        "recordedDate": "2015-06-01",
        "reaction": [
            {
                "manifestation": [
                    { "coding": [{ "system": "http://snomed.info/sct", "code": "247472004", "display": "Hives" }], "text": "Urticaria" },
                    { "text": "Angioedema" }
                ],
                "severity": "severe",
                "description": "Reacción tras dosis intramuscular"
            },
            {
                "manifestation": [{ "text": "Prurito" }]
            }
        ]
    }"#;

    fn parse(json: &str) -> FhirAllergyIntolerance {
        parse_resource(json).expect("parse allergy")
    }

    #[test]
    fn maps_allergy_with_reactions() {
        let result = map_allergy(&parse(PENICILLIN), &MappingOptions::default());
        let allergy = &result.data;

        assert!(
            result.warnings.is_empty(),
            "warnings: {:?}",
            result.warnings
        );
        assert_eq!(allergy.id, "fhir-allergy-al-1");
        assert_eq!(allergy.allergen, "Penicilina");
        assert_eq!(allergy.snomed_code.as_deref(), Some("764146007"));
        assert_eq!(allergy.category, Some(AllergyCategory::Medication));
        assert_eq!(allergy.status, AllergyStatus::Active);
        assert_eq!(
            allergy.verification_status,
            Some(AllergyVerification::Confirmed)
        );
        assert_eq!(allergy.criticality, Some(Criticality::High));
        assert_eq!(
            allergy.onset_date.map(|d| d.to_rfc3339()).as_deref(),
            Some("2010-01-01T00:00:00+00:00")
        );
        assert!(allergy.recorded_date.is_some());

        assert_eq!(allergy.reactions.len(), 2);
        assert_eq!(allergy.reactions[0].manifestation, "Urticaria, Angioedema");
        assert_eq!(
            allergy.reactions[0].severity,
            Some(ReactionSeverity::Severe)
        );
        assert_eq!(
            allergy.reactions[0].description.as_deref(),
            Some("Reacción tras dosis intramuscular")
        );
        assert_eq!(allergy.reactions[1].manifestation, "Prurito");
        assert_eq!(allergy.reactions[1].severity, None);
    }

    #[test]
    fn missing_clinical_status_defaults_to_active() {
        let input = r#"{
            "resourceType": "AllergyIntolerance",
            "id": "al-2",
            "code": { "text": "Cacahuate" }
        }"#;
        let result = map_allergy(&parse(input), &MappingOptions::default());

        assert_eq!(result.data.status, AllergyStatus::Active);
        assert!(result.data.reactions.is_empty());
        assert_eq!(result.data.verification_status, None);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn resolved_clinical_status() {
        let input = PENICILLIN.replace(r#""code": "active""#, r#""code": "resolved""#);
        let result = map_allergy(&parse(&input), &MappingOptions::default());
        assert_eq!(result.data.status, AllergyStatus::Resolved);
    }

    #[test]
    fn missing_allergen_warns_in_both_languages() {
        let input = r#"{
            "resourceType": "AllergyIntolerance",
            "id": "al-3",
            "clinicalStatus": { "coding": [{ "code": "inactive" }] }
        }"#;
        let result = map_allergy(&parse(input), &MappingOptions::default());

        assert_eq!(result.data.allergen, "");
        assert_eq!(result.data.status, AllergyStatus::Inactive);
        assert_eq!(
            result.warnings,
            ["AllergyIntolerance has no allergen code or name"]
        );
        assert_eq!(
            result.warnings_es,
            ["La alergia no tiene código ni nombre de alérgeno"]
        );
    }

    #[test]
    fn unrecognised_criticality_is_left_unset() {
        let input = PENICILLIN.replace(r#""criticality": "high""#, r#""criticality": "extreme""#);
        let result = map_allergy(&parse(&input), &MappingOptions::default());

        assert_eq!(result.data.criticality, None);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("'extreme'"));
    }
}
