//! Constants used throughout the FHIR mapping crate.
//!
//! Coding-system URIs are matched exactly against `Coding.system`, so they are kept here
//! verbatim as published by HL7.

/// Canonical coding-system URIs consumed by the mappers.
pub mod systems {
    /// ICD-10-CM diagnosis codes.
    pub const ICD10_CM: &str = "http://hl7.org/fhir/sid/icd-10-cm";

    /// SNOMED CT clinical terms.
    pub const SNOMED_CT: &str = "http://snomed.info/sct";

    /// LOINC laboratory and observation codes.
    pub const LOINC: &str = "http://loinc.org";

    /// RxNorm medication codes.
    pub const RXNORM: &str = "http://www.nlm.nih.gov/research/umls/rxnorm";

    /// CVX vaccine codes.
    pub const CVX: &str = "http://hl7.org/fhir/sid/cvx";
}

/// Entity id prefix for mapped `Patient` resources.
pub const PATIENT_ID_PREFIX: &str = "fhir-patient-";

/// Entity id prefix for mapped `Condition` resources.
pub const CONDITION_ID_PREFIX: &str = "fhir-cond-";

/// Entity id prefix for mapped `MedicationRequest` resources.
pub const MEDICATION_ID_PREFIX: &str = "fhir-med-";

/// Entity id prefix for mapped `Observation` resources.
pub const OBSERVATION_ID_PREFIX: &str = "fhir-obs-";

/// Entity id prefix for mapped `AllergyIntolerance` resources.
pub const ALLERGY_ID_PREFIX: &str = "fhir-allergy-";

/// Entity id prefix for mapped `Immunization` resources.
pub const IMMUNIZATION_ID_PREFIX: &str = "fhir-imm-";

/// Timezone recorded in [`crate::MappingOptions`] when none is supplied.
pub const DEFAULT_TIMEZONE: &str = "America/Chicago";

/// Display value for a positive `valueBoolean` observation.
pub const BOOLEAN_POSITIVE: &str = "Positivo";

/// Display value for a negative `valueBoolean` observation.
pub const BOOLEAN_NEGATIVE: &str = "Negativo";
