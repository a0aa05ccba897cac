//! FHIR R4 boundary crate for the Salud patient record.
//!
//! This crate translates clinical resources received from external FHIR servers into the
//! internal record model:
//! - `Patient` into [`UserProfile`]
//! - `Condition` into [`Condition`]
//! - `MedicationRequest` into [`Medication`]
//! - `Observation` into [`LabResult`]
//! - `AllergyIntolerance` into [`Allergy`]
//! - `Immunization` into [`Vaccination`]
//!
//! This crate focuses on:
//! - lenient wire models for the elements that are read (unknown elements are ignored)
//! - pure, total mapping functions that report data problems as bilingual warnings
//! - bundle dispatch that isolates per-entry failures
//!
//! Errors ([`FhirError`]) only arise at the decoding boundary. Once a resource has been
//! decoded, mapping it always yields a [`MappingResult`].

pub mod allergy;
pub mod batch;
pub mod bundle;
pub mod condition;
pub mod constants;
pub mod datatypes;
pub mod extract;
pub mod immunization;
pub mod medication;
pub mod observation;
pub mod options;
pub mod patient;
mod resource;
mod result;
pub mod timing;
mod vocabulary;

// Re-export mappers
pub use allergy::map_allergy;
pub use batch::{
    map_allergy_batch, map_condition_batch, map_immunization_batch, map_medication_batch,
    map_observation_batch, map_patient_batch,
};
pub use bundle::{map_bundle, parse_bundle};
pub use condition::map_condition;
pub use immunization::map_immunization;
pub use medication::map_medication;
pub use observation::map_observation;
pub use patient::map_patient;

// Re-export wire models
pub use allergy::FhirAllergyIntolerance;
pub use bundle::{BundleEntry, FhirBundle};
pub use condition::FhirCondition;
pub use immunization::FhirImmunization;
pub use medication::FhirMedicationRequest;
pub use observation::FhirObservation;
pub use patient::FhirPatient;

// Re-export public domain-level types
pub use allergy::{
    Allergy, AllergyCategory, AllergyReaction, AllergyStatus, AllergyVerification, Criticality,
    ReactionSeverity,
};
pub use bundle::{BundleMapping, SkippedEntry};
pub use condition::{ClinicalStatus, Condition, ConditionStatus, Severity, VerificationStatus};
pub use immunization::{Vaccination, VaccinationStatus};
pub use medication::{Medication, MedicationStatus};
pub use observation::{
    ComponentResult, Interpretation, LabResult, ObservationStatus, ReferenceRange,
};
pub use patient::{Gender, PostalAddress, UserProfile};

pub use options::{Language, MappingOptions};
pub use resource::{parse_resource, FhirResource};
pub use result::{MappingResult, Provenance, Source};
pub use vocabulary::VocabularyCode;

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("translation error: {0}")]
    Translation(String),
}

pub type FhirResult<T> = std::result::Result<T, FhirError>;
