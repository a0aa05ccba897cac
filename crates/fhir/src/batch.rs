//! Element-wise mapping of resource slices.
//!
//! Output `i` is exactly the single-resource mapping of input `i`: same length, same
//! order, no shared state between elements, and no early termination.

use crate::allergy::{map_allergy, Allergy, FhirAllergyIntolerance};
use crate::condition::{map_condition, Condition, FhirCondition};
use crate::immunization::{map_immunization, FhirImmunization, Vaccination};
use crate::medication::{map_medication, FhirMedicationRequest, Medication};
use crate::observation::{map_observation, FhirObservation, LabResult};
use crate::patient::{map_patient, FhirPatient, UserProfile};
use crate::result::MappingResult;
use crate::MappingOptions;

fn map_each<R, T>(
    resources: &[R],
    options: &MappingOptions,
    map: fn(&R, &MappingOptions) -> MappingResult<T>,
) -> Vec<MappingResult<T>> {
    resources
        .iter()
        .map(|resource| map(resource, options))
        .collect()
}

pub fn map_patient_batch(
    resources: &[FhirPatient],
    options: &MappingOptions,
) -> Vec<MappingResult<UserProfile>> {
    map_each(resources, options, map_patient)
}

pub fn map_condition_batch(
    resources: &[FhirCondition],
    options: &MappingOptions,
) -> Vec<MappingResult<Condition>> {
    map_each(resources, options, map_condition)
}

pub fn map_medication_batch(
    resources: &[FhirMedicationRequest],
    options: &MappingOptions,
) -> Vec<MappingResult<Medication>> {
    map_each(resources, options, map_medication)
}

pub fn map_observation_batch(
    resources: &[FhirObservation],
    options: &MappingOptions,
) -> Vec<MappingResult<LabResult>> {
    map_each(resources, options, map_observation)
}

pub fn map_allergy_batch(
    resources: &[FhirAllergyIntolerance],
    options: &MappingOptions,
) -> Vec<MappingResult<Allergy>> {
    map_each(resources, options, map_allergy)
}

pub fn map_immunization_batch(
    resources: &[FhirImmunization],
    options: &MappingOptions,
) -> Vec<MappingResult<Vaccination>> {
    map_each(resources, options, map_immunization)
}
