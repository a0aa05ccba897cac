//! FHIR `Bundle` dispatch.
//!
//! A bundle is heterogeneous: each entry is routed on its `resourceType`, decoded into the
//! matching wire model, and mapped. An entry that cannot be mapped is recorded in
//! [`BundleMapping::skipped`] and never affects the entries around it.

use crate::allergy::{map_allergy, Allergy};
use crate::condition::{map_condition, Condition};
use crate::datatypes::Meta;
use crate::immunization::{map_immunization, Vaccination};
use crate::medication::{map_medication, Medication};
use crate::observation::{map_observation, LabResult};
use crate::patient::{map_patient, UserProfile};
use crate::resource::{decode_value, impl_fhir_resource, parse_resource, FhirResource};
use crate::result::MappingResult;
use crate::{FhirResult, MappingOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Wire types
// ============================================================================

/// Wire representation of a FHIR R4 `Bundle`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FhirBundle {
    pub resource_type: String,
    pub id: Option<String>,
    pub meta: Option<Meta>,
    #[serde(rename = "type")]
    pub bundle_type: Option<String>,
    pub entry: Vec<BundleEntry>,
}

/// One `Bundle.entry`; the resource stays untyped until dispatch.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct BundleEntry {
    pub full_url: Option<String>,
    pub resource: Option<Value>,
}

impl_fhir_resource!(FhirBundle, "Bundle");

// ============================================================================
// Public domain-level types
// ============================================================================

/// An entry that produced no mapping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedEntry {
    /// Position of the entry in `Bundle.entry`.
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    pub reason: String,
}

/// Mapping results of a whole bundle, grouped per entity type in bundle order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleMapping {
    pub patients: Vec<MappingResult<UserProfile>>,
    pub conditions: Vec<MappingResult<Condition>>,
    pub medications: Vec<MappingResult<Medication>>,
    pub observations: Vec<MappingResult<LabResult>>,
    pub allergies: Vec<MappingResult<Allergy>>,
    pub immunizations: Vec<MappingResult<Vaccination>>,
    pub skipped: Vec<SkippedEntry>,
}

impl BundleMapping {
    /// Number of entries that were mapped.
    pub fn total_mapped(&self) -> usize {
        self.patients.len()
            + self.conditions.len()
            + self.medications.len()
            + self.observations.len()
            + self.allergies.len()
            + self.immunizations.len()
    }

    /// Number of warnings across every mapped entry.
    pub fn warning_count(&self) -> usize {
        fn count<T>(results: &[MappingResult<T>]) -> usize {
            results.iter().map(|r| r.warnings.len()).sum()
        }

        count(&self.patients)
            + count(&self.conditions)
            + count(&self.medications)
            + count(&self.observations)
            + count(&self.allergies)
            + count(&self.immunizations)
    }

    fn skip(&mut self, index: usize, resource_type: Option<String>, reason: String) {
        tracing::debug!(index, resource_type = ?resource_type, %reason, "skipping bundle entry");
        self.skipped.push(SkippedEntry {
            index,
            resource_type,
            reason,
        });
    }
}

// ============================================================================
// Parsing and dispatch
// ============================================================================

/// Parse a FHIR `Bundle` from JSON text.
///
/// Entry resources are not decoded here; a malformed entry surfaces later as a
/// [`SkippedEntry`] rather than failing the whole bundle.
pub fn parse_bundle(json_text: &str) -> FhirResult<FhirBundle> {
    parse_resource(json_text)
}

/// Map every supported resource in `bundle`.
pub fn map_bundle(bundle: &FhirBundle, options: &MappingOptions) -> BundleMapping {
    let mut mapping = BundleMapping::default();

    for (index, entry) in bundle.entry.iter().enumerate() {
        let Some(resource) = &entry.resource else {
            mapping.skip(index, None, "entry has no resource".to_owned());
            continue;
        };

        let resource_type = resource.get("resourceType").and_then(Value::as_str);
        let outcome = match resource_type {
            Some("Patient") => map_into(resource, options, map_patient, &mut mapping.patients),
            Some("Condition") => {
                map_into(resource, options, map_condition, &mut mapping.conditions)
            }
            Some("MedicationRequest") => {
                map_into(resource, options, map_medication, &mut mapping.medications)
            }
            Some("Observation") => map_into(
                resource,
                options,
                map_observation,
                &mut mapping.observations,
            ),
            Some("AllergyIntolerance") => {
                map_into(resource, options, map_allergy, &mut mapping.allergies)
            }
            Some("Immunization") => map_into(
                resource,
                options,
                map_immunization,
                &mut mapping.immunizations,
            ),
            Some(other) => Err(format!("unsupported resourceType '{other}'")),
            None => Err("entry resource has no resourceType".to_owned()),
        };

        if let Err(reason) = outcome {
            mapping.skip(index, resource_type.map(str::to_owned), reason);
        }
    }

    tracing::debug!(
        entries = bundle.entry.len(),
        mapped = mapping.total_mapped(),
        skipped = mapping.skipped.len(),
        "mapped FHIR bundle"
    );

    mapping
}

fn map_into<R: FhirResource, T>(
    resource: &Value,
    options: &MappingOptions,
    map: fn(&R, &MappingOptions) -> MappingResult<T>,
    out: &mut Vec<MappingResult<T>>,
) -> Result<(), String> {
    let decoded: R = decode_value(resource.clone()).map_err(|e| e.to_string())?;
    out.push(map(&decoded, options));
    Ok(())
}
