//! FHIR `Patient` wire model and its mapping to the internal [`UserProfile`].
//!
//! Responsibilities:
//! - Define the internal profile entity (identity, contact and demographic snapshot)
//! - Define a lenient wire model for the `Patient` elements that are read
//! - Select the preferred name, address, phone, email and language among alternatives
//!
//! Notes:
//! - The profile flattens the first usable entry of each repeating element; the
//!   remaining entries are not carried over

use crate::constants::PATIENT_ID_PREFIX;
use crate::datatypes::{Address, CodeableConcept, ContactPoint, HumanName, Meta};
use crate::extract::{non_empty, parse_fhir_date};
use crate::options::Language;
use crate::resource::impl_fhir_resource;
use crate::result::{MappingContext, MappingResult, Provenance};
use crate::vocabulary::CodeTable;
use crate::MappingOptions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Public domain-level types
// ============================================================================

/// Administrative gender.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
    Unknown,
}

/// Postal address flattened for display.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalAddress {
    /// Address lines joined with `", "`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Identity, contact and demographic snapshot derived from a FHIR `Patient`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// `fhir-patient-<id>`.
    pub id: String,

    /// First given name of the selected name (may be empty).
    pub first_name: String,

    /// Family name of the selected name (may be empty).
    pub last_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<PostalAddress>,

    pub preferred_language: Language,

    #[serde(flatten)]
    pub provenance: Provenance,
}

// ============================================================================
// Wire types
// ============================================================================

/// Wire representation of a FHIR R4 `Patient`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FhirPatient {
    pub resource_type: String,
    pub id: Option<String>,
    pub meta: Option<Meta>,
    pub name: Vec<HumanName>,
    pub telecom: Vec<ContactPoint>,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
    pub address: Vec<Address>,
    pub communication: Vec<PatientCommunication>,
}

/// The `Patient.communication` backbone element.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct PatientCommunication {
    pub language: Option<CodeableConcept>,
    pub preferred: Option<bool>,
}

/// Purpose of a human name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NameUse {
    /// Official name.
    Official,
    /// Usual/preferred name.
    Usual,
    /// Temporary name.
    Temp,
    /// Nickname or informal name.
    Nickname,
    /// Anonymous name.
    Anonymous,
    /// Old name (no longer in use).
    Old,
    /// Maiden name.
    Maiden,
}

impl NameUse {
    /// Parse from FHIR wire format string.
    fn from_wire(s: &str) -> Option<Self> {
        match s {
            "official" => Some(NameUse::Official),
            "usual" => Some(NameUse::Usual),
            "temp" => Some(NameUse::Temp),
            "nickname" => Some(NameUse::Nickname),
            "anonymous" => Some(NameUse::Anonymous),
            "old" => Some(NameUse::Old),
            "maiden" => Some(NameUse::Maiden),
            _ => None,
        }
    }
}

impl_fhir_resource!(FhirPatient, "Patient");

const GENDER: CodeTable<Gender> = CodeTable {
    field: "Patient.gender",
    field_es: "sexo del paciente",
    entries: &[
        ("male", Gender::Male),
        ("female", Gender::Female),
        ("other", Gender::Other),
        ("unknown", Gender::Unknown),
    ],
};

// ============================================================================
// Mapping
// ============================================================================

/// Map a FHIR `Patient` to a [`UserProfile`].
pub fn map_patient(resource: &FhirPatient, options: &MappingOptions) -> MappingResult<UserProfile> {
    let mut ctx = MappingContext::begin(resource, options);

    let name = select_name(&resource.name);
    let first_name = name
        .and_then(|n| n.given.first())
        .map(|g| g.trim().to_owned())
        .unwrap_or_default();
    let last_name = name
        .and_then(|n| n.family.as_deref())
        .map(|f| f.trim().to_owned())
        .unwrap_or_default();

    match (first_name.is_empty(), last_name.is_empty()) {
        (false, false) => {}
        (true, true) => ctx.warn(
            "Patient has no first or last name",
            "El paciente no tiene nombre ni apellido",
        ),
        (true, false) => ctx.warn("Patient has no first name", "El paciente no tiene nombre"),
        (false, true) => ctx.warn("Patient has no last name", "El paciente no tiene apellido"),
    }

    let profile = UserProfile {
        id: ctx.entity_id(PATIENT_ID_PREFIX),
        first_name,
        last_name,
        date_of_birth: parse_fhir_date(resource.birth_date.as_deref()),
        gender: GENDER.resolve(resource.gender.as_deref(), &mut ctx),
        email: select_telecom(&resource.telecom, "email", &[]),
        phone: select_telecom(&resource.telecom, "phone", &["mobile", "home"]),
        address: select_address(&resource.address).map(to_postal_address),
        preferred_language: preferred_language(&resource.communication),
        provenance: ctx.provenance(resource.meta.as_ref()),
    };

    ctx.finish(profile)
}

/// The `official` name, else the first name.
fn select_name(names: &[HumanName]) -> Option<&HumanName> {
    names
        .iter()
        .find(|n| n.use_type.as_deref().and_then(NameUse::from_wire) == Some(NameUse::Official))
        .or_else(|| names.first())
}

/// The `home` address, else the first address.
fn select_address(addresses: &[Address]) -> Option<&Address> {
    addresses
        .iter()
        .find(|a| a.use_type.as_deref() == Some("home"))
        .or_else(|| addresses.first())
}

fn to_postal_address(address: &Address) -> PostalAddress {
    let lines: Vec<&str> = address
        .line
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    PostalAddress {
        street: if lines.is_empty() {
            non_empty(address.text.as_deref())
        } else {
            Some(lines.join(", "))
        },
        city: non_empty(address.city.as_deref()),
        state: non_empty(address.state.as_deref()),
        postal_code: non_empty(address.postal_code.as_deref()),
        country: non_empty(address.country.as_deref()),
    }
}

/// First telecom value of `system`, trying each `use` in `preferred_uses` before falling
/// back to any entry of that system.
fn select_telecom(
    telecom: &[ContactPoint],
    system: &str,
    preferred_uses: &[&str],
) -> Option<String> {
    let candidates: Vec<&ContactPoint> = telecom
        .iter()
        .filter(|t| t.system.as_deref() == Some(system))
        .filter(|t| t.value.as_deref().is_some_and(|v| !v.trim().is_empty()))
        .collect();

    preferred_uses
        .iter()
        .find_map(|wanted| {
            candidates
                .iter()
                .find(|t| t.use_type.as_deref() == Some(*wanted))
        })
        .or_else(|| candidates.first())
        .and_then(|t| non_empty(t.value.as_deref()))
}

/// Language from the preferred `communication` entry (else the first one). Anything not
/// recognisably English is Spanish.
fn preferred_language(communication: &[PatientCommunication]) -> Language {
    let entry = communication
        .iter()
        .find(|c| c.preferred == Some(true))
        .or_else(|| communication.first());

    let Some(language) = entry.and_then(|c| c.language.as_ref()) else {
        return Language::Es;
    };

    let code_is_english = language
        .coding
        .iter()
        .filter_map(|c| c.code.as_deref())
        .any(|code| {
            let code = code.trim().to_ascii_lowercase();
            code == "en" || code.starts_with("en-")
        });
    let text_is_english = language.text.as_deref().is_some_and(|text| {
        let text = text.to_lowercase();
        text.contains("english") || text.contains("inglés") || text.contains("ingles")
    });

    if code_is_english || text_is_english {
        Language::En
    } else {
        Language::Es
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_resource;

    const MARIA: &str = r#"{
        "resourceType": "Patient",
        "id": "p-42",
        "meta": { "lastUpdated": "2024-02-10T09:15:00Z" },
        "name": [
            { "use": "nickname", "given": ["Mari"] },
            { "use": "official", "family": "García", "given": ["María", "José"] }
        ],
        "telecom": [
            { "system": "email", "value": "maria@example.org" },
            { "system": "phone", "value": "555-0100", "use": "work" },
            { "system": "phone", "value": "555-0199", "use": "mobile" }
        ],
        "gender": "female",
        "birthDate": "1985-04-12",
        "address": [
            { "use": "work", "line": ["1 Office Park"], "city": "Austin" },
            { "use": "home", "line": ["742 Evergreen", "Apt 3"], "city": "Houston", "state": "TX", "postalCode": "77001" }
        ],
        "communication": [
            { "language": { "coding": [{ "system": "urn:ietf:bcp:47", "code": "es-MX" }] } },
            { "language": { "coding": [{ "system": "urn:ietf:bcp:47", "code": "en-US" }] }, "preferred": true }
        ]
    }"#;

    fn parse(json: &str) -> FhirPatient {
        parse_resource(json).expect("parse patient")
    }

    #[test]
    fn maps_complete_patient() {
        let result = map_patient(&parse(MARIA), &MappingOptions::default());
        let profile = &result.data;

        assert!(
            result.warnings.is_empty(),
            "warnings: {:?}",
            result.warnings
        );
        assert_eq!(profile.id, "fhir-patient-p-42");
        assert_eq!(profile.first_name, "María");
        assert_eq!(profile.last_name, "García");
        assert_eq!(profile.gender, Some(Gender::Female));
        assert_eq!(profile.email.as_deref(), Some("maria@example.org"));
        assert_eq!(profile.phone.as_deref(), Some("555-0199"));
        assert_eq!(profile.preferred_language, Language::En);
        assert!(profile.date_of_birth.is_some());

        let address = profile.address.as_ref().expect("home address");
        assert_eq!(address.street.as_deref(), Some("742 Evergreen, Apt 3"));
        assert_eq!(address.city.as_deref(), Some("Houston"));
        assert_eq!(address.postal_code.as_deref(), Some("77001"));
    }

    #[test]
    fn falls_back_to_first_name_and_any_phone() {
        let input = r#"{
            "resourceType": "Patient",
            "id": "p1",
            "name": [{ "family": "Lopez", "given": ["Ana"] }],
            "telecom": [{ "system": "phone", "value": "555-0100", "use": "work" }],
            "address": [{ "line": ["Calle 5"] }]
        }"#;
        let result = map_patient(&parse(input), &MappingOptions::default());

        assert_eq!(result.data.first_name, "Ana");
        assert_eq!(result.data.last_name, "Lopez");
        assert_eq!(result.data.phone.as_deref(), Some("555-0100"));
        assert_eq!(
            result.data.address.and_then(|a| a.street).as_deref(),
            Some("Calle 5")
        );
    }

    #[test]
    fn only_known_name_uses_are_read() {
        assert_eq!(NameUse::from_wire("official"), Some(NameUse::Official));
        assert_eq!(NameUse::from_wire("maiden"), Some(NameUse::Maiden));
        assert_eq!(NameUse::from_wire("Official"), None);
    }

    #[test]
    fn home_phone_beats_work_phone() {
        let telecom = vec![
            ContactPoint {
                system: Some("phone".into()),
                value: Some("work".into()),
                use_type: Some("work".into()),
            },
            ContactPoint {
                system: Some("phone".into()),
                value: Some("home".into()),
                use_type: Some("home".into()),
            },
        ];
        assert_eq!(
            select_telecom(&telecom, "phone", &["mobile", "home"]).as_deref(),
            Some("home")
        );
    }

    #[test]
    fn missing_names_warn_but_still_map() {
        let result = map_patient(
            &parse(r#"{ "resourceType": "Patient", "id": "anon" }"#),
            &MappingOptions::default(),
        );

        assert_eq!(result.data.first_name, "");
        assert_eq!(result.data.last_name, "");
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(
            result.warnings_es,
            ["El paciente no tiene nombre ni apellido"]
        );
        assert_eq!(result.data.preferred_language, Language::Es);
    }

    #[test]
    fn language_defaults_to_spanish() {
        assert_eq!(preferred_language(&[]), Language::Es);

        let french = PatientCommunication {
            language: Some(CodeableConcept {
                coding: vec![],
                text: Some("Français".into()),
            }),
            preferred: None,
        };
        assert_eq!(preferred_language(&[french]), Language::Es);

        let english_text = PatientCommunication {
            language: Some(CodeableConcept {
                coding: vec![],
                text: Some("Inglés".into()),
            }),
            preferred: None,
        };
        assert_eq!(preferred_language(&[english_text]), Language::En);
    }

    #[test]
    fn unrecognized_gender_is_unset_with_warning() {
        let input = r#"{
            "resourceType": "Patient",
            "id": "p2",
            "name": [{ "family": "Ruiz", "given": ["Leo"] }],
            "gender": "M"
        }"#;
        let result = map_patient(&parse(input), &MappingOptions::default());

        assert_eq!(result.data.gender, None);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("Patient.gender"));
    }
}
