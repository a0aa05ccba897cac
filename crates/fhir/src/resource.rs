//! The seam shared by every supported FHIR resource wire model.
//!
//! Decoding is the one place where input can be rejected: a payload that is not the shape
//! of the resource is a [`FhirError`]. Once decoded, a resource is always mappable.

use crate::datatypes::Meta;
use crate::FhirError;
use serde::de::DeserializeOwned;

/// Common accessors over a decoded FHIR resource.
pub trait FhirResource: DeserializeOwned {
    /// The FHIR `resourceType` this wire model decodes.
    const RESOURCE_TYPE: &'static str;

    /// `resourceType` as it appeared in the payload.
    fn resource_type(&self) -> &str;

    /// Logical id of the resource.
    fn id(&self) -> Option<&str>;

    /// Resource metadata.
    fn meta(&self) -> Option<&Meta>;
}

/// Implements [`FhirResource`] for a wire struct with `resource_type`, `id` and `meta`
/// fields.
macro_rules! impl_fhir_resource {
    ($ty:ty, $name:literal) => {
        impl $crate::resource::FhirResource for $ty {
            const RESOURCE_TYPE: &'static str = $name;

            fn resource_type(&self) -> &str {
                &self.resource_type
            }

            fn id(&self) -> Option<&str> {
                self.id.as_deref()
            }

            fn meta(&self) -> Option<&$crate::datatypes::Meta> {
                self.meta.as_ref()
            }
        }
    };
}
pub(crate) use impl_fhir_resource;

/// Decode JSON into `T`, reporting the path of the first mismatching element.
pub(crate) fn decode_json<T: DeserializeOwned>(
    json_text: &str,
    what: &str,
) -> Result<T, FhirError> {
    let mut deserializer = serde_json::Deserializer::from_str(json_text);

    match serde_path_to_error::deserialize::<_, T>(&mut deserializer) {
        Ok(parsed) => {
            deserializer.end()?;
            Ok(parsed)
        }
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>"
            } else {
                path.as_str()
            };
            Err(FhirError::Translation(format!("{what} schema mismatch at {path}: {source}")))
        }
    }
}

/// Decode a value already parsed as JSON (for example a bundle entry) into `R`.
pub(crate) fn decode_value<R: FhirResource>(value: serde_json::Value) -> Result<R, FhirError> {
    match serde_path_to_error::deserialize::<_, R>(value) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            let path = err.path().to_string();
            Err(FhirError::Translation(format!(
                "{} schema mismatch at {path}: {}",
                R::RESOURCE_TYPE,
                err.into_inner()
            )))
        }
    }
}

/// Parse a single FHIR resource from JSON text.
///
/// # Errors
///
/// Returns [`FhirError`] if:
/// - the text is not JSON, or an element has an unexpected JSON type
///   ([`FhirError::Translation`], naming the failing path such as `code.coding[0].code`),
/// - `resourceType` is not `R::RESOURCE_TYPE` ([`FhirError::InvalidInput`]).
pub fn parse_resource<R: FhirResource>(json_text: &str) -> Result<R, FhirError> {
    let resource: R = decode_json(json_text, R::RESOURCE_TYPE)?;

    if resource.resource_type() != R::RESOURCE_TYPE {
        return Err(FhirError::InvalidInput(format!(
            "Expected resourceType '{}', got '{}'",
            R::RESOURCE_TYPE,
            resource.resource_type()
        )));
    }

    Ok(resource)
}
