//! The mapping envelope and the provenance carried by every mapped entity.

use crate::datatypes::Meta;
use crate::extract::parse_fhir_date;
use crate::options::{Language, MappingOptions};
use crate::resource::FhirResource;
use chrono::{DateTime, Utc};
use serde::Serialize;

// ============================================================================
// Public envelope types
// ============================================================================

/// Output of every mapper: the mapped entity plus bilingual diagnostics.
///
/// `warnings` and `warnings_es` are parallel lists; entry `i` of one is the translation of
/// entry `i` of the other.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingResult<T> {
    /// The mapped entity.
    pub data: T,

    /// English warnings.
    pub warnings: Vec<String>,

    /// Spanish warnings.
    pub warnings_es: Vec<String>,

    /// `id` of the originating FHIR resource (empty when the resource had none).
    pub fhir_resource_id: String,

    /// When the mapping ran.
    pub mapped_at: DateTime<Utc>,
}

impl<T> MappingResult<T> {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Warnings in the requested language.
    pub fn localized_warnings(&self, language: Language) -> &[String] {
        match language {
            Language::Es => &self.warnings_es,
            Language::En => &self.warnings,
        }
    }
}

/// Origin of a mapped entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Mapped from a FHIR resource.
    Fhir,
}

/// Audit trail tying an entity back to the resource it was derived from.
///
/// Flattened into each entity when serialised.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub source: Source,

    /// `<ResourceType>/<id>` of the originating resource.
    pub fhir_reference: String,

    /// `meta.lastUpdated` of the resource, or the mapping time when absent.
    pub last_updated: DateTime<Utc>,
}

// ============================================================================
// Internal mapping context
// ============================================================================

/// Per-call state shared by the mappers: identity of the resource being mapped, the
/// mapping timestamp, and the warnings collected so far.
pub(crate) struct MappingContext {
    resource_type: &'static str,
    resource_id: String,
    mapped_at: DateTime<Utc>,
    warnings: Vec<String>,
    warnings_es: Vec<String>,
}

impl MappingContext {
    /// Start mapping `resource`.
    pub(crate) fn begin<R: FhirResource>(resource: &R, options: &MappingOptions) -> Self {
        let resource_id = resource.id().unwrap_or_default().trim().to_owned();

        tracing::trace!(
            resource_type = R::RESOURCE_TYPE,
            resource_id = %resource_id,
            language = options.preferred_language.as_str(),
            "mapping FHIR resource"
        );

        let mut ctx = Self {
            resource_type: R::RESOURCE_TYPE,
            resource_id,
            mapped_at: Utc::now(),
            warnings: Vec::new(),
            warnings_es: Vec::new(),
        };

        if ctx.resource_id.is_empty() {
            ctx.warn(
                format!("{} resource has no id", R::RESOURCE_TYPE),
                format!("El recurso {} no tiene id", R::RESOURCE_TYPE),
            );
        }

        ctx
    }

    /// Record one bilingual warning.
    pub(crate) fn warn(&mut self, en: impl Into<String>, es: impl Into<String>) {
        let en = en.into();
        tracing::debug!(
            resource_type = self.resource_type,
            resource_id = %self.resource_id,
            "{en}"
        );
        self.warnings.push(en);
        self.warnings_es.push(es.into());
    }

    /// Namespaced entity id, for example `fhir-cond-123`.
    ///
    /// A resource without an id yields the bare prefix, so every id-less resource of one type
    /// maps to the same entity id. The missing id is already reported by [`Self::begin`].
    pub(crate) fn entity_id(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.resource_id)
    }

    pub(crate) fn provenance(&self, meta: Option<&Meta>) -> Provenance {
        let last_updated =
            parse_fhir_date(meta.and_then(|m| m.last_updated.as_deref())).unwrap_or(self.mapped_at);

        Provenance {
            source: Source::Fhir,
            fhir_reference: format!("{}/{}", self.resource_type, self.resource_id),
            last_updated,
        }
    }

    pub(crate) fn finish<T>(self, data: T) -> MappingResult<T> {
        MappingResult {
            data,
            warnings: self.warnings,
            warnings_es: self.warnings_es,
            fhir_resource_id: self.resource_id,
            mapped_at: self.mapped_at,
        }
    }
}
