//! Per-call mapping configuration.
//!
//! Options are a plain value passed by reference into every mapper. There is no
//! process-wide default instance: callers that want the defaults use
//! [`MappingOptions::default`].

use crate::constants::DEFAULT_TIMEZONE;
use crate::FhirError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Display language for patient-facing text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Spanish.
    #[default]
    Es,
    /// English.
    En,
}

impl Language {
    /// Two-letter language code.
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Es => "es",
            Language::En => "en",
        }
    }
}

impl FromStr for Language {
    type Err = FhirError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "es" => Ok(Language::Es),
            "en" => Ok(Language::En),
            other => Err(FhirError::InvalidInput(format!(
                "unsupported language '{other}' (expected 'es' or 'en')"
            ))),
        }
    }
}

/// Options threaded through every mapping call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MappingOptions {
    /// Language used when presenting warnings (see
    /// [`MappingResult::localized_warnings`](crate::MappingResult::localized_warnings)).
    pub preferred_language: Language,

    /// Reserved. Accepted and threaded through, but no mapper embeds raw resources yet.
    pub include_raw_data: bool,

    /// Reserved. Accepted and threaded through, but dates are currently read as UTC.
    pub default_timezone: String,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            preferred_language: Language::Es,
            include_raw_data: false,
            default_timezone: DEFAULT_TIMEZONE.to_owned(),
        }
    }
}
