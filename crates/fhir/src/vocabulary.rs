//! Finite translation tables from FHIR code vocabularies to internal enums.
//!
//! Two shapes exist:
//! - [`StatusTable`]: a lifecycle vocabulary with one designated default. Absent and
//!   unrecognised codes both fall back to the default, and every fallback is a warning.
//! - [`CodeTable`]: a classification without a default. Absent codes map to `None`
//!   silently; unrecognised codes map to `None` with a warning.
//!
//! Codes are matched against the full code value, never by substring.

use crate::result::MappingContext;

/// Internal vocabulary values that have a stable wire code.
pub trait VocabularyCode: Copy {
    fn as_str(self) -> &'static str;
}

/// Lookup table with a designated default.
pub(crate) struct StatusTable<T: 'static> {
    /// FHIR element path, e.g. `Condition.clinicalStatus`.
    pub field: &'static str,
    /// Spanish description of the element, used in warnings.
    pub field_es: &'static str,
    pub entries: &'static [(&'static str, T)],
    pub default: T,
}

impl<T: VocabularyCode + 'static> StatusTable<T> {
    pub(crate) fn lookup(&self, code: &str) -> Option<T> {
        lookup(self.entries, code)
    }

    /// Translate `code`, falling back to the table default with a warning.
    pub(crate) fn resolve(&self, code: Option<&str>, ctx: &mut MappingContext) -> T {
        let default = self.default.as_str();

        match code.map(str::trim).filter(|c| !c.is_empty()) {
            None => {
                ctx.warn(
                    format!("Missing {}; defaulting to '{default}'", self.field),
                    format!("Falta {}; se usa '{default}'", self.field_es),
                );
                self.default
            }
            Some(code) => match self.lookup(code) {
                Some(value) => value,
                None => {
                    ctx.warn(
                        format!(
                            "Unrecognized {} code '{code}'; defaulting to '{default}'",
                            self.field
                        ),
                        format!(
                            "Código de {} '{code}' no reconocido; se usa '{default}'",
                            self.field_es
                        ),
                    );
                    self.default
                }
            },
        }
    }
}

/// Lookup table without a default.
pub(crate) struct CodeTable<T: 'static> {
    pub field: &'static str,
    pub field_es: &'static str,
    pub entries: &'static [(&'static str, T)],
}

impl<T: Copy + 'static> CodeTable<T> {
    pub(crate) fn lookup(&self, code: &str) -> Option<T> {
        lookup(self.entries, code)
    }

    /// Translate `code`; an unrecognised code is a warning.
    pub(crate) fn resolve(&self, code: Option<&str>, ctx: &mut MappingContext) -> Option<T> {
        let code = code.map(str::trim).filter(|c| !c.is_empty())?;

        let value = self.lookup(code);
        if value.is_none() {
            ctx.warn(
                format!(
                    "Unrecognized {} code '{code}'; leaving it unset",
                    self.field
                ),
                format!(
                    "Código de {} '{code}' no reconocido; se deja sin valor",
                    self.field_es
                ),
            );
        }
        value
    }
}

fn lookup<T: Copy>(entries: &[(&str, T)], code: &str) -> Option<T> {
    entries
        .iter()
        .find(|(key, _)| *key == code)
        .map(|(_, value)| *value)
}
