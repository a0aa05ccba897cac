mod config;

use anyhow::Context;
use clap::Parser;
use fhir::{BundleMapping, Language, MappingResult};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use config::{Cli, RunConfig};

/// Main entry point for the Salud FHIR runner
///
/// Reads a FHIR R4 Bundle from disk, maps every supported resource into Salud records and
/// prints the grouped results as JSON on stdout. Logs go to stderr.
///
/// # Environment Variables
/// - `SALUD_LANGUAGE`: language for presented warnings (default: "es")
/// - `SALUD_TIMEZONE`: timezone recorded in the mapping options (default: "America/Chicago")
/// - `SALUD_INCLUDE_RAW_DATA`: request raw resources alongside records (default: false)
/// - `RUST_LOG`: log filter, on top of the `salud_run=info` default
///
/// # Returns
/// * `Ok(())` - If the bundle was read, parsed and mapped
/// * `Err(anyhow::Error)` - If the file cannot be read or is not a FHIR Bundle
fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("salud_run=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = RunConfig::from_cli(Cli::parse())?;

    tracing::info!(
        "++ Mapping FHIR bundle {} (language: {})",
        config.bundle_path().display(),
        config.language().as_str()
    );

    let json_text = std::fs::read_to_string(config.bundle_path())
        .with_context(|| format!("failed to read {}", config.bundle_path().display()))?;
    let bundle = fhir::parse_bundle(&json_text)
        .with_context(|| format!("{} is not a FHIR Bundle", config.bundle_path().display()))?;

    let mapping = fhir::map_bundle(&bundle, config.options());
    log_summary(&mapping, config.language());

    let output = if config.pretty() {
        serde_json::to_string_pretty(&mapping)
    } else {
        serde_json::to_string(&mapping)
    }
    .context("failed to serialise mapping results")?;
    println!("{output}");

    Ok(())
}

fn log_summary(mapping: &BundleMapping, language: Language) {
    tracing::info!(
        patients = mapping.patients.len(),
        conditions = mapping.conditions.len(),
        medications = mapping.medications.len(),
        observations = mapping.observations.len(),
        allergies = mapping.allergies.len(),
        immunizations = mapping.immunizations.len(),
        warnings = mapping.warning_count(),
        skipped = mapping.skipped.len(),
        "Mapped {} resources",
        mapping.total_mapped()
    );

    for entry in &mapping.skipped {
        tracing::warn!(
            index = entry.index,
            resource_type = entry.resource_type.as_deref().unwrap_or("-"),
            "Skipped bundle entry: {}",
            entry.reason
        );
    }

    log_warnings("Patient", &mapping.patients, language);
    log_warnings("Condition", &mapping.conditions, language);
    log_warnings("MedicationRequest", &mapping.medications, language);
    log_warnings("Observation", &mapping.observations, language);
    log_warnings("AllergyIntolerance", &mapping.allergies, language);
    log_warnings("Immunization", &mapping.immunizations, language);
}

fn log_warnings<T>(resource_type: &str, results: &[MappingResult<T>], language: Language) {
    for result in results {
        for warning in result.localized_warnings(language) {
            tracing::info!(
                resource_type,
                resource_id = %result.fhir_resource_id,
                "{warning}"
            );
        }
    }
}
