//! Runner configuration.
//!
//! Everything the runner needs is resolved once at startup from the command line, with
//! environment variables (and a `.env` file) as fallbacks, and then passed down explicitly.

use anyhow::bail;
use clap::Parser;
use clap::builder::FalseyValueParser;
use fhir::{Language, MappingOptions};
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "salud-run")]
#[command(about = "Map a FHIR R4 Bundle into Salud patient records")]
pub struct Cli {
    /// Path to a FHIR Bundle JSON file
    pub bundle_path: PathBuf,

    /// Language for presented warnings (es or en)
    #[arg(long, env = "SALUD_LANGUAGE", default_value = "es")]
    pub language: Language,

    /// IANA timezone recorded in the mapping options
    #[arg(long, env = "SALUD_TIMEZONE")]
    pub timezone: Option<String>,

    /// Request raw resources alongside mapped records
    #[arg(long, env = "SALUD_INCLUDE_RAW_DATA", value_parser = FalseyValueParser::new())]
    pub include_raw_data: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

/// Runner configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct RunConfig {
    bundle_path: PathBuf,
    options: MappingOptions,
    pretty: bool,
}

impl RunConfig {
    pub fn from_cli(cli: Cli) -> anyhow::Result<Self> {
        let mut options = MappingOptions {
            preferred_language: cli.language,
            include_raw_data: cli.include_raw_data,
            ..MappingOptions::default()
        };

        if let Some(timezone) = cli.timezone {
            let timezone = timezone.trim();
            if timezone.is_empty() {
                bail!("timezone cannot be empty");
            }
            options.default_timezone = timezone.to_owned();
        }

        Ok(Self {
            bundle_path: cli.bundle_path,
            options,
            pretty: cli.pretty,
        })
    }

    pub fn bundle_path(&self) -> &Path {
        &self.bundle_path
    }

    pub fn options(&self) -> &MappingOptions {
        &self.options
    }

    pub fn language(&self) -> Language {
        self.options.preferred_language
    }

    pub fn pretty(&self) -> bool {
        self.pretty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_arguments_override_defaults() {
        let cli = Cli::try_parse_from([
            "salud-run",
            "bundle.json",
            "--language",
            "en",
            "--timezone",
            "America/Mexico_City",
            "--pretty",
        ])
        .expect("valid arguments");
        let config = RunConfig::from_cli(cli).expect("valid config");

        assert_eq!(config.bundle_path(), Path::new("bundle.json"));
        assert_eq!(config.language(), Language::En);
        assert_eq!(config.options().default_timezone, "America/Mexico_City");
        assert!(config.pretty());
    }

    #[test]
    fn rejects_unsupported_language() {
        let err = Cli::try_parse_from(["salud-run", "bundle.json", "--language", "fr"])
            .expect_err("fr is not supported");
        assert!(err.to_string().contains("fr"), "error was {err}");
    }

    #[test]
    fn rejects_blank_timezone() {
        let cli = Cli::try_parse_from(["salud-run", "bundle.json", "--timezone", "  "])
            .expect("clap accepts the raw value");
        let err = RunConfig::from_cli(cli).expect_err("blank timezone");
        assert!(err.to_string().contains("timezone"));
    }

    #[test]
    fn requires_bundle_path() {
        assert!(Cli::try_parse_from(["salud-run"]).is_err());
    }
}
