use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

fn require(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("missing required environment variable {}", key))
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Settings for the listing collector, read once at startup. A second country
/// is optional; when both `COUNTRY_2` and `OUTPUT_FILE_2` are set the
/// collector runs the two countries sequentially.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub main_site: String,
    pub country_1: String,
    pub output_file_1: PathBuf,
    pub country_2: Option<String>,
    pub output_file_2: Option<PathBuf>,
    pub log_file: PathBuf,
    pub card_selector: String,
    pub apply_filter: String,
}

impl CollectorConfig {
    pub fn from_env() -> Result<Self> {
        Ok(CollectorConfig {
            main_site: require("MAIN_SITE")?,
            country_1: require("COUNTRY_1")?,
            output_file_1: require("OUTPUT_FILE_1")?.into(),
            country_2: optional("COUNTRY_2"),
            output_file_2: optional("OUTPUT_FILE_2").map(PathBuf::from),
            log_file: require("LOG_FILE_1")?.into(),
            card_selector: require("LISTING_CARD_SELECTOR")?,
            apply_filter: require("APPLY_FILTER")?,
        })
    }

    /// The (country, output file) runs to perform, in order.
    pub fn targets(&self) -> Vec<(&str, &Path)> {
        let mut targets = vec![(self.country_1.as_str(), self.output_file_1.as_path())];
        if let (Some(country), Some(output)) = (&self.country_2, &self.output_file_2) {
            targets.push((country.as_str(), output.as_path()));
        }
        targets
    }
}

/// Settings for the detail enricher. `country_1` and `country_2` name the two
/// country-tag columns of the input table; the first also drives the derived
/// country-code column of the output.
#[derive(Debug, Clone)]
pub struct EnricherConfig {
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    pub backup_file: PathBuf,
    pub log_file: PathBuf,
    pub country_1: String,
    pub country_2: String,
}

impl EnricherConfig {
    pub fn from_env() -> Result<Self> {
        Ok(EnricherConfig {
            input_file: require("INPUT_FILE")?.into(),
            output_file: require("OUTPUT_FILE")?.into(),
            backup_file: require("BACKUP_FILE")?.into(),
            log_file: require("LOG_FILE")?.into(),
            country_1: require("COUNTRY_1")?,
            country_2: require("COUNTRY_2")?,
        })
    }
}
