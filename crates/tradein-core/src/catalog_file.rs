use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{validate_percentage, DeviceType, OptionCategory};
use crate::ConfigError;

/// One option catalog entry as written in `catalog.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionSeed {
    pub label: String,
    pub header: Option<String>,
    pub condition: Option<String>,
    pub device_type: Option<DeviceType>,
    #[serde(default)]
    pub deduction_percentage: Decimal,
    pub image_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub options: BTreeMap<OptionCategory, Vec<OptionSeed>>,
}

impl CatalogFile {
    /// Total number of option entries across all categories.
    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.values().map(Vec::len).sum()
    }
}

/// Load and validate the option catalog seed file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<CatalogFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_catalog(&content)
}

fn parse_catalog(content: &str) -> Result<CatalogFile, ConfigError> {
    let catalog: CatalogFile = serde_yaml::from_str(content)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

fn validate_catalog(catalog: &CatalogFile) -> Result<(), ConfigError> {
    for (category, seeds) in &catalog.options {
        let mut seen_labels = HashSet::new();

        for seed in seeds {
            let label = seed.label.trim();
            if label.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "{category}: option label must be non-empty"
                )));
            }

            if let Err(e) = validate_percentage(seed.deduction_percentage) {
                return Err(ConfigError::Validation(format!(
                    "{category}: option '{label}': {e}"
                )));
            }

            if !seen_labels.insert(label.to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "{category}: duplicate option label '{label}'"
                )));
            }
        }
    }

    Ok(())
}
