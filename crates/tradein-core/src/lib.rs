pub mod app_config;
pub mod catalog;
pub mod catalog_file;
pub mod config;
pub mod deductions;
pub mod pricing;

use rust_decimal::Decimal;
use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use catalog::{
    empty_category_rows, validate_percentage, validate_price, CategoryRows, DeductionRow,
    DeviceType, OptionCategory, OptionId,
};
pub use catalog_file::{load_catalog, CatalogFile, OptionSeed};
pub use config::{load_app_config, load_app_config_from_env};
pub use deductions::{
    apply_preset, merge_preserving_deductions, overwrite_matching_deductions,
    resolve_option_refs, Resolved,
};
pub use pricing::{compute_final_price, PriceBreakdown};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown option category: {0}")]
    InvalidCategory(String),
    #[error("unknown device type: {0}")]
    InvalidDeviceType(String),
    #[error("deduction percentage must be between 0 and 100, got {0}")]
    InvalidPercentage(Decimal),
    #[error("price must be between 0 and 9999999999.99, got {0}")]
    InvalidPrice(Decimal),
    #[error("at most 2 decimal places are allowed, got {0}")]
    ExcessPrecision(Decimal),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read catalog file {path}: {source}")]
    CatalogFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog file: {0}")]
    CatalogFileParse(#[from] serde_yaml::Error),

    #[error("catalog validation failed: {0}")]
    Validation(String),
}
