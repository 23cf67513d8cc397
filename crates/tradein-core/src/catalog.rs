//! Catalog vocabulary shared by every crate: option categories, device
//! types, and the `(option, deduction)` rows that devices and presets carry.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A deduction category. Each category owns one option catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionCategory {
    BatteryHealth,
    CosmeticIssue,
    Fault,
    Repair,
    FrontScreen,
    Back,
    Side,
    SimVariant,
    Pta,
    Accessories,
    Body,
    Connectivity,
    Processor,
    Strap,
    Band,
    ApplePencil,
}

impl OptionCategory {
    pub const ALL: [OptionCategory; 16] = [
        OptionCategory::BatteryHealth,
        OptionCategory::CosmeticIssue,
        OptionCategory::Fault,
        OptionCategory::Repair,
        OptionCategory::FrontScreen,
        OptionCategory::Back,
        OptionCategory::Side,
        OptionCategory::SimVariant,
        OptionCategory::Pta,
        OptionCategory::Accessories,
        OptionCategory::Body,
        OptionCategory::Connectivity,
        OptionCategory::Processor,
        OptionCategory::Strap,
        OptionCategory::Band,
        OptionCategory::ApplePencil,
    ];

    /// Stable wire and storage name, e.g. `"battery_health"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OptionCategory::BatteryHealth => "battery_health",
            OptionCategory::CosmeticIssue => "cosmetic_issue",
            OptionCategory::Fault => "fault",
            OptionCategory::Repair => "repair",
            OptionCategory::FrontScreen => "front_screen",
            OptionCategory::Back => "back",
            OptionCategory::Side => "side",
            OptionCategory::SimVariant => "sim_variant",
            OptionCategory::Pta => "pta",
            OptionCategory::Accessories => "accessories",
            OptionCategory::Body => "body",
            OptionCategory::Connectivity => "connectivity",
            OptionCategory::Processor => "processor",
            OptionCategory::Strap => "strap",
            OptionCategory::Band => "band",
            OptionCategory::ApplePencil => "apple_pencil",
        }
    }
}

impl std::fmt::Display for OptionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept the kebab-case form used in URLs too (`front-screen`).
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| CoreError::InvalidCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Iphone,
    Samsung,
    Ipad,
    Macbook,
    Watch,
}

impl DeviceType {
    pub const ALL: [DeviceType; 5] = [
        DeviceType::Iphone,
        DeviceType::Samsung,
        DeviceType::Ipad,
        DeviceType::Macbook,
        DeviceType::Watch,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceType::Iphone => "iphone",
            DeviceType::Samsung => "samsung",
            DeviceType::Ipad => "ipad",
            DeviceType::Macbook => "macbook",
            DeviceType::Watch => "watch",
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == normalized)
            .ok_or_else(|| CoreError::InvalidDeviceType(s.to_string()))
    }
}

/// Identifier of an option catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptionId(pub i64);

impl From<i64> for OptionId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for OptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One option attached to a device or preset, with its own deduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionRow {
    pub option_id: OptionId,
    pub deduction_percentage: Decimal,
}

impl DeductionRow {
    #[must_use]
    pub fn zeroed(option_id: OptionId) -> Self {
        Self {
            option_id,
            deduction_percentage: Decimal::ZERO,
        }
    }
}

/// Per-category option rows of a device or preset.
pub type CategoryRows = BTreeMap<OptionCategory, Vec<DeductionRow>>;

/// A `CategoryRows` map with every category present and empty.
#[must_use]
pub fn empty_category_rows() -> CategoryRows {
    OptionCategory::ALL
        .into_iter()
        .map(|c| (c, Vec::new()))
        .collect()
}

/// Exclusive upper bound of `NUMERIC(12,2)` price columns.
fn price_limit() -> Decimal {
    Decimal::new(10_000_000_000, 0)
}

/// Rejects values that would be rounded when stored with 2 decimal places.
fn check_scale(value: Decimal) -> Result<(), CoreError> {
    if value.normalize().scale() > 2 {
        return Err(CoreError::ExcessPrecision(value));
    }
    Ok(())
}

/// Checks that a deduction percentage lies within `0..=100` with at most
/// 2 decimal places.
///
/// # Errors
///
/// Returns [`CoreError::InvalidPercentage`] when out of range and
/// [`CoreError::ExcessPrecision`] for finer values.
pub fn validate_percentage(value: Decimal) -> Result<(), CoreError> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(CoreError::InvalidPercentage(value));
    }
    check_scale(value)
}

/// Checks that a price is not negative, fits the price column, and has at
/// most 2 decimal places.
///
/// # Errors
///
/// Returns [`CoreError::InvalidPrice`] when out of range and
/// [`CoreError::ExcessPrecision`] for finer values.
pub fn validate_price(value: Decimal) -> Result<(), CoreError> {
    if value < Decimal::ZERO || value >= price_limit() {
        return Err(CoreError::InvalidPrice(value));
    }
    check_scale(value)
}
