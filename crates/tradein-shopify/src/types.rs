//! Request and response bodies for the Shopify Admin REST price rule API.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct PriceRuleEnvelope<'a> {
    pub price_rule: NewPriceRule<'a>,
}

/// A single-use fixed-amount discount applied across the whole order.
#[derive(Debug, Serialize)]
pub(crate) struct NewPriceRule<'a> {
    pub title: &'a str,
    pub target_type: &'static str,
    pub target_selection: &'static str,
    pub allocation_method: &'static str,
    pub value_type: &'static str,
    /// Negative amount, serialized as a string (`"-750.00"`).
    pub value: Decimal,
    pub customer_selection: &'static str,
    pub once_per_customer: bool,
    pub usage_limit: u32,
    pub starts_at: DateTime<Utc>,
}

impl<'a> NewPriceRule<'a> {
    pub(crate) fn fixed_amount(title: &'a str, amount: Decimal, starts_at: DateTime<Utc>) -> Self {
        Self {
            title,
            target_type: "line_item",
            target_selection: "all",
            allocation_method: "across",
            value_type: "fixed_amount",
            value: -amount,
            customer_selection: "all",
            once_per_customer: true,
            usage_limit: 1,
            starts_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DiscountCodeEnvelope<'a> {
    pub discount_code: NewDiscountCode<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewDiscountCode<'a> {
    pub code: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PriceRuleResponse {
    pub price_rule: PriceRule,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DiscountCodeResponse {
    pub discount_code: DiscountCode,
}

/// A price rule as returned by Shopify. Unused fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PriceRule {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiscountCode {
    pub id: i64,
    pub price_rule_id: i64,
    pub code: String,
}
