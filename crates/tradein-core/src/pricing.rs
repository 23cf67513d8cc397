//! Trade-in price composition.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Result of applying selected deductions to a device's maximum price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceBreakdown {
    pub max_price: Decimal,
    /// Sum of the selected deductions, before capping.
    pub total_deduction_percentage: Decimal,
    /// Deduction actually applied; the sum capped at 100.
    pub applied_deduction_percentage: Decimal,
    pub final_price: Decimal,
}

/// Applies additive percentage deductions to `max_price`.
///
/// Deductions are summed (not compounded) and capped at 100%, negative
/// inputs count as zero, and the result is rounded to cents.
#[must_use]
pub fn compute_final_price<I>(max_price: Decimal, deductions: I) -> PriceBreakdown
where
    I: IntoIterator<Item = Decimal>,
{
    let total: Decimal = deductions
        .into_iter()
        .map(|d| d.max(Decimal::ZERO))
        .sum();
    let applied = total.min(Decimal::ONE_HUNDRED);

    let final_price = (max_price * (Decimal::ONE_HUNDRED - applied) / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .max(Decimal::ZERO);

    PriceBreakdown {
        max_price,
        total_deduction_percentage: total,
        applied_deduction_percentage: applied,
        final_price,
    }
}
