use rust_decimal::Decimal;
use sqlx::PgPool;
use tradein_core::{CategoryRows, DeductionRow, OptionCategory, OptionId};

/// Picks the device rows named by `selections`, in selection order.
///
/// Selections the device does not carry are skipped; repeats count once.
pub(crate) fn select_deductions(
    rows: &CategoryRows,
    selections: &[(OptionCategory, OptionId)],
) -> (Vec<(OptionCategory, DeductionRow)>, Vec<(OptionCategory, OptionId)>) {
    let mut applied: Vec<(OptionCategory, DeductionRow)> = Vec::new();
    let mut skipped = Vec::new();

    for &(category, option_id) in selections {
        let found = rows
            .get(&category)
            .and_then(|list| list.iter().find(|r| r.option_id == option_id));
        match found {
            Some(row) => {
                if !applied
                    .iter()
                    .any(|(c, r)| *c == category && r.option_id == option_id)
                {
                    applied.push((category, *row));
                }
            }
            None => skipped.push((category, option_id)),
        }
    }

    (applied, skipped)
}

pub(crate) async fn run_quote(
    pool: &PgPool,
    model_name: &str,
    selections: &[(OptionCategory, OptionId)],
) -> anyhow::Result<()> {
    let device = tradein_db::get_device_by_model_name(pool, model_name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("device '{model_name}' not found"))?;
    let rows = tradein_db::device_category_rows(pool, device.id).await?;

    let (applied, skipped) = select_deductions(&rows, selections);
    for (category, option_id) in &skipped {
        tracing::warn!(%category, option_id = option_id.0, "option not attached to device; ignored");
    }

    let breakdown = tradein_core::compute_final_price(
        device.max_price,
        applied.iter().map(|(_, r)| r.deduction_percentage),
    );

    println!("{} (max {})", device.model_name, breakdown.max_price);
    for (category, row) in &applied {
        println!("  {category:<16} #{:<6} -{}%", row.option_id.0, row.deduction_percentage);
    }
    if breakdown.total_deduction_percentage > Decimal::ONE_HUNDRED {
        println!(
            "  deductions total {}%, capped at 100%",
            breakdown.total_deduction_percentage
        );
    }
    println!("final price: {}", breakdown.final_price);
    Ok(())
}
