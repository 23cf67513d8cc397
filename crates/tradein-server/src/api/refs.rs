//! Per-category option rows shared by the device and preset handlers.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tradein_core::{DeductionRow, OptionCategory, OptionId, Resolved};

use super::{map_db_error, validation_error, ApiError};

/// `category -> [option_id]` as sent by clients.
pub(super) type OptionRefsPayload = BTreeMap<String, Vec<OptionId>>;

/// `category -> [{option_id, deduction_percentage}]` as sent by clients.
pub(super) type DeductionPayload = BTreeMap<String, Vec<DeductionRow>>;

/// `category -> rows` as returned to clients; every category is present.
pub(super) type OptionRowsByCategory = BTreeMap<&'static str, Vec<OptionRowItem>>;

#[derive(Debug, Clone, Serialize)]
pub(super) struct OptionRowItem {
    pub option_id: i64,
    pub label: String,
    pub header: Option<String>,
    pub image_url: Option<String>,
    pub deduction_percentage: Decimal,
}

/// Parses the category keys of a request map.
///
/// Keys are accepted in snake or kebab case; two keys naming the same
/// category are rejected.
pub(super) fn parse_categories<T>(
    request_id: &str,
    payload: BTreeMap<String, T>,
) -> Result<BTreeMap<OptionCategory, T>, ApiError> {
    let mut parsed = BTreeMap::new();
    for (raw, value) in payload {
        let category: OptionCategory = raw
            .parse()
            .map_err(|e: tradein_core::CoreError| validation_error(request_id, e.to_string()))?;
        if parsed.insert(category, value).is_some() {
            return Err(validation_error(
                request_id,
                format!("category '{category}' given more than once"),
            ));
        }
    }
    Ok(parsed)
}

/// Resolves requested ids against the category's catalog, dropping unknown ids.
pub(super) async fn resolve_refs(
    pool: &PgPool,
    request_id: &str,
    category: OptionCategory,
    requested: &[OptionId],
) -> Result<Resolved, ApiError> {
    let catalog = tradein_db::list_option_ids(pool, category)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?;

    let resolved = tradein_core::resolve_option_refs(requested, catalog);
    if !resolved.dropped.is_empty() {
        tracing::debug!(
            %category,
            dropped = resolved.dropped.len(),
            "ignoring unknown option references"
        );
    }
    Ok(resolved)
}

/// Resolves explicit rows, keeping the first given percentage for each known id.
pub(super) async fn resolve_rows(
    pool: &PgPool,
    request_id: &str,
    category: OptionCategory,
    rows: &[DeductionRow],
) -> Result<Vec<DeductionRow>, ApiError> {
    validate_rows(request_id, rows)?;

    let mut percentages: HashMap<OptionId, Decimal> = HashMap::with_capacity(rows.len());
    for row in rows {
        percentages
            .entry(row.option_id)
            .or_insert(row.deduction_percentage);
    }

    let requested: Vec<OptionId> = rows.iter().map(|r| r.option_id).collect();
    let resolved = resolve_refs(pool, request_id, category, &requested).await?;

    Ok(resolved
        .option_ids()
        .into_iter()
        .map(|option_id| DeductionRow {
            option_id,
            deduction_percentage: percentages
                .get(&option_id)
                .copied()
                .unwrap_or(Decimal::ZERO),
        })
        .collect())
}

pub(super) fn validate_rows(request_id: &str, rows: &[DeductionRow]) -> Result<(), ApiError> {
    for row in rows {
        tradein_core::validate_percentage(row.deduction_percentage).map_err(|e| {
            validation_error(request_id, format!("option {}: {e}", row.option_id))
        })?;
    }
    Ok(())
}

pub(super) fn empty_option_rows() -> OptionRowsByCategory {
    OptionCategory::ALL
        .into_iter()
        .map(|c| (c.as_str(), Vec::new()))
        .collect()
}

/// Groups link rows by owner id, then by category.
pub(super) fn group_link_items(
    links: Vec<tradein_db::OptionLinkRow>,
) -> HashMap<i64, OptionRowsByCategory> {
    let mut grouped: HashMap<i64, OptionRowsByCategory> = HashMap::new();

    for link in links {
        let Ok(category) = link.category.parse::<OptionCategory>() else {
            tracing::warn!(
                owner_id = link.owner_id,
                category = %link.category,
                "skipping option row with unknown category"
            );
            continue;
        };

        grouped
            .entry(link.owner_id)
            .or_insert_with(empty_option_rows)
            .entry(category.as_str())
            .or_default()
            .push(OptionRowItem {
                option_id: link.option_id,
                label: link.label,
                header: link.header,
                image_url: link.image_url,
                deduction_percentage: link.deduction_percentage,
            });
    }

    grouped
}
