use std::collections::HashMap;

use axum::{extract::State, Extension, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tradein_core::{OptionId, PriceBreakdown};

use crate::middleware::RequestId;

use super::refs::{parse_categories, OptionRefsPayload};
use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct QuoteRequest {
    pub model_name: String,
    /// `category -> [option_id]` chosen during inspection.
    #[serde(default)]
    pub selections: OptionRefsPayload,
}

#[derive(Debug, Serialize)]
pub(super) struct AppliedDeduction {
    category: &'static str,
    option_id: i64,
    label: String,
    deduction_percentage: Decimal,
}

#[derive(Debug, Serialize)]
pub(super) struct QuoteResponse {
    model_name: String,
    #[serde(flatten)]
    breakdown: PriceBreakdown,
    applied: Vec<AppliedDeduction>,
}

/// POST /api/v1/quotes
///
/// Prices a device from its own deduction rows. Selected options the device
/// does not carry are ignored.
pub(super) async fn create_quote(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<QuoteRequest>,
) -> Result<Json<ApiResponse<QuoteResponse>>, ApiError> {
    let rid = &req_id.0;
    let selections = parse_categories(rid, body.selections)?;

    let device = tradein_db::get_device_by_model_name(&state.pool, &body.model_name)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                rid,
                "not_found",
                format!("device '{}' not found", body.model_name),
            )
        })?;

    let links = tradein_db::list_device_links(&state.pool, &[device.id])
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let mut by_category: HashMap<&str, HashMap<OptionId, &tradein_db::OptionLinkRow>> =
        HashMap::new();
    for link in &links {
        by_category
            .entry(link.category.as_str())
            .or_default()
            .insert(OptionId(link.option_id), link);
    }

    let mut applied = Vec::new();
    for (category, requested) in &selections {
        let Some(device_rows) = by_category.get(category.as_str()) else {
            tracing::debug!(%category, "quote selection for category with no device rows");
            continue;
        };

        let resolved = tradein_core::resolve_option_refs(requested, device_rows.keys().copied());
        if !resolved.dropped.is_empty() {
            tracing::debug!(
                %category,
                dropped = resolved.dropped.len(),
                "ignoring quote selections not attached to device"
            );
        }

        for option_id in resolved.option_ids() {
            if let Some(link) = device_rows.get(&option_id) {
                applied.push(AppliedDeduction {
                    category: category.as_str(),
                    option_id: link.option_id,
                    label: link.label.clone(),
                    deduction_percentage: link.deduction_percentage,
                });
            }
        }
    }

    let breakdown = tradein_core::compute_final_price(
        device.max_price,
        applied.iter().map(|a| a.deduction_percentage),
    );

    Ok(Json(ApiResponse {
        data: QuoteResponse {
            model_name: device.model_name,
            breakdown,
            applied,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
