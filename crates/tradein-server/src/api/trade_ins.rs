//! Trade-in submission and the admin submission log.
//!
//! A submission issues a Shopify discount (price rule, then code) and only
//! then persists the record. Nothing is persisted when either Shopify call
//! fails, and there is no retry.

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    map_db_error, normalize_limit, required_text, validation_error, ApiError, ApiResponse,
    AppState, ResponseMeta,
};

#[derive(Debug, Deserialize)]
pub(super) struct TradeInRequest {
    pub product_model: String,
    pub trade_in_value: Decimal,
    pub max_price: Option<Decimal>,
    pub storage: Option<String>,
    pub color: Option<String>,
    pub customer_email: Option<String>,
    /// Free-text snapshot of the answers, keyed by category.
    #[serde(default)]
    pub conditions: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(super) struct TradeInResponse {
    discount_code: String,
}

#[derive(Debug, Serialize)]
pub(super) struct SubmissionItem {
    id: Uuid,
    product_model: String,
    trade_in_value: Decimal,
    max_price: Option<Decimal>,
    storage: Option<String>,
    color: Option<String>,
    customer_email: Option<String>,
    conditions: serde_json::Value,
    discount_code: String,
    price_rule_id: i64,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SubmissionQuery {
    pub limit: Option<i64>,
}

fn validate_request(request_id: &str, body: &TradeInRequest) -> Result<String, ApiError> {
    let product_model = required_text(request_id, "product_model", &body.product_model, 200)?;

    // Anything the submission row would reject must fail before Shopify is called.
    if body.trade_in_value <= Decimal::ZERO {
        return Err(validation_error(
            request_id,
            "trade_in_value must be greater than 0",
        ));
    }
    tradein_core::validate_price(body.trade_in_value)
        .map_err(|e| validation_error(request_id, format!("trade_in_value: {e}")))?;
    if let Some(max_price) = body.max_price {
        tradein_core::validate_price(max_price)
            .map_err(|e| validation_error(request_id, format!("max_price: {e}")))?;
    }
    if let Some(email) = body.customer_email.as_deref() {
        if !email.contains('@') {
            return Err(validation_error(
                request_id,
                "customer_email must be an email address",
            ));
        }
    }

    Ok(product_model)
}

/// POST /api/v1/trade-ins
pub(super) async fn submit_trade_in(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<TradeInRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TradeInResponse>>), ApiError> {
    let rid = &req_id.0;
    let product_model = validate_request(rid, &body)?;

    let Some(discounts) = state.discounts.as_ref() else {
        tracing::warn!("trade-in rejected: Shopify credentials are not configured");
        return Err(ApiError::new(
            rid,
            "service_unavailable",
            "discount issuance is not configured",
        ));
    };

    let issued = discounts
        .issue_trade_in_discount(&product_model, body.trade_in_value, &state.discount_prefix)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, product_model = %product_model, "discount issuance failed");
            ApiError::new(rid, "internal_error", "discount issuance failed")
        })?;

    let conditions = serde_json::to_value(&body.conditions).map_err(|e| {
        tracing::error!(error = %e, "failed to encode trade-in conditions");
        ApiError::new(rid, "internal_error", "failed to record trade-in")
    })?;

    let row = tradein_db::insert_submission(
        &state.pool,
        &tradein_db::NewSubmission {
            product_model: &product_model,
            trade_in_value: body.trade_in_value,
            max_price: body.max_price,
            storage: body.storage.as_deref(),
            color: body.color.as_deref(),
            customer_email: body.customer_email.as_deref(),
            conditions: &conditions,
            discount_code: &issued.code,
            price_rule_id: issued.price_rule_id,
        },
    )
    .await
    .map_err(|e| {
        // The discount already exists in Shopify; keep enough to reconcile it.
        tracing::error!(
            error = %e,
            price_rule_id = issued.price_rule_id,
            discount_code = %issued.code,
            "trade-in discount issued but submission not persisted"
        );
        ApiError::new(rid, "internal_error", "failed to record trade-in")
    })?;

    tracing::info!(
        submission_id = %row.public_id,
        product_model = %row.product_model,
        trade_in_value = %row.trade_in_value,
        "trade-in recorded"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: TradeInResponse {
                discount_code: row.discount_code,
            },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/v1/admin/trade-ins
pub(super) async fn list_trade_ins(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SubmissionQuery>,
) -> Result<Json<ApiResponse<Vec<SubmissionItem>>>, ApiError> {
    let rows = tradein_db::list_submissions(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| SubmissionItem {
            id: row.public_id,
            product_model: row.product_model,
            trade_in_value: row.trade_in_value,
            max_price: row.max_price,
            storage: row.storage,
            color: row.color,
            customer_email: row.customer_email,
            conditions: row.conditions,
            discount_code: row.discount_code,
            price_rule_id: row.price_rule_id,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
