//! Option catalog handlers. One table backs every category; the category is
//! always taken from the path.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tradein_core::{DeviceType, OptionCategory};

use crate::middleware::RequestId;

use super::{
    deserialize_some, map_db_error, map_write_error, parse_device_type, required_text,
    validation_error, ApiError, ApiResponse, AppState, ResponseMeta,
};

const LABEL_MAX_LEN: usize = 200;

#[derive(Debug, Serialize)]
pub(super) struct OptionItem {
    id: i64,
    category: String,
    label: String,
    header: Option<String>,
    condition: Option<String>,
    device_type: Option<String>,
    deduction_percentage: Decimal,
    image_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<tradein_db::OptionRow> for OptionItem {
    fn from(row: tradein_db::OptionRow) -> Self {
        Self {
            id: row.id,
            category: row.category,
            label: row.label,
            header: row.header,
            condition: row.condition,
            device_type: row.device_type,
            deduction_percentage: row.deduction_percentage,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct OptionQuery {
    pub device_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateOptionRequest {
    pub label: String,
    pub header: Option<String>,
    pub condition: Option<String>,
    pub device_type: Option<String>,
    #[serde(default)]
    pub deduction_percentage: Decimal,
    pub image_url: Option<String>,
}

// Outer None = "not in request", Some(None) = "clear", Some(Some(v)) = "set".
#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
pub(super) struct UpdateOptionRequest {
    pub label: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub header: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub condition: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub device_type: Option<Option<String>>,
    pub deduction_percentage: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub image_url: Option<Option<String>>,
}

/// Unknown categories are a missing resource, not a bad body.
fn resolve_category(request_id: &str, raw: &str) -> Result<OptionCategory, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::new(request_id, "not_found", format!("unknown option category '{raw}'")))
}

fn check_percentage(request_id: &str, value: Decimal) -> Result<(), ApiError> {
    tradein_core::validate_percentage(value).map_err(|e| validation_error(request_id, e.to_string()))
}

fn option_not_found(request_id: &str, category: OptionCategory, id: i64) -> ApiError {
    ApiError::new(
        request_id,
        "not_found",
        format!("{category} option {id} not found"),
    )
}

/// GET /api/v1/options/{category}
pub(super) async fn list_options(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(category): Path<String>,
    Query(query): Query<OptionQuery>,
) -> Result<Json<ApiResponse<Vec<OptionItem>>>, ApiError> {
    let rid = &req_id.0;
    let category = resolve_category(rid, &category)?;
    let device_type = query
        .device_type
        .as_deref()
        .map(|raw| parse_device_type(rid, raw))
        .transpose()?;

    let rows = tradein_db::list_options(&state.pool, category, device_type)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(OptionItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/admin/options/{category}
pub(super) async fn create_option(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(category): Path<String>,
    Json(body): Json<CreateOptionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OptionItem>>), ApiError> {
    let rid = &req_id.0;
    let category = resolve_category(rid, &category)?;
    let label = required_text(rid, "label", &body.label, LABEL_MAX_LEN)?;
    check_percentage(rid, body.deduction_percentage)?;
    let device_type = body
        .device_type
        .as_deref()
        .map(|raw| parse_device_type(rid, raw))
        .transpose()?;

    let row = tradein_db::create_option(
        &state.pool,
        &tradein_db::NewOption {
            category,
            label: &label,
            header: body.header.as_deref(),
            condition: body.condition.as_deref(),
            device_type,
            deduction_percentage: body.deduction_percentage,
            image_url: body.image_url.as_deref(),
        },
    )
    .await
    .map_err(|e| map_write_error(rid, &e, "an option with that label already exists"))?;

    tracing::info!(option_id = row.id, %category, "option created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: OptionItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PUT /api/v1/admin/options/{category}/{id}
pub(super) async fn update_option(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((category, id)): Path<(String, i64)>,
    Json(body): Json<UpdateOptionRequest>,
) -> Result<Json<ApiResponse<OptionItem>>, ApiError> {
    let rid = &req_id.0;
    let category = resolve_category(rid, &category)?;

    let label = body
        .label
        .as_deref()
        .map(|l| required_text(rid, "label", l, LABEL_MAX_LEN))
        .transpose()?;
    if let Some(pct) = body.deduction_percentage {
        check_percentage(rid, pct)?;
    }
    let device_type: Option<Option<DeviceType>> = match body.device_type.as_ref() {
        None => None,
        Some(None) => Some(None),
        Some(Some(raw)) => Some(Some(parse_device_type(rid, raw)?)),
    };

    let changes = tradein_db::OptionChanges {
        label: label.as_deref(),
        header: body.header.as_ref().map(|v| v.as_deref()),
        condition: body.condition.as_ref().map(|v| v.as_deref()),
        device_type,
        deduction_percentage: body.deduction_percentage,
        image_url: body.image_url.as_ref().map(|v| v.as_deref()),
    };

    let row = tradein_db::update_option(&state.pool, category, id, &changes)
        .await
        .map_err(|e| map_write_error(rid, &e, "an option with that label already exists"))?
        .ok_or_else(|| option_not_found(rid, category, id))?;

    Ok(Json(ApiResponse {
        data: OptionItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/admin/options/{category}/{id}
///
/// Device and preset rows pointing at the option are removed with it.
pub(super) async fn delete_option(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((category, id)): Path<(String, i64)>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let rid = &req_id.0;
    let category = resolve_category(rid, &category)?;

    let deleted = tradein_db::delete_option(&state.pool, category, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !deleted {
        return Err(option_not_found(rid, category, id));
    }

    tracing::info!(option_id = id, %category, "option deleted");

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}
