use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tradein_core::CategoryRows;

use crate::middleware::RequestId;

use super::refs::{
    empty_option_rows, group_link_items, parse_categories, resolve_rows, DeductionPayload,
    OptionRowsByCategory,
};
use super::{
    map_db_error, map_write_error, parse_device_type, required_text, ApiError, ApiResponse,
    AppState, ResponseMeta,
};

const MODEL_NAME_CONFLICT: &str = "a preset with that model name already exists";

#[derive(Debug, Serialize)]
pub(super) struct PresetItem {
    id: i64,
    model_name: String,
    vendor: String,
    device_type: String,
    options: OptionRowsByCategory,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PresetItem {
    fn from_row(row: tradein_db::PresetRow, options: OptionRowsByCategory) -> Self {
        Self {
            id: row.id,
            model_name: row.model_name,
            vendor: row.vendor,
            device_type: row.device_type,
            options,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct PresetQuery {
    pub device_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreatePresetRequest {
    pub model_name: String,
    pub vendor: String,
    pub device_type: String,
    #[serde(default)]
    pub options: DeductionPayload,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdatePresetRequest {
    pub model_name: Option<String>,
    pub vendor: Option<String>,
    pub device_type: Option<String>,
    /// Categories present here are replaced; absent ones are kept.
    #[serde(default)]
    pub options: DeductionPayload,
}

async fn preset_item(
    pool: &PgPool,
    request_id: &str,
    row: tradein_db::PresetRow,
) -> Result<PresetItem, ApiError> {
    let links = tradein_db::list_preset_links(pool, &[row.id])
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?;
    let options = group_link_items(links)
        .remove(&row.id)
        .unwrap_or_else(empty_option_rows);
    Ok(PresetItem::from_row(row, options))
}

/// Validates and resolves every category of a preset payload.
async fn resolve_payload(
    pool: &PgPool,
    request_id: &str,
    payload: DeductionPayload,
) -> Result<CategoryRows, ApiError> {
    let requested = parse_categories(request_id, payload)?;
    let mut rows = CategoryRows::new();
    for (category, category_rows) in &requested {
        let resolved = resolve_rows(pool, request_id, *category, category_rows).await?;
        rows.insert(*category, resolved);
    }
    Ok(rows)
}

fn preset_not_found(request_id: &str, id: i64) -> ApiError {
    ApiError::new(request_id, "not_found", format!("preset {id} not found"))
}

/// GET /api/v1/presets
pub(super) async fn list_presets(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<PresetQuery>,
) -> Result<Json<ApiResponse<Vec<PresetItem>>>, ApiError> {
    let rid = &req_id.0;
    let device_type = query
        .device_type
        .as_deref()
        .map(|raw| parse_device_type(rid, raw))
        .transpose()?;

    let rows = tradein_db::list_presets(&state.pool, device_type)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let links = tradein_db::list_preset_links(&state.pool, &ids)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let mut grouped = group_link_items(links);

    let data = rows
        .into_iter()
        .map(|row| {
            let options = grouped.remove(&row.id).unwrap_or_else(empty_option_rows);
            PresetItem::from_row(row, options)
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/presets/{model_name}
pub(super) async fn get_preset(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(model_name): Path<String>,
) -> Result<Json<ApiResponse<PresetItem>>, ApiError> {
    let rid = &req_id.0;
    let row = tradein_db::get_preset_by_model_name(&state.pool, &model_name)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(rid, "not_found", format!("preset '{model_name}' not found"))
        })?;

    let data = preset_item(&state.pool, rid, row).await?;
    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/admin/presets
pub(super) async fn create_preset(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreatePresetRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PresetItem>>), ApiError> {
    let rid = &req_id.0;
    let model_name = required_text(rid, "model_name", &body.model_name, 200)?;
    let vendor = required_text(rid, "vendor", &body.vendor, 100)?;
    let device_type = parse_device_type(rid, &body.device_type)?;

    let mut rows = tradein_core::empty_category_rows();
    rows.extend(resolve_payload(&state.pool, rid, body.options).await?);

    let row = tradein_db::create_preset(
        &state.pool,
        &tradein_db::NewPreset {
            model_name: &model_name,
            vendor: &vendor,
            device_type,
        },
        &rows,
    )
    .await
    .map_err(|e| map_write_error(rid, &e, MODEL_NAME_CONFLICT))?;

    tracing::info!(preset_id = row.id, model_name = %row.model_name, "preset created");

    let data = preset_item(&state.pool, rid, row).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PUT /api/v1/admin/presets/{id}
pub(super) async fn update_preset(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePresetRequest>,
) -> Result<Json<ApiResponse<PresetItem>>, ApiError> {
    let rid = &req_id.0;
    let model_name = body
        .model_name
        .as_deref()
        .map(|m| required_text(rid, "model_name", m, 200))
        .transpose()?;
    let vendor = body
        .vendor
        .as_deref()
        .map(|v| required_text(rid, "vendor", v, 100))
        .transpose()?;
    let device_type = body
        .device_type
        .as_deref()
        .map(|raw| parse_device_type(rid, raw))
        .transpose()?;
    let replace = resolve_payload(&state.pool, rid, body.options).await?;

    let changes = tradein_db::PresetChanges {
        model_name: model_name.as_deref(),
        vendor: vendor.as_deref(),
        device_type,
    };
    let row = tradein_db::update_preset(&state.pool, id, &changes, &replace)
        .await
        .map_err(|e| map_write_error(rid, &e, MODEL_NAME_CONFLICT))?
        .ok_or_else(|| preset_not_found(rid, id))?;

    tracing::info!(preset_id = id, "preset updated");

    let data = preset_item(&state.pool, rid, row).await?;
    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/admin/presets/{id}
pub(super) async fn delete_preset(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let rid = &req_id.0;
    let deleted = tradein_db::delete_preset(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !deleted {
        return Err(preset_not_found(rid, id));
    }

    tracing::info!(preset_id = id, "preset deleted");

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}
