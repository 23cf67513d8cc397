//! Device catalog handlers.
//!
//! - `GET  /api/v1/devices`: list, `?device_type=`
//! - `GET  /api/v1/devices/{model_name}`: one device by model name
//! - `POST /api/v1/admin/devices`: create
//! - `PUT  /api/v1/admin/devices/{id}`: sparse update, keeps tuned deductions
//! - `DELETE /api/v1/admin/devices/{id}`
//! - `PUT  /api/v1/admin/devices/{id}/device-details`: set deductions on existing rows
//! - `POST /api/v1/admin/devices/{id}/apply-preset`: copy a preset's deductions

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tradein_core::CategoryRows;

use crate::middleware::RequestId;

use super::refs::{
    empty_option_rows, group_link_items, parse_categories, resolve_refs, validate_rows,
    DeductionPayload, OptionRefsPayload, OptionRowsByCategory,
};
use super::{
    deserialize_some, map_db_error, map_write_error, parse_device_type, required_text,
    validation_error, ApiError, ApiResponse, AppState, ResponseMeta,
};

const MODEL_NAME_CONFLICT: &str = "a device with that model name already exists";

#[derive(Debug, Serialize)]
pub(super) struct DeviceItem {
    id: i64,
    vendor: String,
    device_type: String,
    model_name: String,
    max_price: Decimal,
    colors: Vec<String>,
    storage_sizes: Vec<String>,
    memory_sizes: Vec<String>,
    payment_options: Vec<String>,
    image_url: Option<String>,
    options: OptionRowsByCategory,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DeviceItem {
    fn from_row(row: tradein_db::DeviceRow, options: OptionRowsByCategory) -> Self {
        Self {
            id: row.id,
            vendor: row.vendor,
            device_type: row.device_type,
            model_name: row.model_name,
            max_price: row.max_price,
            colors: row.colors,
            storage_sizes: row.storage_sizes,
            memory_sizes: row.memory_sizes,
            payment_options: row.payment_options,
            image_url: row.image_url,
            options,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct DeductionUpdateResponse {
    device: DeviceItem,
    rows_updated: usize,
}

#[derive(Debug, Deserialize)]
pub(super) struct DeviceQuery {
    pub device_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateDeviceRequest {
    pub vendor: String,
    pub device_type: String,
    pub model_name: String,
    pub max_price: Decimal,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub storage_sizes: Vec<String>,
    #[serde(default)]
    pub memory_sizes: Vec<String>,
    #[serde(default)]
    pub payment_options: Vec<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub options: OptionRefsPayload,
}

#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
pub(super) struct UpdateDeviceRequest {
    pub vendor: Option<String>,
    pub device_type: Option<String>,
    pub model_name: Option<String>,
    pub max_price: Option<Decimal>,
    pub colors: Option<Vec<String>>,
    pub storage_sizes: Option<Vec<String>>,
    pub memory_sizes: Option<Vec<String>>,
    pub payment_options: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub image_url: Option<Option<String>>,
    /// Categories present here get a new reference set; absent ones keep theirs.
    #[serde(default)]
    pub options: OptionRefsPayload,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApplyPresetRequest {
    pub preset_id: i64,
}

fn check_price(request_id: &str, value: Decimal) -> Result<(), ApiError> {
    tradein_core::validate_price(value).map_err(|e| validation_error(request_id, e.to_string()))
}

fn device_not_found(request_id: &str, id: i64) -> ApiError {
    ApiError::new(request_id, "not_found", format!("device {id} not found"))
}

async fn require_device(
    pool: &PgPool,
    request_id: &str,
    id: i64,
) -> Result<tradein_db::DeviceRow, ApiError> {
    tradein_db::get_device(pool, id)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?
        .ok_or_else(|| device_not_found(request_id, id))
}

async fn current_rows(pool: &PgPool, request_id: &str, id: i64) -> Result<CategoryRows, ApiError> {
    tradein_db::device_category_rows(pool, id)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))
}

/// Loads a device's option rows and builds the response item.
async fn device_item(
    pool: &PgPool,
    request_id: &str,
    row: tradein_db::DeviceRow,
) -> Result<DeviceItem, ApiError> {
    let links = tradein_db::list_device_links(pool, &[row.id])
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?;
    let options = group_link_items(links)
        .remove(&row.id)
        .unwrap_or_else(empty_option_rows);
    Ok(DeviceItem::from_row(row, options))
}

/// Writes `rows` back after an in-memory retarget and returns the fresh device.
async fn save_deductions(
    pool: &PgPool,
    request_id: &str,
    id: i64,
    rows: &CategoryRows,
) -> Result<DeviceItem, ApiError> {
    tradein_db::save_device_deductions(pool, id, rows)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?;
    let row = require_device(pool, request_id, id).await?;
    device_item(pool, request_id, row).await
}

/// GET /api/v1/devices
pub(super) async fn list_devices(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<DeviceQuery>,
) -> Result<Json<ApiResponse<Vec<DeviceItem>>>, ApiError> {
    let rid = &req_id.0;
    let device_type = query
        .device_type
        .as_deref()
        .map(|raw| parse_device_type(rid, raw))
        .transpose()?;

    let rows = tradein_db::list_devices(&state.pool, device_type)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let links = tradein_db::list_device_links(&state.pool, &ids)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let mut grouped = group_link_items(links);

    let data = rows
        .into_iter()
        .map(|row| {
            let options = grouped.remove(&row.id).unwrap_or_else(empty_option_rows);
            DeviceItem::from_row(row, options)
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/devices/{model_name}
pub(super) async fn get_device(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(model_name): Path<String>,
) -> Result<Json<ApiResponse<DeviceItem>>, ApiError> {
    let rid = &req_id.0;
    let row = tradein_db::get_device_by_model_name(&state.pool, &model_name)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(rid, "not_found", format!("device '{model_name}' not found"))
        })?;

    let data = device_item(&state.pool, rid, row).await?;
    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/admin/devices
///
/// Referenced options start at 0%; unknown option ids are dropped.
pub(super) async fn create_device(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateDeviceRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DeviceItem>>), ApiError> {
    let rid = &req_id.0;
    let vendor = required_text(rid, "vendor", &body.vendor, 100)?;
    let model_name = required_text(rid, "model_name", &body.model_name, 200)?;
    let device_type = parse_device_type(rid, &body.device_type)?;
    check_price(rid, body.max_price)?;
    let requested = parse_categories(rid, body.options)?;

    let mut rows = tradein_core::empty_category_rows();
    for (category, ids) in &requested {
        let resolved = resolve_refs(&state.pool, rid, *category, ids).await?;
        rows.insert(*category, resolved.rows);
    }

    let row = tradein_db::create_device(
        &state.pool,
        &tradein_db::NewDevice {
            vendor: &vendor,
            device_type,
            model_name: &model_name,
            max_price: body.max_price,
            colors: &body.colors,
            storage_sizes: &body.storage_sizes,
            memory_sizes: &body.memory_sizes,
            payment_options: &body.payment_options,
            image_url: body.image_url.as_deref(),
        },
        &rows,
    )
    .await
    .map_err(|e| map_write_error(rid, &e, MODEL_NAME_CONFLICT))?;

    tracing::info!(device_id = row.id, model_name = %row.model_name, "device created");

    let data = device_item(&state.pool, rid, row).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PUT /api/v1/admin/devices/{id}
///
/// Each re-sent option keeps its stored non-zero deduction; new options start
/// at 0%. Use `device-details` to set a deduction back to 0.
pub(super) async fn update_device(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateDeviceRequest>,
) -> Result<Json<ApiResponse<DeviceItem>>, ApiError> {
    let rid = &req_id.0;

    let vendor = body
        .vendor
        .as_deref()
        .map(|v| required_text(rid, "vendor", v, 100))
        .transpose()?;
    let model_name = body
        .model_name
        .as_deref()
        .map(|m| required_text(rid, "model_name", m, 200))
        .transpose()?;
    let device_type = body
        .device_type
        .as_deref()
        .map(|raw| parse_device_type(rid, raw))
        .transpose()?;
    if let Some(price) = body.max_price {
        check_price(rid, price)?;
    }
    let requested = parse_categories(rid, body.options)?;

    require_device(&state.pool, rid, id).await?;
    let existing = current_rows(&state.pool, rid, id).await?;

    let mut replace = CategoryRows::new();
    for (category, ids) in &requested {
        let resolved = resolve_refs(&state.pool, rid, *category, ids).await?;
        let prior = existing.get(category).map_or(&[][..], Vec::as_slice);
        replace.insert(
            *category,
            tradein_core::merge_preserving_deductions(prior, resolved.option_ids()),
        );
    }

    let changes = tradein_db::DeviceChanges {
        vendor: vendor.as_deref(),
        device_type,
        model_name: model_name.as_deref(),
        max_price: body.max_price,
        colors: body.colors.as_deref(),
        storage_sizes: body.storage_sizes.as_deref(),
        memory_sizes: body.memory_sizes.as_deref(),
        payment_options: body.payment_options.as_deref(),
        image_url: body.image_url.as_ref().map(|v| v.as_deref()),
    };

    let row = tradein_db::update_device(&state.pool, id, &changes, &replace)
        .await
        .map_err(|e| map_write_error(rid, &e, MODEL_NAME_CONFLICT))?
        .ok_or_else(|| device_not_found(rid, id))?;

    tracing::info!(
        device_id = id,
        categories_replaced = replace.len(),
        "device updated"
    );

    let data = device_item(&state.pool, rid, row).await?;
    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/admin/devices/{id}
pub(super) async fn delete_device(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let rid = &req_id.0;
    let deleted = tradein_db::delete_device(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !deleted {
        return Err(device_not_found(rid, id));
    }

    tracing::info!(device_id = id, "device deleted");

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PUT /api/v1/admin/devices/{id}/device-details
///
/// Sets deductions on rows the device already has. Unknown option ids are
/// ignored and no rows are added or removed.
pub(super) async fn update_device_details(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<DeductionPayload>,
) -> Result<Json<ApiResponse<DeductionUpdateResponse>>, ApiError> {
    let rid = &req_id.0;
    let incoming: CategoryRows = parse_categories(rid, body)?;
    for rows in incoming.values() {
        validate_rows(rid, rows)?;
    }

    require_device(&state.pool, rid, id).await?;
    let mut rows = current_rows(&state.pool, rid, id).await?;
    let rows_updated = tradein_core::overwrite_matching_deductions(&mut rows, &incoming);

    let device = save_deductions(&state.pool, rid, id, &rows).await?;
    tracing::info!(device_id = id, rows_updated, "device deductions updated");

    Ok(Json(ApiResponse {
        data: DeductionUpdateResponse {
            device,
            rows_updated,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/admin/devices/{id}/apply-preset
pub(super) async fn apply_preset_to_device(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<ApplyPresetRequest>,
) -> Result<Json<ApiResponse<DeductionUpdateResponse>>, ApiError> {
    let rid = &req_id.0;

    require_device(&state.pool, rid, id).await?;
    tradein_db::get_preset(&state.pool, body.preset_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                rid,
                "not_found",
                format!("preset {} not found", body.preset_id),
            )
        })?;

    let preset_rows = tradein_db::preset_category_rows(&state.pool, body.preset_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let mut rows = current_rows(&state.pool, rid, id).await?;
    let rows_updated = tradein_core::apply_preset(&mut rows, &preset_rows);

    let device = save_deductions(&state.pool, rid, id, &rows).await?;
    tracing::info!(
        device_id = id,
        preset_id = body.preset_id,
        rows_updated,
        "preset applied"
    );

    Ok(Json(ApiResponse {
        data: DeductionUpdateResponse {
            device,
            rows_updated,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
