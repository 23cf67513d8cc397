//! Database operations for `presets` and their `preset_options` rows.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tradein_core::{CategoryRows, DeviceType};

use crate::category_rows::{self, OptionLinkRow, RowOwner};
use crate::DbError;

/// A row from the `presets` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PresetRow {
    pub id: i64,
    pub model_name: String,
    pub vendor: String,
    pub device_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPreset<'a> {
    pub model_name: &'a str,
    pub vendor: &'a str,
    pub device_type: DeviceType,
}

#[derive(Debug, Clone, Default)]
pub struct PresetChanges<'a> {
    pub model_name: Option<&'a str>,
    pub vendor: Option<&'a str>,
    pub device_type: Option<DeviceType>,
}

const PRESET_COLUMNS: &str = "id, model_name, vendor, device_type, created_at, updated_at";

/// Lists presets ordered by model name, optionally filtered by device type.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_presets(
    pool: &PgPool,
    device_type: Option<DeviceType>,
) -> Result<Vec<PresetRow>, DbError> {
    let sql = format!(
        "SELECT {PRESET_COLUMNS} FROM presets \
         WHERE ($1::TEXT IS NULL OR device_type = $1::TEXT) \
         ORDER BY model_name"
    );
    let rows = sqlx::query_as::<_, PresetRow>(&sql)
        .bind(device_type.map(DeviceType::as_str))
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_preset(pool: &PgPool, id: i64) -> Result<Option<PresetRow>, DbError> {
    let sql = format!("SELECT {PRESET_COLUMNS} FROM presets WHERE id = $1");
    let row = sqlx::query_as::<_, PresetRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_preset_by_model_name(
    pool: &PgPool,
    model_name: &str,
) -> Result<Option<PresetRow>, DbError> {
    let sql = format!("SELECT {PRESET_COLUMNS} FROM presets WHERE model_name = $1");
    let row = sqlx::query_as::<_, PresetRow>(&sql)
        .bind(model_name)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_preset_links(
    pool: &PgPool,
    preset_ids: &[i64],
) -> Result<Vec<OptionLinkRow>, DbError> {
    category_rows::load_links(pool, RowOwner::Preset, preset_ids).await
}

/// Returns one preset's deduction rows keyed by category.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or
/// [`DbError::InvalidStoredValue`] for an unknown stored category.
pub async fn preset_category_rows(pool: &PgPool, preset_id: i64) -> Result<CategoryRows, DbError> {
    let links = list_preset_links(pool, &[preset_id]).await?;
    category_rows::group_links(&links)
}

/// Creates a preset with its option rows in a single transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails, including a unique
/// violation on `model_name`.
pub async fn create_preset(
    pool: &PgPool,
    preset: &NewPreset<'_>,
    options: &CategoryRows,
) -> Result<PresetRow, DbError> {
    let mut tx = pool.begin().await?;

    let sql = format!(
        "INSERT INTO presets (model_name, vendor, device_type) \
         VALUES ($1, $2, $3) \
         RETURNING {PRESET_COLUMNS}"
    );
    let row = sqlx::query_as::<_, PresetRow>(&sql)
        .bind(preset.model_name)
        .bind(preset.vendor)
        .bind(preset.device_type.as_str())
        .fetch_one(&mut *tx)
        .await?;

    for (category, rows) in options {
        category_rows::replace_category(&mut *tx, RowOwner::Preset, row.id, *category, rows)
            .await?;
    }

    tx.commit().await?;
    Ok(row)
}

/// Updates a preset and replaces the rows of every category in `replace_options`.
/// Returns `None` if the preset does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn update_preset(
    pool: &PgPool,
    id: i64,
    changes: &PresetChanges<'_>,
    replace_options: &CategoryRows,
) -> Result<Option<PresetRow>, DbError> {
    let mut tx = pool.begin().await?;

    let sql = format!(
        "UPDATE presets \
         SET model_name  = COALESCE($2, model_name), \
             vendor      = COALESCE($3, vendor), \
             device_type = COALESCE($4, device_type), \
             updated_at  = NOW() \
         WHERE id = $1 \
         RETURNING {PRESET_COLUMNS}"
    );
    let Some(row) = sqlx::query_as::<_, PresetRow>(&sql)
        .bind(id)
        .bind(changes.model_name)
        .bind(changes.vendor)
        .bind(changes.device_type.map(DeviceType::as_str))
        .fetch_optional(&mut *tx)
        .await?
    else {
        return Ok(None);
    };

    for (category, rows) in replace_options {
        category_rows::replace_category(&mut *tx, RowOwner::Preset, row.id, *category, rows)
            .await?;
    }

    tx.commit().await?;
    Ok(Some(row))
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_preset(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM presets WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
