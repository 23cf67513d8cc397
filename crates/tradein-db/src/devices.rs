//! Database operations for `devices` and their `device_options` rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tradein_core::{CategoryRows, DeviceType};

use crate::category_rows::{self, OptionLinkRow, RowOwner};
use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `devices` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DeviceRow {
    pub id: i64,
    pub vendor: String,
    pub device_type: String,
    pub model_name: String,
    pub max_price: Decimal,
    pub colors: Vec<String>,
    pub storage_sizes: Vec<String>,
    pub memory_sizes: Vec<String>,
    pub payment_options: Vec<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDevice<'a> {
    pub vendor: &'a str,
    pub device_type: DeviceType,
    pub model_name: &'a str,
    pub max_price: Decimal,
    pub colors: &'a [String],
    pub storage_sizes: &'a [String],
    pub memory_sizes: &'a [String],
    pub payment_options: &'a [String],
    pub image_url: Option<&'a str>,
}

/// Sparse update for a device's intrinsic attributes.
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default)]
pub struct DeviceChanges<'a> {
    pub vendor: Option<&'a str>,
    pub device_type: Option<DeviceType>,
    pub model_name: Option<&'a str>,
    pub max_price: Option<Decimal>,
    pub colors: Option<&'a [String]>,
    pub storage_sizes: Option<&'a [String]>,
    pub memory_sizes: Option<&'a [String]>,
    pub payment_options: Option<&'a [String]>,
    pub image_url: Option<Option<&'a str>>,
}

const DEVICE_COLUMNS: &str = "id, vendor, device_type, model_name, max_price, colors, \
     storage_sizes, memory_sizes, payment_options, image_url, created_at, updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Lists devices ordered by model name, optionally filtered by device type.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_devices(
    pool: &PgPool,
    device_type: Option<DeviceType>,
) -> Result<Vec<DeviceRow>, DbError> {
    let sql = format!(
        "SELECT {DEVICE_COLUMNS} FROM devices \
         WHERE ($1::TEXT IS NULL OR device_type = $1::TEXT) \
         ORDER BY model_name"
    );
    let rows = sqlx::query_as::<_, DeviceRow>(&sql)
        .bind(device_type.map(DeviceType::as_str))
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Returns a device by id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_device(pool: &PgPool, id: i64) -> Result<Option<DeviceRow>, DbError> {
    let sql = format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE id = $1");
    let row = sqlx::query_as::<_, DeviceRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Returns a device by its unique model name, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_device_by_model_name(
    pool: &PgPool,
    model_name: &str,
) -> Result<Option<DeviceRow>, DbError> {
    let sql = format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE model_name = $1");
    let row = sqlx::query_as::<_, DeviceRow>(&sql)
        .bind(model_name)
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Loads the option rows (with option labels) for the given devices.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_device_links(
    pool: &PgPool,
    device_ids: &[i64],
) -> Result<Vec<OptionLinkRow>, DbError> {
    category_rows::load_links(pool, RowOwner::Device, device_ids).await
}

/// Returns one device's deduction rows keyed by category.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or
/// [`DbError::InvalidStoredValue`] for an unknown stored category.
pub async fn device_category_rows(pool: &PgPool, device_id: i64) -> Result<CategoryRows, DbError> {
    let links = list_device_links(pool, &[device_id]).await?;
    category_rows::group_links(&links)
}

/// Creates a device with its option rows in a single transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails, including a unique
/// violation on `model_name`.
pub async fn create_device(
    pool: &PgPool,
    device: &NewDevice<'_>,
    options: &CategoryRows,
) -> Result<DeviceRow, DbError> {
    let mut tx = pool.begin().await?;

    let sql = format!(
        "INSERT INTO devices \
           (vendor, device_type, model_name, max_price, colors, storage_sizes, \
            memory_sizes, payment_options, image_url) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING {DEVICE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, DeviceRow>(&sql)
        .bind(device.vendor)
        .bind(device.device_type.as_str())
        .bind(device.model_name)
        .bind(device.max_price)
        .bind(device.colors)
        .bind(device.storage_sizes)
        .bind(device.memory_sizes)
        .bind(device.payment_options)
        .bind(device.image_url)
        .fetch_one(&mut *tx)
        .await?;

    for (category, rows) in options {
        category_rows::replace_category(&mut *tx, RowOwner::Device, row.id, *category, rows)
            .await?;
    }

    tx.commit().await?;
    Ok(row)
}

/// Updates a device's attributes and replaces the listed categories' rows.
///
/// Categories absent from `replace_options` keep their stored rows. Returns
/// `None` if the device does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn update_device(
    pool: &PgPool,
    id: i64,
    changes: &DeviceChanges<'_>,
    replace_options: &CategoryRows,
) -> Result<Option<DeviceRow>, DbError> {
    let mut tx = pool.begin().await?;

    let sql = format!(
        "UPDATE devices \
         SET vendor          = COALESCE($2, vendor), \
             device_type     = COALESCE($3, device_type), \
             model_name      = COALESCE($4, model_name), \
             max_price       = COALESCE($5, max_price), \
             colors          = COALESCE($6, colors), \
             storage_sizes   = COALESCE($7, storage_sizes), \
             memory_sizes    = COALESCE($8, memory_sizes), \
             payment_options = COALESCE($9, payment_options), \
             image_url       = CASE WHEN $10::BOOL THEN $11 ELSE image_url END, \
             updated_at      = NOW() \
         WHERE id = $1 \
         RETURNING {DEVICE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, DeviceRow>(&sql)
        .bind(id)
        .bind(changes.vendor)
        .bind(changes.device_type.map(DeviceType::as_str))
        .bind(changes.model_name)
        .bind(changes.max_price)
        .bind(changes.colors)
        .bind(changes.storage_sizes)
        .bind(changes.memory_sizes)
        .bind(changes.payment_options)
        .bind(changes.image_url.is_some())
        .bind(changes.image_url.flatten())
        .fetch_optional(&mut *tx)
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    for (category, rows) in replace_options {
        category_rows::replace_category(&mut *tx, RowOwner::Device, row.id, *category, rows)
            .await?;
    }

    tx.commit().await?;
    Ok(Some(row))
}

/// Writes deduction percentages onto a device's existing option rows.
///
/// Rows not already attached to the device are skipped. Returns the number
/// of rows written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn save_device_deductions(
    pool: &PgPool,
    device_id: i64,
    rows: &CategoryRows,
) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;
    let written =
        category_rows::update_percentages(&mut *tx, RowOwner::Device, device_id, rows).await?;

    sqlx::query("UPDATE devices SET updated_at = NOW() WHERE id = $1")
        .bind(device_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(written)
}

/// Deletes a device and its option rows. Returns `false` if nothing was deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_device(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM devices WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
