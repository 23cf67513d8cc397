//! Database operations for the `condition_options` table (all option catalogs).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tradein_core::{DeviceType, OptionCategory, OptionId};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `condition_options` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OptionRow {
    pub id: i64,
    pub category: String,
    pub label: String,
    pub header: Option<String>,
    pub condition: Option<String>,
    pub device_type: Option<String>,
    pub deduction_percentage: Decimal,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOption<'a> {
    pub category: OptionCategory,
    pub label: &'a str,
    pub header: Option<&'a str>,
    pub condition: Option<&'a str>,
    pub device_type: Option<DeviceType>,
    pub deduction_percentage: Decimal,
    pub image_url: Option<&'a str>,
}

/// Sparse update for an option. `None` keeps the stored value; for nullable
/// columns `Some(None)` clears it.
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default)]
pub struct OptionChanges<'a> {
    pub label: Option<&'a str>,
    pub header: Option<Option<&'a str>>,
    pub condition: Option<Option<&'a str>>,
    pub device_type: Option<Option<DeviceType>>,
    pub deduction_percentage: Option<Decimal>,
    pub image_url: Option<Option<&'a str>>,
}

const OPTION_COLUMNS: &str = "id, category, label, header, condition, device_type, \
     deduction_percentage, image_url, created_at, updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Lists the options of one category, ordered by label.
///
/// With a `device_type` filter, options scoped to that type and options with
/// no device type are both returned.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_options(
    pool: &PgPool,
    category: OptionCategory,
    device_type: Option<DeviceType>,
) -> Result<Vec<OptionRow>, DbError> {
    let sql = format!(
        "SELECT {OPTION_COLUMNS} FROM condition_options \
         WHERE category = $1 \
           AND ($2::TEXT IS NULL OR device_type IS NULL OR device_type = $2::TEXT) \
         ORDER BY label, id"
    );
    let rows = sqlx::query_as::<_, OptionRow>(&sql)
        .bind(category.as_str())
        .bind(device_type.map(DeviceType::as_str))
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Returns the ids of every option in a category.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_option_ids(
    pool: &PgPool,
    category: OptionCategory,
) -> Result<Vec<OptionId>, DbError> {
    let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM condition_options WHERE category = $1")
        .bind(category.as_str())
        .fetch_all(pool)
        .await?;

    Ok(ids.into_iter().map(OptionId).collect())
}

/// Creates an option and returns the inserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails, including a unique violation
/// on `(category, label)`.
pub async fn create_option(pool: &PgPool, option: &NewOption<'_>) -> Result<OptionRow, DbError> {
    let sql = format!(
        "INSERT INTO condition_options \
           (category, label, header, condition, device_type, deduction_percentage, image_url) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {OPTION_COLUMNS}"
    );
    let row = sqlx::query_as::<_, OptionRow>(&sql)
        .bind(option.category.as_str())
        .bind(option.label)
        .bind(option.header)
        .bind(option.condition)
        .bind(option.device_type.map(DeviceType::as_str))
        .bind(option.deduction_percentage)
        .bind(option.image_url)
        .fetch_one(pool)
        .await?;

    Ok(row)
}

/// Applies a sparse update to an option, returning `None` if it does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_option(
    pool: &PgPool,
    category: OptionCategory,
    id: i64,
    changes: &OptionChanges<'_>,
) -> Result<Option<OptionRow>, DbError> {
    let sql = format!(
        "UPDATE condition_options \
         SET label                = COALESCE($3, label), \
             header               = CASE WHEN $4::BOOL THEN $5 ELSE header END, \
             condition            = CASE WHEN $6::BOOL THEN $7 ELSE condition END, \
             device_type          = CASE WHEN $8::BOOL THEN $9 ELSE device_type END, \
             deduction_percentage = COALESCE($10, deduction_percentage), \
             image_url            = CASE WHEN $11::BOOL THEN $12 ELSE image_url END, \
             updated_at           = NOW() \
         WHERE category = $1 AND id = $2 \
         RETURNING {OPTION_COLUMNS}"
    );
    let row = sqlx::query_as::<_, OptionRow>(&sql)
        .bind(category.as_str())
        .bind(id)
        .bind(changes.label)
        .bind(changes.header.is_some())
        .bind(changes.header.flatten())
        .bind(changes.condition.is_some())
        .bind(changes.condition.flatten())
        .bind(changes.device_type.is_some())
        .bind(changes.device_type.flatten().map(DeviceType::as_str))
        .bind(changes.deduction_percentage)
        .bind(changes.image_url.is_some())
        .bind(changes.image_url.flatten())
        .fetch_optional(pool)
        .await?;

    Ok(row)
}

/// Deletes an option. Device and preset rows referencing it are removed by
/// the foreign-key cascade. Returns `false` if nothing was deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_option(
    pool: &PgPool,
    category: OptionCategory,
    id: i64,
) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM condition_options WHERE category = $1 AND id = $2")
        .bind(category.as_str())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
