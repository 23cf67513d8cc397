//! Database operations for the append-only `trade_in_submissions` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `trade_in_submissions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubmissionRow {
    pub id: i64,
    pub public_id: Uuid,
    pub product_model: String,
    pub trade_in_value: Decimal,
    pub max_price: Option<Decimal>,
    pub storage: Option<String>,
    pub color: Option<String>,
    pub customer_email: Option<String>,
    /// Category name to the free-text answer selected during inspection.
    pub conditions: serde_json::Value,
    pub discount_code: String,
    pub price_rule_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSubmission<'a> {
    pub product_model: &'a str,
    pub trade_in_value: Decimal,
    pub max_price: Option<Decimal>,
    pub storage: Option<&'a str>,
    pub color: Option<&'a str>,
    pub customer_email: Option<&'a str>,
    pub conditions: &'a serde_json::Value,
    pub discount_code: &'a str,
    pub price_rule_id: i64,
}

const SUBMISSION_COLUMNS: &str = "id, public_id, product_model, trade_in_value, max_price, \
     storage, color, customer_email, conditions, discount_code, price_rule_id, created_at";

/// Persists a submission. Rows are never updated afterwards.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_submission(
    pool: &PgPool,
    submission: &NewSubmission<'_>,
) -> Result<SubmissionRow, DbError> {
    let sql = format!(
        "INSERT INTO trade_in_submissions \
           (product_model, trade_in_value, max_price, storage, color, customer_email, \
            conditions, discount_code, price_rule_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING {SUBMISSION_COLUMNS}"
    );
    let row = sqlx::query_as::<_, SubmissionRow>(&sql)
        .bind(submission.product_model)
        .bind(submission.trade_in_value)
        .bind(submission.max_price)
        .bind(submission.storage)
        .bind(submission.color)
        .bind(submission.customer_email)
        .bind(submission.conditions)
        .bind(submission.discount_code)
        .bind(submission.price_rule_id)
        .fetch_one(pool)
        .await?;

    Ok(row)
}

/// Lists the most recent submissions first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_submissions(pool: &PgPool, limit: i64) -> Result<Vec<SubmissionRow>, DbError> {
    let sql = format!(
        "SELECT {SUBMISSION_COLUMNS} FROM trade_in_submissions \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    );
    let rows = sqlx::query_as::<_, SubmissionRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_submissions(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM trade_in_submissions")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
