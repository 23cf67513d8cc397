//! Shared storage for `device_options` and `preset_options`.
//!
//! Both tables have the same shape: `(owner_id, category, option_id)` is the
//! primary key, so one owner holds at most one row per option and category.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tradein_core::{CategoryRows, DeductionRow, OptionCategory, OptionId};

use crate::DbError;

#[derive(Debug, Clone, Copy)]
pub(crate) enum RowOwner {
    Device,
    Preset,
}

impl RowOwner {
    fn table(self) -> &'static str {
        match self {
            RowOwner::Device => "device_options",
            RowOwner::Preset => "preset_options",
        }
    }

    fn owner_column(self) -> &'static str {
        match self {
            RowOwner::Device => "device_id",
            RowOwner::Preset => "preset_id",
        }
    }
}

/// A join row plus the descriptive fields of the option it references.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OptionLinkRow {
    pub owner_id: i64,
    pub category: String,
    pub option_id: i64,
    pub deduction_percentage: Decimal,
    pub label: String,
    pub header: Option<String>,
    pub image_url: Option<String>,
}

/// Loads join rows for the given owners, ordered by owner, category and position.
pub(crate) async fn load_links(
    pool: &PgPool,
    owner: RowOwner,
    owner_ids: &[i64],
) -> Result<Vec<OptionLinkRow>, DbError> {
    let sql = format!(
        "SELECT l.{col} AS owner_id, l.category, l.option_id, l.deduction_percentage, \
                o.label, o.header, o.image_url \
         FROM {table} l \
         JOIN condition_options o ON o.id = l.option_id \
         WHERE l.{col} = ANY($1) \
         ORDER BY l.{col}, l.category, l.position, l.option_id",
        col = owner.owner_column(),
        table = owner.table(),
    );

    let rows = sqlx::query_as::<_, OptionLinkRow>(&sql)
        .bind(owner_ids)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Groups link rows of a single owner into per-category deduction rows.
///
/// Every category is present in the result, empty when the owner has no rows.
///
/// # Errors
///
/// Returns [`DbError::InvalidStoredValue`] if a stored category is unknown.
pub(crate) fn group_links(links: &[OptionLinkRow]) -> Result<CategoryRows, DbError> {
    let mut grouped = tradein_core::empty_category_rows();
    for link in links {
        let category = parse_category(&link.category)?;
        grouped.entry(category).or_default().push(DeductionRow {
            option_id: OptionId(link.option_id),
            deduction_percentage: link.deduction_percentage,
        });
    }
    Ok(grouped)
}

pub(crate) fn parse_category(raw: &str) -> Result<OptionCategory, DbError> {
    raw.parse::<OptionCategory>()
        .map_err(|_| DbError::InvalidStoredValue(format!("category '{raw}'")))
}

/// Replaces every row of `category` for one owner with `rows`, keeping order.
pub(crate) async fn replace_category(
    conn: &mut PgConnection,
    owner: RowOwner,
    owner_id: i64,
    category: OptionCategory,
    rows: &[DeductionRow],
) -> Result<(), DbError> {
    let delete = format!(
        "DELETE FROM {table} WHERE {col} = $1 AND category = $2",
        table = owner.table(),
        col = owner.owner_column(),
    );
    sqlx::query(&delete)
        .bind(owner_id)
        .bind(category.as_str())
        .execute(&mut *conn)
        .await?;

    let insert = format!(
        "INSERT INTO {table} ({col}, category, option_id, position, deduction_percentage) \
         VALUES ($1, $2, $3, $4, $5)",
        table = owner.table(),
        col = owner.owner_column(),
    );
    for (position, row) in rows.iter().enumerate() {
        let position = i32::try_from(position).unwrap_or(i32::MAX);
        sqlx::query(&insert)
            .bind(owner_id)
            .bind(category.as_str())
            .bind(row.option_id.0)
            .bind(position)
            .bind(row.deduction_percentage)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Writes the percentage of each listed row that already exists for the owner.
///
/// Rows that do not exist are skipped; no rows are inserted.
pub(crate) async fn update_percentages(
    conn: &mut PgConnection,
    owner: RowOwner,
    owner_id: i64,
    rows: &CategoryRows,
) -> Result<u64, DbError> {
    let update = format!(
        "UPDATE {table} SET deduction_percentage = $4 \
         WHERE {col} = $1 AND category = $2 AND option_id = $3",
        table = owner.table(),
        col = owner.owner_column(),
    );

    let mut affected = 0;
    for (category, category_rows) in rows {
        for row in category_rows {
            affected += sqlx::query(&update)
                .bind(owner_id)
                .bind(category.as_str())
                .bind(row.option_id.0)
                .bind(row.deduction_percentage)
                .execute(&mut *conn)
                .await?
                .rows_affected();
        }
    }

    Ok(affected)
}
