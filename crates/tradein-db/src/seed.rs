use sqlx::PgPool;
use tradein_core::{CatalogFile, DeviceType};

use crate::DbError;

/// Upsert catalog options from the YAML file into `condition_options`.
///
/// Options are matched on `(category, label)`; an existing option has its
/// descriptive fields and default percentage overwritten. Device and preset
/// rows are left untouched. Returns the number of options processed.
/// All upserts run inside a single transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_options(pool: &PgPool, catalog: &CatalogFile) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for (category, seeds) in &catalog.options {
        for seed in seeds {
            sqlx::query(
                "INSERT INTO condition_options \
                   (category, label, header, condition, device_type, deduction_percentage, image_url) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT (category, label) DO UPDATE SET \
                     header = EXCLUDED.header, \
                     condition = EXCLUDED.condition, \
                     device_type = EXCLUDED.device_type, \
                     deduction_percentage = EXCLUDED.deduction_percentage, \
                     image_url = EXCLUDED.image_url, \
                     updated_at = NOW()",
            )
            .bind(category.as_str())
            .bind(seed.label.trim())
            .bind(&seed.header)
            .bind(&seed.condition)
            .bind(seed.device_type.map(DeviceType::as_str))
            .bind(seed.deduction_percentage)
            .bind(&seed.image_url)
            .execute(&mut *tx)
            .await?;

            count += 1;
        }
    }

    tx.commit().await?;
    Ok(count)
}
