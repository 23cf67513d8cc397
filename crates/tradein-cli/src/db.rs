//! `db` subcommands and the submission log.

use std::path::Path;

use sqlx::PgPool;

pub(crate) async fn run_ping(pool: &PgPool) -> anyhow::Result<()> {
    tradein_db::ping(pool).await?;
    println!("database reachable");
    Ok(())
}

pub(crate) async fn run_migrate(pool: &PgPool) -> anyhow::Result<()> {
    let applied = tradein_db::run_migrations(pool).await?;
    tracing::info!(applied, "migrations complete");
    println!("applied {applied} migration(s)");
    Ok(())
}

/// Loads the catalog file and upserts every option in one transaction.
///
/// The file is validated in full before anything is written.
///
/// # Errors
///
/// Returns an error if the file is unreadable or invalid, or the upsert fails.
pub(crate) async fn run_seed(pool: &PgPool, path: &Path, dry_run: bool) -> anyhow::Result<()> {
    let catalog = tradein_core::load_catalog(path)?;

    if dry_run {
        for (category, seeds) in &catalog.options {
            println!("{category}: {} option(s)", seeds.len());
        }
        println!(
            "dry-run: would upsert {} option(s) from {}",
            catalog.option_count(),
            path.display()
        );
        return Ok(());
    }

    let written = tradein_db::seed_options(pool, &catalog).await?;
    tracing::info!(written, path = %path.display(), "option catalog seeded");
    println!("seeded {written} option(s)");
    Ok(())
}

pub(crate) async fn run_list_submissions(pool: &PgPool, limit: i64) -> anyhow::Result<()> {
    let rows = tradein_db::list_submissions(pool, limit.clamp(1, 200)).await?;
    if rows.is_empty() {
        println!("no trade-in submissions");
        return Ok(());
    }

    for row in rows {
        println!(
            "{}  {:<24} {:>10}  {}  {}",
            row.created_at.format("%Y-%m-%d %H:%M"),
            row.product_model,
            row.trade_in_value,
            row.discount_code,
            row.customer_email.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
