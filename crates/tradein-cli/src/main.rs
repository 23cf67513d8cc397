mod db;
mod quote;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tradein_core::{OptionCategory, OptionId};

#[derive(Debug, Parser)]
#[command(name = "tradein-cli")]
#[command(about = "Trade-in pricing command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Price a device from its stored deduction rows
    Quote {
        /// Exact model name of the device
        model_name: String,
        /// Selected option as `category=option_id`; repeatable
        #[arg(long = "select", value_parser = parse_selection)]
        selections: Vec<(OptionCategory, OptionId)>,
    },
    /// Show the most recent trade-in submissions
    Submissions {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
    /// Upsert the option catalog from a YAML file
    Seed {
        /// Defaults to `TRADEIN_CATALOG_PATH`
        #[arg(long)]
        path: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
}

fn parse_selection(raw: &str) -> Result<(OptionCategory, OptionId), String> {
    let (category, id) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected category=option_id, got '{raw}'"))?;
    let category: OptionCategory = category.parse().map_err(|e| format!("{e}"))?;
    let id: i64 = id
        .trim()
        .parse()
        .map_err(|_| format!("option id '{id}' is not an integer"))?;
    Ok((category, OptionId(id)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("tradein-cli ready; run with --help for commands");
        return Ok(());
    };

    let config = tradein_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = tradein_db::PoolConfig::from_app_config(&config);
    let pool = tradein_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db { command } => match command {
            DbCommands::Ping => db::run_ping(&pool).await?,
            DbCommands::Migrate => db::run_migrate(&pool).await?,
            DbCommands::Seed { path, dry_run } => {
                let path = path.unwrap_or_else(|| config.catalog_path.clone());
                db::run_seed(&pool, &path, dry_run).await?;
            }
        },
        Commands::Quote {
            model_name,
            selections,
        } => quote::run_quote(&pool, &model_name, &selections).await?,
        Commands::Submissions { limit } => db::run_list_submissions(&pool, limit).await?,
    }

    Ok(())
}
