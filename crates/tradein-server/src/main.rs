mod api;
mod middleware;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use tradein_core::Environment;
use tradein_shopify::ShopifyDiscountClient;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = tradein_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "starting tradein-server");

    let pool_config = tradein_db::PoolConfig::from_app_config(&config);
    let pool = tradein_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = tradein_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations up to date");

    let discounts = match config.shopify_credentials() {
        Some((store_url, access_token)) => Some(Arc::new(ShopifyDiscountClient::new(
            store_url,
            access_token,
            &config.shopify_api_version,
            config.shopify_request_timeout_secs,
        )?)),
        None => {
            tracing::warn!("Shopify credentials not set; trade-in submissions are disabled");
            None
        }
    };

    let auth = AuthState::from_env(matches!(config.env, Environment::Development))?;
    let state = AppState {
        pool,
        discounts,
        discount_prefix: config.discount_code_prefix.clone(),
    };
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
