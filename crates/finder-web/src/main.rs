mod config;
mod error;
mod render;
mod server;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use finder_common::cache::ResponseCache;
use finder_common::catalog::{Catalog, CatalogClient, CatalogClientConfig};

use config::Config;
use server::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting finder web front end");

    let config = Config::from_env()?;

    let catalog_config = CatalogClientConfig::from_env();
    info!(
        base_url = %catalog_config.base_url,
        timeout_ms = catalog_config.default_timeout.as_millis(),
        max_retries = catalog_config.max_retries,
        "catalog client configured"
    );
    let client = CatalogClient::new(catalog_config).map_err(error::AppError::from)?;

    let cache = ResponseCache::new(config.redis_url.as_deref(), config.cache_ttl_secs);
    if cache.is_available().await {
        info!(ttl_secs = config.cache_ttl_secs, "redis connected, caching catalog responses");
    } else {
        info!("redis unavailable, running without response cache");
    }
    if config.flush_cache_on_start {
        if cache.invalidate_all().await {
            info!("cached catalog responses flushed");
        } else {
            tracing::warn!("cache flush requested but did not complete");
        }
    }

    let state = AppState {
        catalog: Catalog::new(client, cache),
        site_title: Arc::from(config.site_title.as_str()),
        display: config.display.clone(),
    };

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, "listening");
    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("finder web front end shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}
