mod config;
mod error;
mod server;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use finder_common::cache::ResponseCache;
use finder_common::catalog::{Catalog, CatalogClient, CatalogClientConfig};

use config::Config;
use error::AppError;
use server::FinderServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries MCP JSON-RPC when serving on stdio
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting location-finder MCP server");

    let config = Config::from_env()?;
    info!(
        redis = config.redis_url.is_some(),
        tcp = config.tcp_listen_addr.is_some(),
        summary_chars = config.summary_chars,
        "configuration loaded"
    );

    let catalog_config = CatalogClientConfig::from_env();
    info!(
        base_url = %catalog_config.base_url,
        timeout_ms = catalog_config.default_timeout.as_millis(),
        max_retries = catalog_config.max_retries,
        "catalog client configured"
    );
    let client = CatalogClient::new(catalog_config).map_err(AppError::from)?;

    let cache = ResponseCache::new(config.redis_url.as_deref(), config.cache_ttl_secs);
    if cache.is_available().await {
        info!("redis connected");
    } else {
        info!("redis unavailable, running without cache");
    }

    let server = FinderServer::new(Catalog::new(client, cache), config.summary_chars);

    if let Some(addr) = &config.tcp_listen_addr {
        let listener = TcpListener::bind(addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.clone();
            tokio::spawn(async move {
                info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    } else {
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            tracing::error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        info!("MCP server shut down");
    }
    Ok(())
}
