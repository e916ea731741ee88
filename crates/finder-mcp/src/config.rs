use finder_common::cache::DEFAULT_TTL_SECS;

use crate::error::AppError;

const DEFAULT_SUMMARY_CHARS: usize = 300;

/// MCP server configuration loaded explicitly from environment variables.
///
/// The catalog client reads its own `CATALOG_*` variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection URL (e.g. "redis://127.0.0.1:6379"). `None` disables caching.
    pub redis_url: Option<String>,
    pub cache_ttl_secs: u64,
    /// Serve MCP over TCP on this address instead of stdio.
    pub tcp_listen_addr: Option<String>,
    /// Length of the description excerpt in tool results.
    pub summary_chars: usize,
}

impl Config {
    /// Optional:
    /// - `REDIS_URL`: Redis connection string (omit to disable caching)
    /// - `FINDER_CACHE_TTL_SECS` (default: 3600)
    /// - `MCP_TCP_LISTEN_ADDR`: e.g. "127.0.0.1:7400"
    /// - `FINDER_MCP_SUMMARY_CHARS` (default: 300)
    pub fn from_env() -> Result<Self, AppError> {
        let cache_ttl_secs = match std::env::var("FINDER_CACHE_TTL_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|e| {
                AppError::Config(format!("FINDER_CACHE_TTL_SECS must be a number ({raw}): {e}"))
            })?,
            Err(_) => DEFAULT_TTL_SECS,
        };

        let summary_chars = match std::env::var("FINDER_MCP_SUMMARY_CHARS") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(AppError::Config(format!(
                        "FINDER_MCP_SUMMARY_CHARS must be a positive number, got {raw}"
                    )))
                }
            },
            Err(_) => DEFAULT_SUMMARY_CHARS,
        };

        Ok(Self {
            redis_url: non_blank_var("REDIS_URL"),
            cache_ttl_secs,
            tcp_listen_addr: non_blank_var("MCP_TCP_LISTEN_ADDR"),
            summary_chars,
        })
    }
}

fn non_blank_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
