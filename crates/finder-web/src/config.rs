use std::net::SocketAddr;

use finder_common::cache::DEFAULT_TTL_SECS;
use finder_common::paging::{DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};

use crate::error::AppError;

/// Web front-end configuration loaded explicitly from environment variables.
///
/// Everything has a default; invalid values are rejected instead of silently ignored.
/// The catalog client reads its own `CATALOG_*` variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    /// Redis connection URL. `None` disables response caching.
    pub redis_url: Option<String>,
    pub cache_ttl_secs: u64,
    /// Delete every cached catalog response before serving.
    pub flush_cache_on_start: bool,
    pub site_title: String,
    pub display: DisplayConfig,
}

/// Rendering preferences passed to every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayConfig {
    /// Page size preselected on the search page when the URL has no `k`.
    pub search_limit: usize,
    pub search_preview_chars: usize,
    pub browse_preview_chars: usize,
    pub similar_preview_chars: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            search_limit: DEFAULT_SEARCH_LIMIT,
            search_preview_chars: 800,
            browse_preview_chars: 400,
            similar_preview_chars: 300,
        }
    }
}

impl Config {
    /// Optional:
    /// - `FINDER_LISTEN_ADDR` (default: 127.0.0.1:8080)
    /// - `REDIS_URL`
    /// - `FINDER_CACHE_TTL_SECS` (default: 3600)
    /// - `FINDER_CACHE_FLUSH_ON_START` (default: false)
    /// - `FINDER_SITE_TITLE` (default: "Movie Filming Locations Finder")
    /// - `FINDER_SEARCH_LIMIT` (default: 10, max: 50)
    /// - `FINDER_SEARCH_PREVIEW_CHARS` / `FINDER_BROWSE_PREVIEW_CHARS` /
    ///   `FINDER_SIMILAR_PREVIEW_CHARS` (defaults: 800 / 400 / 300)
    pub fn from_env() -> Result<Self, AppError> {
        let listen_addr = std::env::var("FINDER_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let listen_addr = listen_addr.parse::<SocketAddr>().map_err(|e| {
            AppError::Config(format!("FINDER_LISTEN_ADDR is not a socket address ({listen_addr}): {e}"))
        })?;

        let defaults = DisplayConfig::default();
        let search_limit = env_number("FINDER_SEARCH_LIMIT", defaults.search_limit)?;
        if search_limit == 0 || search_limit > MAX_SEARCH_LIMIT {
            return Err(AppError::Config(format!(
                "FINDER_SEARCH_LIMIT must be between 1 and {MAX_SEARCH_LIMIT}, got {search_limit}"
            )));
        }

        let display = DisplayConfig {
            search_limit,
            search_preview_chars: env_number("FINDER_SEARCH_PREVIEW_CHARS", defaults.search_preview_chars)?,
            browse_preview_chars: env_number("FINDER_BROWSE_PREVIEW_CHARS", defaults.browse_preview_chars)?,
            similar_preview_chars: env_number("FINDER_SIMILAR_PREVIEW_CHARS", defaults.similar_preview_chars)?,
        };

        Ok(Self {
            listen_addr,
            redis_url: std::env::var("REDIS_URL").ok().filter(|u| !u.trim().is_empty()),
            cache_ttl_secs: env_number("FINDER_CACHE_TTL_SECS", DEFAULT_TTL_SECS)?,
            flush_cache_on_start: match std::env::var("FINDER_CACHE_FLUSH_ON_START") {
                Ok(raw) => parse_flag("FINDER_CACHE_FLUSH_ON_START", &raw)?,
                Err(_) => false,
            },
            site_title: std::env::var("FINDER_SITE_TITLE")
                .unwrap_or_else(|_| "Movie Filming Locations Finder".to_string()),
            display,
        })
    }
}

fn env_number<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|e| {
            AppError::Config(format!("{name} must be a non-negative integer ({raw}): {e}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Config(format!("{name} must be a boolean, got {raw}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        assert!(parse_flag("F", "1").unwrap());
        assert!(parse_flag("F", " TRUE ").unwrap());
        assert!(!parse_flag("F", "off").unwrap());
        assert!(!parse_flag("F", "").unwrap());
        let err = parse_flag("FINDER_CACHE_FLUSH_ON_START", "maybe").unwrap_err();
        assert!(err.to_string().contains("FINDER_CACHE_FLUSH_ON_START"));
    }
}
