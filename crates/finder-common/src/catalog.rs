use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::ResponseCache;
use crate::error::CommonError;
use crate::model::{BrowsePage, DocumentList, SearchResponse};
use crate::paging::{BrowseRequest, MAX_SEARCH_LIMIT};

#[derive(Clone, Debug)]
pub struct CatalogClientConfig {
    pub base_url: String,
    pub default_timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_error_body_bytes: usize,
}

impl Default for CatalogClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5001".to_string(),
            default_timeout: Duration::from_secs(10),
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_millis(2_000),
            max_error_body_bytes: 8 * 1024,
        }
    }
}

impl CatalogClientConfig {
    /// Optional, with defaults:
    /// - `CATALOG_BASE_URL` (http://localhost:5001)
    /// - `CATALOG_TIMEOUT_SECS` (10)
    /// - `CATALOG_MAX_RETRIES` (2)
    /// - `CATALOG_RETRY_INITIAL_MS` (200)
    /// - `CATALOG_RETRY_MAX_MS` (2000)
    /// - `CATALOG_MAX_ERROR_BODY_BYTES` (8192)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("CATALOG_BASE_URL").unwrap_or(defaults.base_url);

        let default_timeout = env_parse::<u64>("CATALOG_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.default_timeout);

        let max_retries = env_parse::<u32>("CATALOG_MAX_RETRIES").unwrap_or(defaults.max_retries);

        let initial_backoff = env_parse::<u64>("CATALOG_RETRY_INITIAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.initial_backoff);

        let max_backoff = env_parse::<u64>("CATALOG_RETRY_MAX_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.max_backoff);

        let max_error_body_bytes = env_parse::<usize>("CATALOG_MAX_ERROR_BODY_BYTES")
            .unwrap_or(defaults.max_error_body_bytes);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_timeout,
            max_retries,
            initial_backoff,
            max_backoff,
            max_error_body_bytes,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("catalog returned error: status={status} body={body}")]
    Upstream { status: StatusCode, body: String },
}

/// HTTP client for the external catalog API.
#[derive(Clone)]
pub struct CatalogClient {
    config: CatalogClientConfig,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ClusterDocsRequest<'a> {
    ids: &'a [String],
}

impl CatalogClient {
    pub fn new(config: CatalogClientConfig) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("location-finder/", env!("CARGO_PKG_VERSION")))
            .timeout(config.default_timeout)
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &CatalogClientConfig {
        &self.config
    }

    /// `GET /search?q=&k=`
    pub async fn search(&self, query: &str, limit: usize) -> Result<SearchResponse, CatalogError> {
        let url = format!("{}/search", self.config.base_url);
        let limit = limit.to_string();
        self.request_with_retry(|| async {
            let resp = self
                .http
                .get(&url)
                .query(&[("q", query), ("k", limit.as_str())])
                .send()
                .await?;
            self.parse_json_response(resp).await
        })
        .await
    }

    /// `GET /browse?offset=&limit=[&shuffle=1][&q=]`
    pub async fn browse(&self, request: &BrowseRequest) -> Result<BrowsePage, CatalogError> {
        let url = format!("{}/browse", self.config.base_url);
        let mut params: Vec<(&str, String)> = vec![
            ("offset", request.offset.to_string()),
            ("limit", request.limit.to_string()),
        ];
        if request.shuffle {
            params.push(("shuffle", "1".to_string()));
        }
        if let Some(q) = &request.query {
            params.push(("q", q.clone()));
        }
        self.request_with_retry(|| async {
            let resp = self.http.get(&url).query(&params).send().await?;
            self.parse_json_response(resp).await
        })
        .await
    }

    /// `GET /api/more-like-this?id=`
    pub async fn more_like_this(&self, id: &str) -> Result<DocumentList, CatalogError> {
        let url = format!("{}/api/more-like-this", self.config.base_url);
        self.request_with_retry(|| async {
            let resp = self.http.get(&url).query(&[("id", id)]).send().await?;
            self.parse_json_response(resp).await
        })
        .await
    }

    /// `POST /api/cluster-docs` with `{"ids": [...]}`
    pub async fn cluster_docs(&self, ids: &[String]) -> Result<DocumentList, CatalogError> {
        let url = format!("{}/api/cluster-docs", self.config.base_url);
        let body = ClusterDocsRequest { ids };
        self.request_with_retry(|| async {
            let resp = self.http.post(&url).json(&body).send().await?;
            self.parse_json_response(resp).await
        })
        .await
    }

    async fn parse_json_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, CatalogError> {
        let status = resp.status();
        if !status.is_success() {
            let body = read_limited_text(resp, self.config.max_error_body_bytes).await;
            return Err(CatalogError::Upstream { status, body });
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn request_with_retry<T, Fut, F>(&self, mut f: F) -> Result<T, CatalogError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, CatalogError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match f().await {
                Ok(v) => return Ok(v),
                Err(e) => {
                    if attempt > self.config.max_retries || !should_retry(&e) {
                        return Err(e);
                    }
                    let delay = backoff_delay(
                        self.config.initial_backoff,
                        self.config.max_backoff,
                        attempt - 1,
                    );
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "catalog request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn should_retry(err: &CatalogError) -> bool {
    match err {
        CatalogError::Request(e) => e.is_timeout() || e.is_connect(),
        CatalogError::Upstream { status, .. } => {
            *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
        CatalogError::InvalidJson(_) => false,
    }
}

fn backoff_delay(initial: Duration, max: Duration, exponent: u32) -> Duration {
    let mult = 1u128.checked_shl(exponent).unwrap_or(u128::MAX);
    let base_ms = initial.as_millis().saturating_mul(mult);
    let capped_ms = std::cmp::min(base_ms, max.as_millis()) as u64;
    let jitter_cap = std::cmp::max(1, capped_ms / 4);
    Duration::from_millis(capped_ms.saturating_add(pseudo_jitter_ms(jitter_cap)))
}

fn pseudo_jitter_ms(max_inclusive: u64) -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as u64;
    nanos % (max_inclusive + 1)
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(mut b) => {
            if b.len() > max_bytes {
                b.truncate(max_bytes);
            }
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read catalog error body");
            "<failed to read error body>".to_string()
        }
    }
}

/// Catalog access with response caching and request validation.
///
/// Errors are returned to the caller, which is expected to log them and render an empty
/// result rather than fail the page.
#[derive(Clone)]
pub struct Catalog {
    client: CatalogClient,
    cache: ResponseCache,
}

impl Catalog {
    pub fn new(client: CatalogClient, cache: ResponseCache) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<SearchResponse, CommonError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CommonError::InvalidRequest("query must not be empty".to_string()));
        }
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);

        if let Some(cached) = self.cache.get_search(query, limit).await {
            debug!(query, limit, "search cache hit");
            return Ok(cached);
        }

        let response = self.client.search(query, limit).await?;
        info!(
            query,
            limit,
            results = response.results.len(),
            clusters = response.clusters.len(),
            "search complete"
        );
        self.cache.put_search(query, limit, &response).await;
        Ok(response)
    }

    pub async fn browse(&self, request: BrowseRequest) -> Result<BrowsePage, CommonError> {
        let request = request.normalized();
        let page = self.client.browse(&request).await?;
        info!(
            offset = request.offset,
            limit = request.limit,
            shuffle = request.shuffle,
            total = page.total,
            items = page.items.len(),
            "browse page loaded"
        );
        Ok(page)
    }

    pub async fn similar(&self, id: &str) -> Result<DocumentList, CommonError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(CommonError::InvalidRequest("id must not be empty".to_string()));
        }

        if let Some(cached) = self.cache.get_similar(id).await {
            debug!(id, "similar cache hit");
            return Ok(cached);
        }

        let list = self.client.more_like_this(id).await?;
        info!(id, results = list.results.len(), "similar documents loaded");
        self.cache.put_similar(id, &list).await;
        Ok(list)
    }

    pub async fn topic_documents(&self, ids: &[String]) -> Result<DocumentList, CommonError> {
        let ids: Vec<String> = ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect();
        if ids.is_empty() {
            return Err(CommonError::InvalidRequest("ids must not be empty".to_string()));
        }
        let list = self.client.cluster_docs(&ids).await?;
        info!(requested = ids.len(), results = list.results.len(), "topic documents loaded");
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_capped() {
        let initial = Duration::from_millis(100);
        let max = Duration::from_millis(1_000);
        let first = backoff_delay(initial, max, 0);
        assert!(first >= initial && first <= Duration::from_millis(125));
        let late = backoff_delay(initial, max, 30);
        assert!(late >= max && late <= Duration::from_millis(1_250));
    }

    #[test]
    fn retries_only_transient_upstream_errors() {
        let upstream = |status| CatalogError::Upstream {
            status,
            body: String::new(),
        };
        assert!(should_retry(&upstream(StatusCode::SERVICE_UNAVAILABLE)));
        assert!(should_retry(&upstream(StatusCode::TOO_MANY_REQUESTS)));
        assert!(!should_retry(&upstream(StatusCode::NOT_FOUND)));
        let bad_json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!should_retry(&CatalogError::InvalidJson(bad_json)));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = CatalogClientConfig::default().with_base_url("http://catalog:5001/");
        assert_eq!(config.base_url, "http://catalog:5001");
    }

    #[tokio::test]
    async fn blank_requests_are_rejected_before_any_io() {
        let client = CatalogClient::new(
            CatalogClientConfig::default().with_base_url("http://127.0.0.1:9"),
        )
        .unwrap();
        let catalog = Catalog::new(client, ResponseCache::disabled());
        assert!(matches!(
            catalog.search("   ", 10).await,
            Err(CommonError::InvalidRequest(_))
        ));
        assert!(matches!(
            catalog.similar("").await,
            Err(CommonError::InvalidRequest(_))
        ));
        assert!(matches!(
            catalog.topic_documents(&[" ".to_string()]).await,
            Err(CommonError::InvalidRequest(_))
        ));
    }
}
