/// Redis cache for catalog responses, with graceful degradation.
///
/// Every operation returns `Option<T>` or `bool`: on any Redis error the operation logs a
/// warning and reports a miss, so callers fall through to the catalog API. The finder is
/// fully functional without Redis.
///
/// Key schema:
/// - `finder:v1:search:{sha256(query|limit)}` — JSON SearchResponse (TTL)
/// - `finder:v1:similar:{sha256(id)}` — JSON DocumentList (TTL)
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::model::{DocumentList, SearchResponse};

const KEY_PREFIX: &str = "finder:v1:";
pub const DEFAULT_TTL_SECS: u64 = 3600;

#[derive(Clone)]
pub struct ResponseCache {
    client: Option<redis::Client>,
    ttl_secs: u64,
}

impl ResponseCache {
    /// With no URL, or a URL redis cannot parse, the cache is permanently disabled.
    pub fn new(url: Option<&str>, ttl_secs: u64) -> Self {
        let client = url.and_then(|u| {
            redis::Client::open(u)
                .inspect_err(|e| warn!(error = %e, url = u, "failed to create redis client, cache disabled"))
                .ok()
        });
        Self { client, ttl_secs }
    }

    pub fn disabled() -> Self {
        Self {
            client: None,
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    /// Send a PING. Returns `true` if Redis is reachable.
    pub async fn is_available(&self) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        let pong: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        pong.is_ok()
    }

    pub async fn get_search(&self, query: &str, limit: usize) -> Option<SearchResponse> {
        self.get_json(&search_key(query, limit)).await
    }

    pub async fn put_search(&self, query: &str, limit: usize, response: &SearchResponse) -> bool {
        self.put_json(&search_key(query, limit), response).await
    }

    pub async fn get_similar(&self, id: &str) -> Option<DocumentList> {
        self.get_json(&similar_key(id)).await
    }

    pub async fn put_similar(&self, id: &str, list: &DocumentList) -> bool {
        self.put_json(&similar_key(id), list).await
    }

    /// Delete every finder key using SCAN (not KEYS, which blocks).
    pub async fn invalidate_all(&self) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        let pattern = format!("{KEY_PREFIX}*");
        let mut cursor: u64 = 0;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = match redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    warn!(error = %e, pattern, "redis SCAN failed");
                    return false;
                }
            };

            if !keys.is_empty() {
                if let Err(e) = conn.del::<_, ()>(&keys).await {
                    warn!(error = %e, "redis batch DEL failed during invalidation");
                    return false;
                }
            }

            cursor = next_cursor;
            if cursor == 0 {
                return true;
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn
            .get(key)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis GET failed"))
            .ok()?;
        serde_json::from_str(&raw?)
            .inspect_err(|e| warn!(error = %e, key, "cache deserialization failed"))
            .ok()
    }

    async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let Ok(json) = serde_json::to_string(value) else {
            return false;
        };
        let Some(mut conn) = self.connection().await else {
            return false;
        };
        conn.set_ex::<_, _, ()>(key, json, self.ttl_secs)
            .await
            .inspect_err(|e| warn!(error = %e, key, "redis SETEX failed"))
            .is_ok()
    }

    async fn connection(&self) -> Option<MultiplexedConnection> {
        let client = self.client.as_ref()?;
        client
            .get_multiplexed_async_connection()
            .await
            .inspect_err(|e| warn!(error = %e, "redis connection failed"))
            .ok()
    }
}

fn search_key(query: &str, limit: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hasher.update(b"|");
    hasher.update(limit.to_string().as_bytes());
    format!("{KEY_PREFIX}search:{:x}", hasher.finalize())
}

fn similar_key(id: &str) -> String {
    let hash = Sha256::digest(id.as_bytes());
    format!("{KEY_PREFIX}similar:{:x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_namespaced_and_stable() {
        let key = search_key("old castle", 10);
        assert!(key.starts_with("finder:v1:search:"));
        assert_eq!(key, search_key("old castle", 10));
        assert_ne!(key, search_key("old castle", 20));
        assert_ne!(key, search_key("old castles", 10));
        assert!(similar_key("d1").starts_with("finder:v1:similar:"));
    }

    #[tokio::test]
    async fn disabled_cache_always_misses() {
        let cache = ResponseCache::new(None, 60);
        assert!(!cache.is_enabled());
        assert!(!cache.is_available().await);
        assert!(cache.get_search("castle", 10).await.is_none());
        assert!(!cache.put_search("castle", 10, &SearchResponse::default()).await);
        assert!(cache.get_similar("d1").await.is_none());
        assert!(!cache.invalidate_all().await);
    }

    #[tokio::test]
    async fn invalidate_all_removes_only_finder_keys() {
        let url = std::env::var("FINDER_TEST_REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let cache = ResponseCache::new(Some(&url), 60);
        if !cache.is_available().await {
            eprintln!("skipping: no redis at {url}");
            return;
        }

        let mut conn = cache.connection().await.expect("connection");
        let unrelated = "finder-test:unrelated";
        conn.set::<_, _, ()>(unrelated, "keep").await.expect("SET");

        let response = SearchResponse::default();
        for i in 0..150 {
            assert!(cache.put_search(&format!("query {i}"), 10, &response).await);
        }
        assert!(cache.put_similar("d1", &DocumentList::default()).await);
        assert!(cache.get_search("query 7", 10).await.is_some());

        assert!(cache.invalidate_all().await);
        assert!(cache.get_search("query 7", 10).await.is_none());
        assert!(cache.get_similar("d1").await.is_none());

        let kept: Option<String> = conn.get(unrelated).await.expect("GET");
        assert_eq!(kept.as_deref(), Some("keep"));
        conn.del::<_, ()>(unrelated).await.expect("DEL");
    }

    #[test]
    fn unparsable_url_disables_cache() {
        let cache = ResponseCache::new(Some("not a redis url"), 60);
        assert!(!cache.is_enabled());
    }
}
