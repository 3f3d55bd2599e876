use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};

/// Key of the cached public category list.
pub const CATEGORY_LIST_KEY: &str = "promptmart:categories";
pub const CATEGORY_LIST_TTL_SECS: u64 = 60;

/// Best-effort JSON cache on Redis. Every failure is treated as a miss.
#[derive(Clone)]
pub struct CacheService {
    redis: ConnectionManager,
}

impl CacheService {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.redis.clone();
        let result: Option<String> = match conn.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Redis GET {key} failed: {e}");
                return None;
            }
        };
        result.and_then(|s| serde_json::from_str(&s).ok())
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let mut conn = self.redis.clone();
        if let Ok(json) = serde_json::to_string(value) {
            if let Err(e) = conn.set_ex::<_, _, ()>(key, json, ttl_secs).await {
                tracing::warn!("Redis SET {key} failed: {e}");
            }
        }
    }

    pub async fn invalidate(&self, key: &str) {
        let mut conn = self.redis.clone();
        if let Err(e) = conn.del::<_, ()>(key).await {
            tracing::warn!("Redis DEL {key} failed: {e}");
        }
    }
}

/// Drops the cached category list when a cache is configured.
pub async fn invalidate_categories(cache: Option<&CacheService>) {
    if let Some(cache) = cache {
        cache.invalidate(CATEGORY_LIST_KEY).await;
    }
}
