use redis::aio::ConnectionManager;
use tokio::time::{timeout, Duration};

/// Connect to Redis for the category cache. Callers treat an error as
/// "run without cache".
pub async fn get_redis() -> anyhow::Result<ConnectionManager> {
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    let client = redis::Client::open(redis_url)?;

    let manager = timeout(Duration::from_secs(3), ConnectionManager::new(client))
        .await
        .map_err(|_| anyhow::anyhow!("Redis connection timeout after 3 seconds"))??;

    Ok(manager)
}
