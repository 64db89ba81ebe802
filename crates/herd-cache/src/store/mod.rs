//! Backing store abstraction for the cache gateway.
//!
//! The gateway talks to a hash-oriented key-value store: one hash per
//! entity, one field per (operation, parameters) encoding. A Redis
//! implementation backs production; an in-memory implementation backs
//! tests and single-process deployments.

mod memory_store;
mod redis_store;

pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use herd_config::RedisConfig;
use herd_core::{HerdError, HerdResult};
use std::time::Duration;
use tracing::info;

/// Hash-oriented key-value store underneath the cache gateway.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read one hash field. `None` when the field is absent.
    async fn hget(&self, name: &str, field: &str) -> HerdResult<Option<String>>;

    /// Write one hash field.
    async fn hset(&self, name: &str, field: &str, value: &str) -> HerdResult<()>;

    /// Field presence test.
    async fn hexists(&self, name: &str, field: &str) -> HerdResult<bool>;

    /// Delete one hash field. Returns `true` when the field existed.
    async fn hdel(&self, name: &str, field: &str) -> HerdResult<bool>;

    /// Delete a whole key. Returns `true` when the key existed.
    async fn delete(&self, name: &str) -> HerdResult<bool>;

    /// Delete every key matching the pattern. Returns the number deleted.
    async fn scan_delete(&self, pattern: &str) -> HerdResult<u64>;

    /// Remaining time to live. `None` when the key is missing or has no
    /// expiry set.
    async fn ttl(&self, name: &str) -> HerdResult<Option<Duration>>;

    /// Assign a time to live. Returns `true` when the key existed and the
    /// expiry was applied.
    async fn expire(&self, name: &str, ttl: Duration) -> HerdResult<bool>;
}

/// Create a Redis connection pool for the gateway.
pub async fn create_pool(config: &RedisConfig) -> HerdResult<Pool> {
    info!(url = %config.url(), "Creating Redis connection pool for cache gateway...");

    let cfg = Config::from_url(config.url());

    let pool = cfg
        .builder()
        .map_err(|e| HerdError::configuration(format!("Invalid Redis config: {}", e)))?
        .max_size(config.pool_size)
        .runtime(Runtime::Tokio1)
        .build()
        .map_err(|e| HerdError::configuration(format!("Failed to create pool: {}", e)))?;

    // Test connection
    let mut conn = pool
        .get()
        .await
        .map_err(|e| HerdError::cache(format!("Failed to get Redis connection: {}", e)))?;
    redis::cmd("PING")
        .query_async::<String>(&mut *conn)
        .await
        .map_err(|e| HerdError::cache(format!("Redis ping failed: {}", e)))?;

    info!("Redis connection pool created successfully");

    Ok(pool)
}
