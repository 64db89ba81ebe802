//! Redis-backed store implementation.

use super::CacheStore;
use async_trait::async_trait;
use deadpool_redis::Pool;
use herd_core::{HerdError, HerdResult};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::debug;

/// Redis-backed cache store.
pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Create a new Redis store on an existing pool.
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Get a connection from the pool.
    async fn conn(&self) -> HerdResult<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| HerdError::cache(format!("Failed to get Redis connection: {}", e)))
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn hget(&self, name: &str, field: &str) -> HerdResult<Option<String>> {
        let mut conn = self.conn().await?;
        conn.hget(name, field)
            .await
            .map_err(|e| HerdError::cache(format!("Failed to read '{}' '{}': {}", name, field, e)))
    }

    async fn hset(&self, name: &str, field: &str, value: &str) -> HerdResult<()> {
        let mut conn = self.conn().await?;
        let _: () = conn
            .hset(name, field, value)
            .await
            .map_err(|e| HerdError::cache(format!("Failed to write '{}' '{}': {}", name, field, e)))?;
        Ok(())
    }

    async fn hexists(&self, name: &str, field: &str) -> HerdResult<bool> {
        let mut conn = self.conn().await?;
        conn.hexists(name, field)
            .await
            .map_err(|e| HerdError::cache(format!("Failed to check '{}' '{}': {}", name, field, e)))
    }

    async fn hdel(&self, name: &str, field: &str) -> HerdResult<bool> {
        let mut conn = self.conn().await?;
        let removed: i64 = conn
            .hdel(name, field)
            .await
            .map_err(|e| HerdError::cache(format!("Failed to delete '{}' '{}': {}", name, field, e)))?;
        Ok(removed > 0)
    }

    async fn delete(&self, name: &str) -> HerdResult<bool> {
        let mut conn = self.conn().await?;
        let removed: i64 = conn
            .del(name)
            .await
            .map_err(|e| HerdError::cache(format!("Failed to delete key '{}': {}", name, e)))?;
        Ok(removed > 0)
    }

    async fn scan_delete(&self, pattern: &str) -> HerdResult<u64> {
        let mut conn = self.conn().await?;
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut *conn)
                .await
                .map_err(|e| HerdError::cache(format!("Failed to scan '{}': {}", pattern, e)))?;

            if !keys.is_empty() {
                let removed: i64 = conn
                    .del(&keys)
                    .await
                    .map_err(|e| HerdError::cache(format!("Failed to delete keys: {}", e)))?;
                deleted += removed as u64;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        debug!(pattern = %pattern, count = deleted, "Deleted keys matching pattern");
        Ok(deleted)
    }

    async fn ttl(&self, name: &str) -> HerdResult<Option<Duration>> {
        let mut conn = self.conn().await?;
        let ttl: i64 = conn
            .ttl(name)
            .await
            .map_err(|e| HerdError::cache(format!("Failed to read ttl of '{}': {}", name, e)))?;

        // -2 means the key does not exist, -1 means no expiry is set
        match ttl {
            t if t < 0 => Ok(None),
            t => Ok(Some(Duration::from_secs(t as u64))),
        }
    }

    async fn expire(&self, name: &str, ttl: Duration) -> HerdResult<bool> {
        let mut conn = self.conn().await?;
        let applied: bool = conn
            .expire(name, ttl.as_secs() as i64)
            .await
            .map_err(|e| HerdError::cache(format!("Failed to expire '{}': {}", name, e)))?;
        Ok(applied)
    }
}
