//! Redis-backed lock: `SET NX PX` acquisition, compare-and-delete release.

use super::{DistributedLock, LockToken};
use async_trait::async_trait;
use deadpool_redis::Pool;
use herd_core::{HerdError, HerdResult};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Release only when the stored value is ours; a lock whose lease expired
/// and was re-acquired by someone else must stay theirs.
const RELEASE_SCRIPT: &str = r#"
    if redis.call("get", KEYS[1]) == ARGV[1] then
        return redis.call("del", KEYS[1])
    else
        return 0
    end
"#;

/// Redis-backed distributed lock.
pub struct RedisLock {
    pool: Pool,
}

impl RedisLock {
    /// Create a new Redis lock on an existing pool.
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> HerdResult<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| HerdError::lock(format!("Failed to get Redis connection: {}", e)))
    }
}

#[async_trait]
impl DistributedLock for RedisLock {
    async fn try_acquire(
        &self,
        resource: &str,
        lease: Duration,
    ) -> HerdResult<Option<LockToken>> {
        let mut conn = self.conn().await?;
        let value = Uuid::new_v4().to_string();

        let result: Option<String> = redis::cmd("SET")
            .arg(resource)
            .arg(&value)
            .arg("NX")
            .arg("PX")
            .arg(lease.as_millis() as u64)
            .query_async(&mut *conn)
            .await
            .map_err(|e| HerdError::lock(format!("Failed to acquire '{}': {}", resource, e)))?;

        if result.is_none() {
            debug!(resource = %resource, "lock already held");
            return Ok(None);
        }

        debug!(resource = %resource, lease_ms = lease.as_millis() as u64, "lock acquired");
        Ok(Some(LockToken {
            resource: resource.to_string(),
            value,
        }))
    }

    async fn release(&self, token: &LockToken) -> HerdResult<bool> {
        let mut conn = self.conn().await?;

        let deleted: i32 = redis::Script::new(RELEASE_SCRIPT)
            .key(&token.resource)
            .arg(&token.value)
            .invoke_async(&mut *conn)
            .await
            .map_err(|e| {
                HerdError::lock(format!("Failed to release '{}': {}", token.resource, e))
            })?;

        debug!(resource = %token.resource, released = deleted > 0, "lock release");
        Ok(deleted > 0)
    }
}
