//! In-memory lock for tests and single-process deployments.

use super::{DistributedLock, LockToken};
use async_trait::async_trait;
use herd_core::HerdResult;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Held {
    value: String,
    expires_at: Instant,
}

/// In-memory `DistributedLock` with lease semantics matching the Redis
/// lock: an expired lease is free to take, and release is token-compared.
#[derive(Debug, Default, Clone)]
pub struct MemoryLock {
    inner: Arc<Mutex<HashMap<String, Held>>>,
}

impl MemoryLock {
    /// Create an empty lock registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DistributedLock for MemoryLock {
    async fn try_acquire(
        &self,
        resource: &str,
        lease: Duration,
    ) -> HerdResult<Option<LockToken>> {
        let mut held = self.inner.lock();

        if held
            .get(resource)
            .is_some_and(|h| h.expires_at > Instant::now())
        {
            return Ok(None);
        }

        let value = uuid::Uuid::new_v4().to_string();
        held.insert(
            resource.to_string(),
            Held {
                value: value.clone(),
                expires_at: Instant::now() + lease,
            },
        );

        Ok(Some(LockToken {
            resource: resource.to_string(),
            value,
        }))
    }

    async fn release(&self, token: &LockToken) -> HerdResult<bool> {
        let mut held = self.inner.lock();

        let owned = held
            .get(&token.resource)
            .is_some_and(|h| h.value == token.value && h.expires_at > Instant::now());
        if owned {
            held.remove(&token.resource);
        }

        Ok(owned)
    }
}
