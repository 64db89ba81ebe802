//! Read-through memoization with stampede protection.
//!
//! A missing entry is recomputed under a per-key distributed lock so that
//! concurrent misses produce exactly one computation. Callers that lose
//! the race back off and re-check the cache; they return the winner's
//! value as soon as it lands instead of recomputing it themselves.

use crate::gateway::CacheGateway;
use crate::keys::MemoKey;
use crate::lock::{DistributedLock, LockToken};
use crate::retry::RetryPolicy;
use herd_config::CacheConfig;
use herd_core::{HerdError, HerdResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Read-through memoizer over a gateway and a distributed lock.
#[derive(Clone)]
pub struct Memoizer {
    gateway: CacheGateway,
    lock: Arc<dyn DistributedLock>,
    retry: RetryPolicy,
    lease: Duration,
    enabled: bool,
}

impl Memoizer {
    /// Create a memoizer with default lease and retry settings.
    pub fn new(gateway: CacheGateway, lock: Arc<dyn DistributedLock>) -> Self {
        Self {
            gateway,
            lock,
            retry: RetryPolicy::default(),
            lease: Duration::from_millis(15_000),
            enabled: true,
        }
    }

    /// Create a memoizer configured from the cache section.
    pub fn from_config(
        config: &CacheConfig,
        gateway: CacheGateway,
        lock: Arc<dyn DistributedLock>,
    ) -> Self {
        Self {
            gateway,
            lock,
            retry: RetryPolicy::from(&config.lock),
            lease: config.lock.lease(),
            enabled: config.enabled,
        }
    }

    /// Override the lock retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override the lock lease.
    #[must_use]
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    /// Return the cached value for `key`, or compute and cache it.
    ///
    /// `None` for the key means no entity id could be determined: the
    /// computation runs directly with no cache reads, writes, or locking.
    /// On a hit the computation is not invoked at all. On a miss the
    /// per-key lock serializes recomputation; a caller that exhausts its
    /// acquisition budget without the value appearing fails with
    /// [`HerdError::LockContended`].
    pub async fn get_or_compute<T, F, Fut>(&self, key: Option<MemoKey>, compute: F) -> HerdResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = HerdResult<T>>,
    {
        let Some(key) = key else {
            debug!("no entity id, bypassing cache");
            return compute().await;
        };
        if !self.enabled {
            return compute().await;
        }

        if self.gateway.exists(&key).await? {
            if let Some(hit) = self.gateway.get(&key).await? {
                return Ok(hit);
            }
            // Deleted between the presence check and the read; recompute.
        }

        let resource = self.gateway.lock_resource(&key)?;
        let mut attempt: u32 = 0;
        let token = loop {
            match self.lock.try_acquire(&resource, self.lease).await? {
                Some(token) => break token,
                None => {
                    attempt += 1;
                    if attempt >= self.retry.max_attempts {
                        return Err(HerdError::LockContended { resource, attempts: attempt });
                    }
                    let delay = self.retry.delay_for_attempt(attempt);
                    debug!(
                        resource = %resource,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "lock busy, backing off"
                    );
                    tokio::time::sleep(delay).await;

                    // The race winner may have finished while we slept.
                    if let Some(hit) = self.gateway.get(&key).await? {
                        debug!(key = %key, "value appeared while waiting for the lock");
                        return Ok(hit);
                    }
                }
            }
        };
        debug!(resource = %resource, attempt, "lock acquired");

        // The winner may have written between our last check and the grab.
        match self.gateway.get(&key).await {
            Ok(Some(hit)) => {
                self.release(&token).await;
                return Ok(hit);
            }
            Ok(None) => {}
            Err(e) => {
                self.release(&token).await;
                return Err(e);
            }
        }

        let outcome = match compute().await {
            Ok(value) => self.gateway.set(&key, &value).await.map(|()| value),
            Err(e) => Err(e),
        };
        self.release(&token).await;
        outcome
    }

    async fn release(&self, token: &LockToken) {
        match self.lock.release(token).await {
            Ok(true) => debug!(resource = %token.resource, "lock released"),
            Ok(false) => warn!(resource = %token.resource, "lock lease expired before release"),
            Err(e) => warn!(resource = %token.resource, error = %e, "failed to release lock"),
        }
    }
}
