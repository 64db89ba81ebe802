//! Distributed mutual-exclusion locks guarding recomputation.
//!
//! Each missing cache entry is recomputed under a lock scoped to that one
//! memo key, so unrelated misses never serialize on each other. Leases
//! bound the stall a dead holder can cause.

mod memory_lock;
mod redis_lock;

pub use memory_lock::MemoryLock;
pub use redis_lock::RedisLock;

use async_trait::async_trait;
use herd_core::HerdResult;
use std::time::Duration;

/// Token proving lock ownership; required for release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    /// Resource the lock covers.
    pub resource: String,
    /// Holder-unique value. Release only succeeds while the stored value
    /// still matches, so a holder can never release a successor's lock.
    pub value: String,
}

/// Lease-based mutual exclusion across independent processes.
///
/// At most one holder per resource at any time. Not reentrant.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Attempt to take the lock. `None` when another holder has it.
    async fn try_acquire(&self, resource: &str, lease: Duration)
        -> HerdResult<Option<LockToken>>;

    /// Release a held lock. Returns `false` when the lease already expired
    /// or the token no longer matches.
    async fn release(&self, token: &LockToken) -> HerdResult<bool>;
}
