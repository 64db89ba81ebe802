//! # Herd Cache
//!
//! Read-through memoization over a shared key-value store. Results of
//! expensive operations are stored in entity-scoped hashes keyed by a
//! canonical (operation, sorted-parameters) encoding, and recomputation
//! of a missing entry is serialized through a per-key distributed lock
//! so concurrent misses cannot stampede the backend.

pub mod gateway;
pub mod keys;
pub mod lock;
pub mod memo;
pub mod retry;
pub mod store;

pub use gateway::CacheGateway;
pub use keys::{encode_field, select_params, CacheEntity, KeyBuilder, MemoKey, Params};
pub use lock::{DistributedLock, LockToken, MemoryLock, RedisLock};
pub use memo::Memoizer;
pub use retry::RetryPolicy;
pub use store::{create_pool, CacheStore, MemoryStore, RedisStore};
