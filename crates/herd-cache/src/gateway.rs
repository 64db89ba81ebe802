//! Cache gateway: entity-scoped hash entries over an injected store.

use crate::keys::{KeyBuilder, MemoKey};
use crate::store::CacheStore;
use herd_config::CacheConfig;
use herd_core::HerdResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Typed read/write/invalidate surface over the backing store.
///
/// Values are stored as JSON under `(<prefix>:entry:<model>:<id>, field)`
/// where the field canonically encodes the operation and its parameters.
/// Constructed explicitly around an injected store handle; there is no
/// process-wide instance.
#[derive(Clone)]
pub struct CacheGateway {
    store: Arc<dyn CacheStore>,
    keys: KeyBuilder,
}

impl CacheGateway {
    /// Create a gateway over a store with the given namespace prefix.
    pub fn new(store: Arc<dyn CacheStore>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            keys: KeyBuilder::new(key_prefix),
        }
    }

    /// Create a gateway configured from the cache section.
    pub fn from_config(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        Self::new(store, config.key_prefix.clone())
    }

    /// Lock resource guarding recomputation of one memo key.
    pub fn lock_resource(&self, key: &MemoKey) -> HerdResult<String> {
        let field = key.field()?;
        self.keys.lock(&key.model, &key.id, &field)
    }

    /// Read the cached value for a key. `None` is a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &MemoKey) -> HerdResult<Option<T>> {
        let name = self.keys.entity(&key.model, &key.id)?;
        let field = key.field()?;

        match self.store.hget(&name, &field).await? {
            Some(json) => {
                let value = serde_json::from_str(&json)?;
                debug!(name = %name, field = %field, "cache hit");
                Ok(Some(value))
            }
            None => {
                debug!(name = %name, field = %field, "cache miss");
                Ok(None)
            }
        }
    }

    /// Store a computed value under a key.
    ///
    /// An unserializable value is logged and skipped, leaving the key a
    /// miss; the caller still holds the freshly computed value, so the
    /// operation degrades to always-recompute rather than failing.
    pub async fn set<T: Serialize>(&self, key: &MemoKey, value: &T) -> HerdResult<()> {
        let name = self.keys.entity(&key.model, &key.id)?;
        let field = key.field()?;

        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(name = %name, field = %field, error = %e, "value not serializable, skipping cache write");
                return Ok(());
            }
        };

        self.store.hset(&name, &field, &json).await?;
        debug!(name = %name, field = %field, "cached value");
        Ok(())
    }

    /// Presence test for a key, deciding hit vs. miss.
    pub async fn exists(&self, key: &MemoKey) -> HerdResult<bool> {
        let name = self.keys.entity(&key.model, &key.id)?;
        let field = key.field()?;
        self.store.hexists(&name, &field).await
    }

    /// Remove one cached operation, leaving the entity's other operations
    /// intact.
    pub async fn delete_op(&self, key: &MemoKey) -> HerdResult<bool> {
        let name = self.keys.entity(&key.model, &key.id)?;
        let field = key.field()?;
        let removed = self.store.hdel(&name, &field).await?;
        debug!(name = %name, field = %field, removed, "deleted cached operation");
        Ok(removed)
    }

    /// Remove every cached operation for one entity.
    pub async fn delete_entity(&self, model: &str, id: &str) -> HerdResult<bool> {
        let name = self.keys.entity(model, id)?;
        let removed = self.store.delete(&name).await?;
        debug!(name = %name, removed, "deleted entity cache");
        Ok(removed)
    }

    /// Remove every entry under this gateway's namespace. Lock keys are
    /// outside the entry pattern and survive.
    pub async fn clear_namespace(&self) -> HerdResult<u64> {
        let deleted = self.store.scan_delete(&self.keys.namespace_pattern()).await?;
        debug!(count = deleted, "cleared cache namespace");
        Ok(deleted)
    }

    /// Assign a time to live to an entity's hash, set-once: an expiry
    /// already in place is never overwritten. Returns whether the expiry
    /// was applied.
    pub async fn expire_entity(&self, model: &str, id: &str, ttl: Duration) -> HerdResult<bool> {
        let name = self.keys.entity(model, id)?;

        if self.store.ttl(&name).await?.is_some() {
            debug!(name = %name, "ttl already set, leaving it");
            return Ok(false);
        }

        let applied = self.store.expire(&name, ttl).await?;
        debug!(name = %name, ttl_secs = ttl.as_secs(), applied, "set entity ttl");
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde::Deserialize;

    fn gateway() -> CacheGateway {
        CacheGateway::new(Arc::new(MemoryStore::new()), "herd:cache")
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Total {
        amount: f64,
        currency: String,
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("refuses to serialize"))
        }
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let gateway = gateway();
        let key = MemoKey::new("order", 42, "get_total").param("currency", "eur");

        let total = Total {
            amount: 17.5,
            currency: "eur".to_string(),
        };
        gateway.set(&key, &total).await.unwrap();

        let cached: Option<Total> = gateway.get(&key).await.unwrap();
        assert_eq!(cached, Some(total));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let gateway = gateway();
        let key = MemoKey::new("order", 42, "get_total");
        let cached: Option<f64> = gateway.get(&key).await.unwrap();
        assert!(cached.is_none());
        assert!(!gateway.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_unserializable_write_degrades_to_miss() {
        let gateway = gateway();
        let key = MemoKey::new("order", 42, "get_total");

        gateway.set(&key, &Unserializable).await.unwrap();
        assert!(!gateway.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_op_leaves_siblings() {
        let gateway = gateway();
        let total_key = MemoKey::new("order", 42, "get_total");
        let items_key = MemoKey::new("order", 42, "list_items");

        gateway.set(&total_key, &17.5_f64).await.unwrap();
        gateway.set(&items_key, &vec!["widget"]).await.unwrap();

        assert!(gateway.delete_op(&total_key).await.unwrap());
        assert!(!gateway.exists(&total_key).await.unwrap());
        assert!(gateway.exists(&items_key).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_entity_removes_all_operations() {
        let gateway = gateway();
        let total_key = MemoKey::new("order", 42, "get_total");
        let items_key = MemoKey::new("order", 42, "list_items");
        let other_entity = MemoKey::new("order", 43, "get_total");

        gateway.set(&total_key, &17.5_f64).await.unwrap();
        gateway.set(&items_key, &vec!["widget"]).await.unwrap();
        gateway.set(&other_entity, &9.0_f64).await.unwrap();

        assert!(gateway.delete_entity("order", "42").await.unwrap());
        assert!(!gateway.exists(&total_key).await.unwrap());
        assert!(!gateway.exists(&items_key).await.unwrap());
        assert!(gateway.exists(&other_entity).await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_namespace_only_touches_own_prefix() {
        let store = Arc::new(MemoryStore::new());
        let ours = CacheGateway::new(store.clone(), "herd:cache");
        let theirs = CacheGateway::new(store, "other:cache");

        let key = MemoKey::new("order", 42, "get_total");
        ours.set(&key, &17.5_f64).await.unwrap();
        theirs.set(&key, &9.0_f64).await.unwrap();

        let deleted = ours.clear_namespace().await.unwrap();
        assert_eq!(deleted, 1);
        assert!(!ours.exists(&key).await.unwrap());
        assert!(theirs.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_expire_is_set_once() {
        let store = Arc::new(MemoryStore::new());
        let gateway = CacheGateway::new(store.clone(), "herd:cache");
        let key = MemoKey::new("order", 42, "get_total");
        gateway.set(&key, &17.5_f64).await.unwrap();

        assert!(gateway
            .expire_entity("order", "42", Duration::from_secs(100))
            .await
            .unwrap());
        // A second expiry must not overwrite the first.
        assert!(!gateway
            .expire_entity("order", "42", Duration::from_secs(1))
            .await
            .unwrap());

        let remaining = store.ttl("herd:cache:entry:order:42").await.unwrap().unwrap();
        assert!(remaining > Duration::from_secs(50));
    }

    #[tokio::test]
    async fn test_expire_missing_entity_is_false() {
        let gateway = gateway();
        assert!(!gateway
            .expire_entity("order", "404", Duration::from_secs(1))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_invalid_key_surfaces_error() {
        let gateway = gateway();
        let key = MemoKey::new("", 42, "get_total");
        let err = gateway.exists(&key).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_KEY");
    }
}
