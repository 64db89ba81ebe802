//! In-memory store for tests and single-process deployments.

use super::CacheStore;
use async_trait::async_trait;
use herd_core::HerdResult;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Entry {
    fields: HashMap<String, String>,
    expires_at: Option<Instant>,
}

/// In-memory `CacheStore` with the same observable semantics as the Redis
/// store: per-key hashes, lazy expiry, literal-prefix pattern deletes.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn purge_if_expired(entries: &mut HashMap<String, Entry>, name: &str) {
        let expired = entries
            .get(name)
            .is_some_and(|entry| entry.expires_at.is_some_and(|at| at <= Instant::now()));
        if expired {
            entries.remove(name);
        }
    }
}

// The gateway only emits literal patterns with a trailing '*'; a full glob
// engine is not needed here.
fn pattern_matches(pattern: &str, key: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn hget(&self, name: &str, field: &str) -> HerdResult<Option<String>> {
        let mut entries = self.inner.write();
        Self::purge_if_expired(&mut entries, name);
        Ok(entries
            .get(name)
            .and_then(|entry| entry.fields.get(field).cloned()))
    }

    async fn hset(&self, name: &str, field: &str, value: &str) -> HerdResult<()> {
        let mut entries = self.inner.write();
        Self::purge_if_expired(&mut entries, name);
        entries
            .entry(name.to_string())
            .or_default()
            .fields
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hexists(&self, name: &str, field: &str) -> HerdResult<bool> {
        let mut entries = self.inner.write();
        Self::purge_if_expired(&mut entries, name);
        Ok(entries
            .get(name)
            .is_some_and(|entry| entry.fields.contains_key(field)))
    }

    async fn hdel(&self, name: &str, field: &str) -> HerdResult<bool> {
        let mut entries = self.inner.write();
        Self::purge_if_expired(&mut entries, name);
        let Some(entry) = entries.get_mut(name) else {
            return Ok(false);
        };
        let removed = entry.fields.remove(field).is_some();
        if entry.fields.is_empty() {
            entries.remove(name);
        }
        Ok(removed)
    }

    async fn delete(&self, name: &str) -> HerdResult<bool> {
        let mut entries = self.inner.write();
        Self::purge_if_expired(&mut entries, name);
        Ok(entries.remove(name).is_some())
    }

    async fn scan_delete(&self, pattern: &str) -> HerdResult<u64> {
        let mut entries = self.inner.write();
        let matching: Vec<String> = entries
            .keys()
            .filter(|key| pattern_matches(pattern, key))
            .cloned()
            .collect();
        for key in &matching {
            entries.remove(key);
        }
        Ok(matching.len() as u64)
    }

    async fn ttl(&self, name: &str) -> HerdResult<Option<Duration>> {
        let mut entries = self.inner.write();
        Self::purge_if_expired(&mut entries, name);
        Ok(entries
            .get(name)
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(Instant::now())))
    }

    async fn expire(&self, name: &str, ttl: Duration) -> HerdResult<bool> {
        let mut entries = self.inner.write();
        Self::purge_if_expired(&mut entries, name);
        match entries.get_mut(name) {
            Some(entry) => {
                entry.expires_at = Some(Instant::now() + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
