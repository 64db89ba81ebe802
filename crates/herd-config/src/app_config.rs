//! Configuration structures for the cache gateway.

use herd_core::{HerdError, HerdResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for Herd.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HerdConfig {
    /// Redis connection configuration.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Cache gateway configuration.
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for HerdConfig {
    fn default() -> Self {
        Self {
            redis: RedisConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl HerdConfig {
    /// Validates the configuration, rejecting out-of-range values.
    pub fn validate(&self) -> HerdResult<()> {
        if self.redis.pool_size == 0 {
            return Err(HerdError::configuration("redis.pool_size must be at least 1"));
        }
        if self.cache.key_prefix.is_empty() {
            return Err(HerdError::configuration("cache.key_prefix must not be empty"));
        }
        // The prefix seeds a SCAN MATCH pattern; glob metacharacters would
        // widen the namespace-clear beyond this gateway's keys.
        if self.cache.key_prefix.contains(['*', '?', '[']) {
            return Err(HerdError::configuration(
                "cache.key_prefix must not contain glob characters",
            ));
        }
        if self.cache.lock.lease_ms == 0 {
            return Err(HerdError::configuration("cache.lock.lease_ms must be at least 1"));
        }
        if self.cache.lock.max_attempts == 0 {
            return Err(HerdError::configuration(
                "cache.lock.max_attempts must be at least 1",
            ));
        }
        if self.cache.lock.multiplier < 1.0 {
            return Err(HerdError::configuration(
                "cache.lock.multiplier must be at least 1.0",
            ));
        }
        if self.cache.lock.initial_delay_ms > self.cache.lock.max_delay_ms {
            return Err(HerdError::configuration(
                "cache.lock.initial_delay_ms must not exceed cache.lock.max_delay_ms",
            ));
        }
        Ok(())
    }
}

/// Redis connection configuration.
///
/// Addressed by host, port, and logical database number; `url()` renders
/// the connection string the driver consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis host.
    #[serde(default = "default_redis_host")]
    pub host: String,

    /// Redis port.
    #[serde(default = "default_redis_port")]
    pub port: u16,

    /// Logical database number.
    #[serde(default)]
    pub db: u32,

    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: default_redis_host(),
            port: default_redis_port(),
            db: 0,
            pool_size: default_pool_size(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl RedisConfig {
    /// Renders the Redis connection URL.
    #[must_use]
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }

    /// Returns the connection timeout as Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_redis_host() -> String {
    "127.0.0.1".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_pool_size() -> usize {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

/// Cache gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether memoization is active. When false, memoized calls execute
    /// directly with no cache reads, writes, or locking.
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Namespace prefix for all gateway keys.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Distributed lock configuration.
    #[serde(default)]
    pub lock: LockConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            key_prefix: default_key_prefix(),
            lock: LockConfig::default(),
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_key_prefix() -> String {
    "herd:cache".to_string()
}

/// Distributed lock configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// Lock lease duration in milliseconds. Bounds the worst-case stall
    /// if a holder dies without releasing.
    #[serde(default = "default_lease_ms")]
    pub lease_ms: u64,

    /// Maximum lock acquisition attempts before a memoized call fails.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff delay between acquisition attempts, in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum backoff delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Whether to add jitter to backoff delays.
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lease_ms: default_lease_ms(),
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            jitter: default_jitter(),
        }
    }
}

impl LockConfig {
    /// Returns the lock lease as Duration.
    #[must_use]
    pub fn lease(&self) -> Duration {
        Duration::from_millis(self.lease_ms)
    }
}

fn default_lease_ms() -> u64 {
    15_000
}

fn default_max_attempts() -> u32 {
    10
}

fn default_initial_delay_ms() -> u64 {
    50
}

fn default_max_delay_ms() -> u64 {
    1_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HerdConfig::default();
        assert_eq!(config.redis.port, 6379);
        assert_eq!(config.redis.db, 0);
        assert_eq!(config.cache.key_prefix, "herd:cache");
        assert!(config.cache.enabled);
        assert_eq!(config.cache.lock.lease_ms, 15_000);
        assert_eq!(config.cache.lock.max_attempts, 10);
        config.validate().expect("default config should validate");
    }

    #[test]
    fn test_redis_url() {
        let config = RedisConfig {
            host: "cache.internal".to_string(),
            port: 6380,
            db: 3,
            ..Default::default()
        };
        assert_eq!(config.url(), "redis://cache.internal:6380/3");
    }

    #[test]
    fn test_lock_lease_duration() {
        let config = LockConfig::default();
        assert_eq!(config.lease(), Duration::from_millis(15_000));
    }

    #[test]
    fn test_validate_rejects_zero_pool() {
        let mut config = HerdConfig::default();
        config.redis.pool_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_prefix() {
        let mut config = HerdConfig::default();
        config.cache.key_prefix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_glob_prefix() {
        let mut config = HerdConfig::default();
        config.cache.key_prefix = "herd:*".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = HerdConfig::default();
        config.cache.lock.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_shrinking_backoff() {
        let mut config = HerdConfig::default();
        config.cache.lock.initial_delay_ms = 5_000;
        config.cache.lock.max_delay_ms = 100;
        assert!(config.validate().is_err());
    }
}
