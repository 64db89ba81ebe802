//! Unified error types for all layers of the cache gateway.

use thiserror::Error;

/// Unified error type for Herd.
///
/// Covers key-derivation invariant violations, cache and lock transport
/// failures, and the lock-contention abort raised when a memoized call
/// exhausts its retry budget.
#[derive(Error, Debug)]
pub enum HerdError {
    // ============ Key Derivation Errors ============
    /// Empty or otherwise malformed key component
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    /// Allow-listed parameter absent from the supplied parameter map
    #[error("Missing cache parameter: {name}")]
    MissingParam { name: String },

    // ============ Infrastructure Errors ============
    /// Backing store error
    #[error("Cache error: {0}")]
    Cache(String),

    /// Distributed lock transport error
    #[error("Lock error: {0}")]
    Lock(String),

    /// Lock acquisition retries exhausted without the value appearing
    #[error("Failed to acquire lock on {resource} after {attempts} attempts")]
    LockContended { resource: String, attempts: u32 },

    /// Value could not be serialized or deserialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    // ============ Internal Errors ============
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HerdError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidKey(_) => "INVALID_KEY",
            Self::MissingParam { .. } => "MISSING_PARAM",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Lock(_) => "LOCK_ERROR",
            Self::LockContended { .. } => "LOCK_CONTENDED",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Creates an invalid key error.
    #[must_use]
    pub fn invalid_key<T: Into<String>>(message: T) -> Self {
        Self::InvalidKey(message.into())
    }

    /// Creates a missing parameter error.
    #[must_use]
    pub fn missing_param<T: Into<String>>(name: T) -> Self {
        Self::MissingParam { name: name.into() }
    }

    /// Creates a cache error.
    #[must_use]
    pub fn cache<T: Into<String>>(message: T) -> Self {
        Self::Cache(message.into())
    }

    /// Creates a lock error.
    #[must_use]
    pub fn lock<T: Into<String>>(message: T) -> Self {
        Self::Lock(message.into())
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration<T: Into<String>>(message: T) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal(message.into())
    }

    /// Checks if this error is retriable.
    ///
    /// Key-derivation and configuration violations are deterministic and
    /// never retried; transport failures and lock contention may clear up.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Cache(_) | Self::Lock(_) | Self::LockContended { .. }
        )
    }
}

impl From<serde_json::Error> for HerdError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(HerdError::invalid_key("empty model").error_code(), "INVALID_KEY");
        assert_eq!(HerdError::missing_param("page").error_code(), "MISSING_PARAM");
        assert_eq!(HerdError::cache("hget failed").error_code(), "CACHE_ERROR");
        assert_eq!(HerdError::lock("set failed").error_code(), "LOCK_ERROR");
        assert_eq!(HerdError::configuration("bad port").error_code(), "CONFIGURATION_ERROR");
        assert_eq!(HerdError::internal("oops").error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_lock_contended_code_and_message() {
        let err = HerdError::LockContended {
            resource: "herd:cache:lock:order:42:get_total".to_string(),
            attempts: 10,
        };
        assert_eq!(err.error_code(), "LOCK_CONTENDED");
        assert!(err.to_string().contains("after 10 attempts"));
        assert!(err.to_string().contains("order:42"));
    }

    #[test]
    fn test_retriable_errors() {
        assert!(HerdError::cache("connection lost").is_retriable());
        assert!(HerdError::lock("connection lost").is_retriable());
        assert!(HerdError::LockContended {
            resource: "r".to_string(),
            attempts: 10
        }
        .is_retriable());
    }

    #[test]
    fn test_non_retriable_errors() {
        assert!(!HerdError::invalid_key("empty").is_retriable());
        assert!(!HerdError::missing_param("page").is_retriable());
        assert!(!HerdError::configuration("bad").is_retriable());
        assert!(!HerdError::internal("oops").is_retriable());
    }

    #[test]
    fn test_serde_json_conversion() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: HerdError = json_err.into();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");
    }

    #[test]
    fn test_error_constructors() {
        let invalid = HerdError::invalid_key("operation name is empty");
        assert!(invalid.to_string().contains("operation name is empty"));

        let missing = HerdError::missing_param("currency");
        assert!(missing.to_string().contains("currency"));

        let cache = HerdError::cache("timed out");
        assert!(cache.to_string().contains("timed out"));
    }
}
