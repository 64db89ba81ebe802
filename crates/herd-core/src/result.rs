//! Result alias used across all Herd crates.

use crate::error::HerdError;

/// Convenience alias for `Result<T, HerdError>`.
pub type HerdResult<T> = Result<T, HerdError>;
