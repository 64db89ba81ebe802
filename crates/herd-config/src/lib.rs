//! # Herd Config
//!
//! Layered configuration for the Herd cache gateway: TOML files with
//! environment-variable overrides, validated before use.

pub mod app_config;
pub mod loader;

pub use app_config::*;
pub use loader::*;
