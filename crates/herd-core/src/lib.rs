//! # Herd Core
//!
//! Core types, error definitions, and tracing bootstrap shared by the
//! Herd cache gateway crates.

pub mod error;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use result::*;
