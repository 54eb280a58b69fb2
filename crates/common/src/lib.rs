//! Certforge Common Utilities
//!
//! Shared infrastructure for all Certforge crates:
//! - Error types and result aliases
//! - Job clock and log timestamps
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
