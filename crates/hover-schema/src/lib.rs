//! Shared types for hover's engine cache and build pipeline.
//!
//! Everything in this crate is pure: no filesystem or network access.

pub mod files;
pub mod mode;
pub mod platform;
pub mod target;

// Re-exports
pub use mode::BuildMode;
pub use platform::{PlatformKey, engine_cache_path};
pub use target::TargetOs;

use thiserror::Error;

/// Errors raised while parsing schema values from user input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Target operating system is not a supported desktop platform.
    #[error("Target platform {0} is not supported")]
    UnsupportedTarget(String),

    /// Build mode name is not one of debug, profile or release.
    #[error("Unknown build mode: {0}")]
    UnknownMode(String),
}
