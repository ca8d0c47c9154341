//! hover core library
//!
//! Engine cache management, AOT snapshot generation and the native build
//! environment for desktop Flutter applications.

pub mod aot;
pub mod assemble;
pub mod buildenv;
pub mod config;
pub mod engine;
pub mod flutter;
pub mod io;
pub mod lock;
pub mod paths;
pub mod reporter;
pub mod stage;

// Re-exports
pub use config::{BuildConfig, EngineConfig, ProjectConfig};
pub use engine::{EngineCache, EngineCacheOutcome, EngineError};
pub use reporter::{NullReporter, Reporter};

/// User agent sent with every artifact request.
pub const USER_AGENT: &str = concat!("hover/", env!("CARGO_PKG_VERSION"));
