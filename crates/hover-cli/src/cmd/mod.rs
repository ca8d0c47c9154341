//! Command implementations

pub mod aot;
pub mod build;
pub mod engine;
pub mod env;
