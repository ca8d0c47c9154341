//! Terminal output

pub mod reporter;

pub use reporter::{TerminalReporter, format_size};
