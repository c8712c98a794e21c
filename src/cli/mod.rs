//! CLI layer for issuelens.
//!
//! Provides the command-line interface using clap, with commands for
//! building and querying the vector index, keyword and trend analysis, and
//! LLM-backed operations.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
