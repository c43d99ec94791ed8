//! ie-cli library
//!
//! Argument parsing and command execution for the `ie` binary.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod overrides;
pub mod runner;
pub mod user_commands;

#[cfg(test)]
mod tests;

pub use cli::Cli;
pub use error::{CliError, Result};
pub use runner::{Outcome, execute, load_relations};
