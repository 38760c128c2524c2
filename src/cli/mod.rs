//! Command-line interface
//!
//! `main.rs` parses args and dispatches here; commands assemble subsystems
//! and never reach around them.

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::run_command;
pub use errors::{CliError, CliResult};
