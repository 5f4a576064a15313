//! CLI module for backup2sql
//!
//! One command: convert the archive given as the positional argument into
//! one compressed SQL dump per selected database.

mod args;
mod commands;
mod errors;
mod io;

pub use args::Cli;
pub use commands::{load_config, run, run_options, run_with};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::write_names;
