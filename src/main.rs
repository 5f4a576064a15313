//! backup2sql CLI entry point
//!
//! Parses nothing and loads nothing itself: everything is delegated to the
//! CLI module. Prints the error to stderr and exits with its status code.

use backup2sql::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(e.exit_code());
    }
}
