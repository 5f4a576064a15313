//! CLI argument definitions using clap
//!
//! backup2sql <SRC> [--user <name>] [--tmpdir <dir>] [--databases <glob>]...
//!            [--outdir <dir>] [--cleanup | --no-cleanup] [--config <path>]

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// backup2sql - convert a physical backup archive into per-database SQL dumps
#[derive(Parser, Debug)]
#[command(name = "backup2sql")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Backup archive produced by the hot-backup tool
    #[arg(value_name = "SRC")]
    pub source: PathBuf,

    /// Unprivileged account for extraction and the database instance
    /// (required when running as root)
    #[arg(long)]
    pub user: Option<String>,

    /// Reuse this existing directory as the workspace
    #[arg(long, value_name = "DIR")]
    pub tmpdir: Option<PathBuf>,

    /// Glob pattern selecting databases to dump; repeatable (default: all)
    #[arg(long, value_name = "PATTERN", action = ArgAction::Append)]
    pub databases: Vec<String>,

    /// Directory receiving the dump files
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub outdir: PathBuf,

    /// Delete the workspace after a successful run
    #[arg(long, overrides_with = "no_cleanup")]
    pub cleanup: bool,

    /// Keep the workspace after the run (default)
    #[arg(long = "no-cleanup", action = ArgAction::SetTrue, overrides_with = "cleanup")]
    pub no_cleanup: bool,

    /// JSON configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the selected database names and exit without dumping
    #[arg(long)]
    pub list: bool,

    /// Give up if the instance is not ready after this many seconds
    #[arg(long, value_name = "SECS")]
    pub ready_timeout: Option<u64>,

    /// Stop dumping at the first failed database
    #[arg(long)]
    pub abort_on_failure: bool,

    /// Log readiness probes and per-file progress
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Log warnings and errors only
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Whether the workspace should be purged
    pub fn cleanup_requested(&self) -> bool {
        self.cleanup && !self.no_cleanup
    }
}
