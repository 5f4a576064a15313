//! CLI command implementation
//!
//! Builds the logger, configuration and run options from the arguments,
//! then drives one pipeline run on a current-thread tokio runtime.

use std::io;

use crate::config::{Config, DumpFailurePolicy};
use crate::observability::{Event, Logger, Severity};
use crate::pipeline::{Pipeline, RunOptions};

use super::args::Cli;
use super::errors::{CliError, CliResult};
use super::io::write_names;

/// Parse arguments and run
pub fn run() -> CliResult<()> {
    run_with(Cli::parse_args())
}

/// Run with already-parsed arguments
pub fn run_with(cli: Cli) -> CliResult<()> {
    let logger = Logger::new(min_severity(&cli));
    let config = load_config(&cli, &logger)?;
    let options = run_options(&cli);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::io_error(format!("Failed to start runtime: {}", e)))?;

    let pipeline = Pipeline::new(config);
    let report = runtime.block_on(pipeline.run(&options, &logger))?;

    if options.list_only {
        write_names(&mut io::stdout().lock(), &report.selected)?;
    }

    if !report.is_success() {
        let failed: Vec<&str> = report.failures.iter().map(|f| f.database.as_str()).collect();
        return Err(CliError::dump_failed(format!(
            "{} ({})",
            report,
            failed.join(", ")
        )));
    }

    Ok(())
}

fn min_severity(cli: &Cli) -> Severity {
    if cli.verbose {
        Severity::Trace
    } else if cli.quiet {
        Severity::Warn
    } else {
        Severity::Info
    }
}

/// Config file (or defaults) with command-line overrides applied
pub fn load_config(cli: &Cli, logger: &Logger) -> CliResult<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            logger.info(
                Event::ConfigLoaded,
                &[("path", &path.display().to_string())],
            );
            config
        }
        None => Config::default(),
    };

    if let Some(secs) = cli.ready_timeout {
        config.ready_timeout_secs = Some(secs);
    }
    if cli.abort_on_failure {
        config.on_dump_failure = DumpFailurePolicy::Abort;
    }

    config.validate()?;
    Ok(config)
}

/// Translate arguments into pipeline options
pub fn run_options(cli: &Cli) -> RunOptions {
    RunOptions {
        source: cli.source.clone(),
        user: cli.user.clone(),
        tmpdir: cli.tmpdir.clone(),
        databases: cli.databases.clone(),
        outdir: cli.outdir.clone(),
        cleanup: cli.cleanup_requested(),
        list_only: cli.list,
    }
}
