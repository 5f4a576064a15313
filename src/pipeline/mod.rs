//! Backup-to-dump orchestration
//!
//! One linear pass per run:
//!
//! identity → workspace → extract → decompress → log replay → instance
//! start → ready wait → catalog → filter → dump each → instance stop →
//! optional purge
//!
//! # Invariants
//!
//! - Nothing touches the filesystem or launches a process until the archive,
//!   output directory, patterns and identity have all been validated.
//! - Once the instance has been started it is stopped exactly once, on every
//!   path, unless it already exited on its own.
//! - The workspace is purged only after the instance stopped cleanly and
//!   every selected database was dumped.

mod errors;

pub use errors::{FailureKind, PipelineError, PipelineResult};

use std::fmt;
use std::path::{Path, PathBuf};

use crate::catalog::{self, CatalogError, CatalogResult, Dumper};
use crate::config::{Config, DumpFailurePolicy};
use crate::extract::ArchiveExtractor;
use crate::identity::{self, Identity};
use crate::instance::{Connector, EphemeralInstance, MySqlConnector, ReadyOptions, Session};
use crate::observability::{Event, Logger, ObservationScope, Severity, Timer};
use crate::recovery::{RecoveryApplier, RecoveryOutcome};
use crate::workspace::Workspace;

/// What to convert and where
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Backup archive
    pub source: PathBuf,
    /// Unprivileged account for child processes (required when privileged)
    pub user: Option<String>,
    /// Reuse this workspace instead of allocating a fresh one
    pub tmpdir: Option<PathBuf>,
    /// Glob patterns selecting databases; empty selects all
    pub databases: Vec<String>,
    /// Destination of the dump files
    pub outdir: PathBuf,
    /// Remove the workspace after a clean run
    pub cleanup: bool,
    /// Stop after filtering and report the selection only
    pub list_only: bool,
}

/// One database written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpedFile {
    pub database: String,
    pub path: PathBuf,
    /// Uncompressed SQL bytes
    pub bytes: u64,
}

/// One database that could not be dumped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpFailure {
    pub database: String,
    pub code: &'static str,
    pub reason: String,
}

/// Outcome of a run that got past instance startup
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Workspace root used by the run
    pub workspace: PathBuf,
    /// Databases selected by the patterns, sorted
    pub selected: Vec<String>,
    pub dumped: Vec<DumpedFile>,
    pub failures: Vec<DumpFailure>,
    /// Whether the workspace was removed
    pub purged: bool,
}

impl RunReport {
    /// Every selected database was dumped (or only listing was requested)
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} selected, {} dumped, {} failed",
            self.selected.len(),
            self.dumped.len(),
            self.failures.len()
        )
    }
}

/// Drives one conversion run
pub struct Pipeline<C = MySqlConnector> {
    config: Config,
    connector: C,
    extractor: ArchiveExtractor,
    applier: RecoveryApplier,
    dumper: Dumper,
}

impl Pipeline<MySqlConnector> {
    pub fn new(config: Config) -> Self {
        Self::with_connector(config, MySqlConnector::new())
    }
}

impl<C: Connector> Pipeline<C> {
    /// Build a pipeline that reaches the instance through `connector`
    pub fn with_connector(config: Config, connector: C) -> Self {
        Self {
            extractor: ArchiveExtractor::new(&config),
            applier: RecoveryApplier::new(&config),
            dumper: Dumper::new(&config),
            config,
            connector,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute the whole run
    ///
    /// Per-database dump failures do not make this return `Err`; they are
    /// collected in the report.
    pub async fn run(&self, options: &RunOptions, logger: &Logger) -> PipelineResult<RunReport> {
        let timer = Timer::new();
        logger.info(
            Event::RunStart,
            &[
                ("outdir", &options.outdir.display().to_string()),
                ("source", &options.source.display().to_string()),
            ],
        );

        match self.execute(options, logger).await {
            Ok(report) => {
                let severity = if report.is_success() {
                    Severity::Info
                } else {
                    Severity::Error
                };
                logger.log(
                    severity,
                    Event::RunComplete,
                    &[
                        ("dumped", &report.dumped.len().to_string()),
                        ("elapsed_ms", &timer.elapsed_ms()),
                        ("failed", &report.failures.len().to_string()),
                        ("selected", &report.selected.len().to_string()),
                    ],
                );
                Ok(report)
            }
            Err(e) => {
                logger.event(
                    Event::RunFailed,
                    &[
                        ("code", e.code()),
                        ("kind", e.kind().as_str()),
                        ("reason", &e.to_string()),
                    ],
                );
                Err(e)
            }
        }
    }

    async fn execute(&self, options: &RunOptions, logger: &Logger) -> PipelineResult<RunReport> {
        preflight(options)?;

        let identity = identity::resolve(options.user.as_deref(), logger)?;
        let workspace = Workspace::ensure_root(options.tmpdir.as_deref(), identity, logger)?;

        self.prepare_data(options, &workspace, identity, logger).await?;

        let mut instance = {
            let scope = ObservationScope::new(logger, "INSTANCE_START");
            let started = EphemeralInstance::start(&self.config, &workspace, identity, logger);
            close_scope(scope, started)?
        };

        let served = self.serve(&mut instance, options, logger).await;
        let stopped = instance.stop(logger).await;

        let mut report = match (served, stopped) {
            (Ok(report), Ok(())) => report,
            (Ok(_), Err(stop_err)) => return Err(stop_err.into()),
            (Err(e), Err(stop_err)) => {
                logger.log_named(
                    Severity::Error,
                    "INSTANCE_STOP_FAILED",
                    &[("reason", &stop_err.to_string())],
                );
                return Err(e);
            }
            (Err(e), Ok(())) => return Err(e),
        };

        report.workspace = workspace.root().to_path_buf();
        if options.cleanup && report.is_success() {
            workspace.purge(logger)?;
            report.purged = true;
        } else {
            logger.info(
                Event::WorkspaceRetained,
                &[("path", &report.workspace.display().to_string())],
            );
        }

        Ok(report)
    }

    /// Extract, decompress and replay the storage-engine log
    async fn prepare_data(
        &self,
        options: &RunOptions,
        workspace: &Workspace,
        identity: Identity,
        logger: &Logger,
    ) -> PipelineResult<()> {
        let scope = ObservationScope::new(logger, "EXTRACT");
        match self
            .extractor
            .extract(&options.source, workspace, identity, logger)
            .await
        {
            Ok(skipped) => {
                scope.complete_with_fields(&[("skipped", if skipped { "true" } else { "false" })])
            }
            Err(e) => {
                scope.fail(&e.to_string());
                return Err(e.into());
            }
        }

        let scope = ObservationScope::new(logger, "DECOMPRESS");
        match self
            .extractor
            .decompress_all(&workspace.data_dir(), identity, logger)
            .await
        {
            Ok(count) => scope.complete_with_fields(&[("files", &count.to_string())]),
            Err(e) => {
                scope.fail(&e.to_string());
                return Err(e.into());
            }
        }

        let scope = ObservationScope::new(logger, "LOG_REPLAY");
        match self.applier.apply_once(workspace, identity, logger).await {
            Ok(outcome) => {
                let applied = outcome == RecoveryOutcome::Applied;
                scope.complete_with_fields(&[("applied", if applied { "true" } else { "false" })])
            }
            Err(e) => {
                scope.fail(&e.to_string());
                return Err(e.into());
            }
        }

        Ok(())
    }

    /// Everything that needs the running instance
    async fn serve(
        &self,
        instance: &mut EphemeralInstance,
        options: &RunOptions,
        logger: &Logger,
    ) -> PipelineResult<RunReport> {
        let mut session = {
            let scope = ObservationScope::new(logger, "READY_WAIT");
            let ready = instance
                .wait_ready(&self.connector, ReadyOptions::from_config(&self.config), logger)
                .await;
            close_scope(scope, ready)?
        };

        let scope = ObservationScope::new(logger, "CATALOG");
        let listed = catalog::list_databases(&mut session, logger).await;
        session.close().await;
        let databases = close_scope(scope, listed)?;

        let selected = catalog::filter(&databases, &options.databases)?;
        logger.info(
            Event::CatalogFiltered,
            &[
                ("available", &databases.len().to_string()),
                ("patterns", &options.databases.join(" ")),
                ("selected", &selected.len().to_string()),
            ],
        );
        for name in &selected {
            logger.trace(Event::DatabaseSelected, &[("database", name)]);
        }

        let mut report = RunReport {
            selected: selected.into_iter().collect(),
            ..RunReport::default()
        };

        if !options.list_only {
            self.dump_selected(instance.socket_path(), &options.outdir, &mut report, logger)
                .await;
        }

        Ok(report)
    }

    /// Dump each selected database in order, applying the failure policy
    async fn dump_selected(
        &self,
        socket: &Path,
        outdir: &Path,
        report: &mut RunReport,
        logger: &Logger,
    ) {
        let scope = ObservationScope::new(logger, "DUMP");

        for database in &report.selected {
            let timer = Timer::new();

            match self.dump_one(socket, outdir, database, logger).await {
                Ok(file) => {
                    logger.info(
                        Event::DumpComplete,
                        &[
                            ("bytes", &file.bytes.to_string()),
                            ("database", database),
                            ("elapsed_ms", &timer.elapsed_ms()),
                        ],
                    );
                    report.dumped.push(file);
                }
                Err(e) => {
                    logger.error(
                        Event::DumpFailed,
                        &[
                            ("code", e.code()),
                            ("database", database),
                            ("reason", &e.to_string()),
                        ],
                    );
                    report.failures.push(failure(database, &e));
                    if self.config.on_dump_failure == DumpFailurePolicy::Abort {
                        break;
                    }
                }
            }
        }

        let failed: Vec<&str> = report.failures.iter().map(|f| f.database.as_str()).collect();
        let summary = [
            ("dumped", report.dumped.len().to_string()),
            ("failed", report.failures.len().to_string()),
            ("failed_databases", failed.join(" ")),
            ("selected", report.selected.len().to_string()),
        ];
        let fields: Vec<(&str, &str)> = summary.iter().map(|(k, v)| (*k, v.as_str())).collect();

        if report.failures.is_empty() {
            logger.info(Event::DumpSummary, &fields);
            scope.complete();
        } else {
            logger.error(Event::DumpSummary, &fields);
            scope.fail(&format!("{} database(s) failed", report.failures.len()));
        }
    }

    async fn dump_one(
        &self,
        socket: &Path,
        outdir: &Path,
        database: &str,
        logger: &Logger,
    ) -> CatalogResult<DumpedFile> {
        let output = Dumper::output_path(outdir, database)?;
        logger.info(
            Event::DumpStart,
            &[
                ("database", database),
                ("path", &output.display().to_string()),
            ],
        );

        let bytes = self.dumper.dump(socket, database, &output).await?;
        Ok(DumpedFile {
            database: database.to_string(),
            path: output,
            bytes,
        })
    }
}

/// Checks that need no side effects
fn preflight(options: &RunOptions) -> PipelineResult<()> {
    if !options.source.is_file() {
        return Err(PipelineError::SourceMissing(options.source.clone()));
    }
    if !options.outdir.is_dir() {
        return Err(PipelineError::OutdirMissing(options.outdir.clone()));
    }
    if !options.databases.is_empty() {
        catalog::compile(&options.databases)?;
    }
    Ok(())
}

/// Close `scope` according to `result` and convert the error
fn close_scope<T, E>(scope: ObservationScope<'_>, result: Result<T, E>) -> PipelineResult<T>
where
    E: Into<PipelineError> + fmt::Display,
{
    match result {
        Ok(value) => {
            scope.complete();
            Ok(value)
        }
        Err(e) => {
            scope.fail(&e.to_string());
            Err(e.into())
        }
    }
}

fn failure(database: &str, err: &CatalogError) -> DumpFailure {
    DumpFailure {
        database: database.to_string(),
        code: err.code(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::SessionError;
    use std::fs;
    use tempfile::TempDir;

    struct NeverConnects;

    struct NoSession;

    impl Session for NoSession {
        async fn database_names(&mut self) -> Result<Vec<String>, SessionError> {
            Ok(Vec::new())
        }

        async fn close(self) {}
    }

    impl Connector for NeverConnects {
        type Session = NoSession;

        async fn connect(&self, _socket: &Path) -> Result<NoSession, SessionError> {
            Err(SessionError::new("unreachable"))
        }
    }

    fn pipeline() -> Pipeline<NeverConnects> {
        Pipeline::with_connector(Config::default(), NeverConnects)
    }

    #[tokio::test]
    async fn test_missing_source_fails_before_side_effects() {
        let temp = TempDir::new().unwrap();
        let tmpdir = temp.path().join("ws");
        fs::create_dir(&tmpdir).unwrap();
        let logger = Logger::capture();

        let options = RunOptions {
            source: temp.path().join("missing.xbstream"),
            tmpdir: Some(tmpdir.clone()),
            outdir: temp.path().to_path_buf(),
            ..RunOptions::default()
        };

        let err = pipeline().run(&options, &logger).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Configuration);
        assert_eq!(err.code(), "B2S_SOURCE_MISSING");
        assert_eq!(fs::read_dir(&tmpdir).unwrap().count(), 0);

        let lines = logger.captured();
        assert!(lines.first().unwrap().contains("RUN_BEGIN"));
        assert!(lines.last().unwrap().contains("RUN_FAILED"));
    }

    #[tokio::test]
    async fn test_missing_outdir_is_configuration_error() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("backup.xbstream");
        fs::write(&source, b"archive").unwrap();
        let logger = Logger::capture();

        let options = RunOptions {
            source,
            outdir: temp.path().join("no-such-outdir"),
            ..RunOptions::default()
        };

        let err = pipeline().run(&options, &logger).await.unwrap_err();
        assert_eq!(err.code(), "B2S_OUTDIR_MISSING");
        assert_eq!(err.kind(), FailureKind::Configuration);
    }

    #[tokio::test]
    async fn test_invalid_pattern_rejected_up_front() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("backup.xbstream");
        fs::write(&source, b"archive").unwrap();
        let logger = Logger::capture();

        let options = RunOptions {
            source,
            outdir: temp.path().to_path_buf(),
            databases: vec!["app_[".to_string()],
            ..RunOptions::default()
        };

        let err = pipeline().run(&options, &logger).await.unwrap_err();
        assert_eq!(err.code(), "B2S_CATALOG_PATTERN");
        assert!(!logger.captured().iter().any(|l| l.contains("WORKSPACE_READY")));
    }

    #[test]
    fn test_report_display() {
        let report = RunReport {
            selected: vec!["a".to_string(), "b".to_string()],
            failures: vec![DumpFailure {
                database: "b".to_string(),
                code: "B2S_DUMP_TOOL",
                reason: "exit 2".to_string(),
            }],
            ..RunReport::default()
        };
        assert!(!report.is_success());
        assert_eq!(report.to_string(), "2 selected, 0 dumped, 1 failed");
    }
}
