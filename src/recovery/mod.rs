//! Storage-engine log replay
//!
//! Runs the log-replay tool once against the extracted data directory so
//! the engine can start from a crash-consistent state.
//!
//! # Invariant
//!
//! Replay is not idempotent at the tool level: replaying an already
//! replayed directory may corrupt it. A marker file in the workspace root
//! is written only after a successful replay, and `apply_once` refuses to
//! run the tool again while the marker exists.

mod errors;

pub use errors::{RecoveryError, RecoveryResult};

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::identity::Identity;
use crate::observability::{Event, Logger};
use crate::process::ToolCommand;
use crate::workspace::Workspace;

/// Marker file name, relative to the workspace root
pub const RECOVERED_MARKER: &str = ".recovered";

/// Outcome of a guarded replay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// The tool ran and succeeded in this call
    Applied,
    /// A previous run already replayed this data directory
    AlreadyApplied,
}

/// Drives the log-replay tool
#[derive(Debug, Clone)]
pub struct RecoveryApplier {
    tool: String,
}

impl RecoveryApplier {
    pub fn new(config: &Config) -> Self {
        Self {
            tool: config.tools.innobackupex.clone(),
        }
    }

    /// Run the replay tool against `data_dir` and wait for it
    ///
    /// Callers must guarantee this runs at most once per extracted archive;
    /// prefer `apply_once`.
    pub async fn apply_log(&self, data_dir: &Path, identity: Identity) -> RecoveryResult<()> {
        if !data_dir.is_dir() {
            return Err(RecoveryError::MissingDataDir(data_dir.to_path_buf()));
        }

        ToolCommand::new(&self.tool)
            .arg("--apply-log")
            .arg(data_dir)
            .run_as(identity)
            .run()
            .await
            .map_err(|source| RecoveryError::Tool {
                path: data_dir.to_path_buf(),
                source,
            })
    }

    /// Replay the workspace data directory unless the marker says it is done
    pub async fn apply_once(
        &self,
        workspace: &Workspace,
        identity: Identity,
        logger: &Logger,
    ) -> RecoveryResult<RecoveryOutcome> {
        let marker = marker_path(workspace.root());
        if marker.exists() {
            logger.warn(
                Event::LogReplaySkipped,
                &[("marker", &marker.display().to_string())],
            );
            return Ok(RecoveryOutcome::AlreadyApplied);
        }

        self.apply_log(&workspace.data_dir(), identity).await?;

        fs::write(&marker, b"").map_err(|source| RecoveryError::Marker {
            path: marker.clone(),
            source,
        })?;

        Ok(RecoveryOutcome::Applied)
    }
}

/// Path of the replay marker for a workspace root
pub fn marker_path(root: &Path) -> PathBuf {
    root.join(RECOVERED_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Replay stand-in that appends one line per invocation to `count`
    fn counting_tool(dir: &Path, exit_code: i32) -> String {
        let path = dir.join("innobackupex");
        let count = dir.join("count");
        fs::write(
            &path,
            format!(
                "#!/bin/sh\n[ \"$1\" = \"--apply-log\" ] || exit 9\necho \"$2\" >> {}\nexit {}\n",
                count.display(),
                exit_code
            ),
        )
        .unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    fn applier(tool: String) -> RecoveryApplier {
        let mut config = Config::default();
        config.tools.innobackupex = tool;
        RecoveryApplier::new(&config)
    }

    fn invocations(dir: &Path) -> usize {
        fs::read_to_string(dir.join("count"))
            .map(|s| s.lines().count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_apply_once_runs_tool_once() {
        let tools = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let logger = Logger::capture();
        let ws = Workspace::ensure_root(Some(root.path()), Identity::current(), &logger).unwrap();
        ws.ensure_subdir(crate::workspace::DATA_DIR, &logger).unwrap();

        let applier = applier(counting_tool(tools.path(), 0));

        let first = applier.apply_once(&ws, Identity::current(), &logger).await.unwrap();
        let second = applier.apply_once(&ws, Identity::current(), &logger).await.unwrap();

        assert_eq!(first, RecoveryOutcome::Applied);
        assert_eq!(second, RecoveryOutcome::AlreadyApplied);
        assert_eq!(invocations(tools.path()), 1);
        assert!(marker_path(root.path()).exists());
    }

    #[tokio::test]
    async fn test_failed_replay_leaves_no_marker() {
        let tools = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        let logger = Logger::capture();
        let ws = Workspace::ensure_root(Some(root.path()), Identity::current(), &logger).unwrap();
        ws.ensure_subdir(crate::workspace::DATA_DIR, &logger).unwrap();

        let err = applier(counting_tool(tools.path(), 1))
            .apply_once(&ws, Identity::current(), &logger)
            .await
            .unwrap_err();

        assert!(err.is_tool_failure());
        assert_eq!(err.code(), "B2S_RECOVERY_TOOL");
        assert!(!marker_path(root.path()).exists());
    }

    #[tokio::test]
    async fn test_missing_data_dir() {
        let tools = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();

        let err = applier(counting_tool(tools.path(), 0))
            .apply_log(&root.path().join("mysql"), Identity::current())
            .await
            .unwrap_err();

        assert!(matches!(err, RecoveryError::MissingDataDir(_)));
        assert_eq!(invocations(tools.path()), 0);
    }
}
