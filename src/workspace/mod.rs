//! Workspace management
//!
//! One temporary directory tree per run:
//!
//! ```text
//! <root>/            0750, owner = controlling user, group = run identity
//!   mysql/           extracted and recovered data directory
//!   tmp/             engine scratch space
//!   run/             control socket and pid file
//!   .recovered       written after a successful log replay
//! ```
//!
//! Subdirectory creation is idempotent: an existing directory is left
//! untouched and reported as `created = false`, which later stages use as
//! an "already done" signal.

mod errors;

pub use errors::{WorkspaceError, WorkspaceErrorCode, WorkspaceResult};

use std::fs::{self, DirBuilder, Permissions};
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Path, PathBuf};

use nix::unistd::{chown, geteuid};
use walkdir::WalkDir;

use crate::identity::Identity;
use crate::observability::{Event, Logger};

/// Extracted data directory name
pub const DATA_DIR: &str = "mysql";
/// Engine scratch directory name
pub const TMP_DIR: &str = "tmp";
/// Control directory name
pub const RUN_DIR: &str = "run";

const ROOT_PREFIX: &str = "backup2sql";
const ROOT_MODE: u32 = 0o750;
const SUBDIR_MODE: u32 = 0o770;

/// The run's working directory tree
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    owner: Identity,
}

impl Workspace {
    /// Validate an explicit root or allocate a fresh temporary one
    ///
    /// The root is chowned to the controlling user and the owner's group,
    /// mode 0750.
    pub fn ensure_root(
        explicit: Option<&Path>,
        owner: Identity,
        logger: &Logger,
    ) -> WorkspaceResult<Self> {
        let root = match explicit {
            Some(path) => {
                if !path.is_dir() {
                    return Err(WorkspaceError::missing(path));
                }
                path.to_path_buf()
            }
            None => {
                let base = std::env::temp_dir();
                tempfile::Builder::new()
                    .prefix(ROOT_PREFIX)
                    .tempdir_in(&base)
                    .map_err(|e| WorkspaceError::io_error_at_path(&base, e))?
                    .keep()
            }
        };

        chown(&root, Some(geteuid()), Some(owner.nix_gid()))
            .map_err(|e| WorkspaceError::permission(&root, e))?;
        fs::set_permissions(&root, Permissions::from_mode(ROOT_MODE))
            .map_err(|e| WorkspaceError::io_error_at_path(&root, e))?;

        logger.info(
            Event::WorkspaceReady,
            &[("path", &root.display().to_string())],
        );

        Ok(Self { root, owner })
    }

    /// Workspace root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Identity that owns the subdirectories
    pub fn owner(&self) -> Identity {
        self.owner
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join(TMP_DIR)
    }

    pub fn run_dir(&self) -> PathBuf {
        self.root.join(RUN_DIR)
    }

    /// Create `root/<name>` unless it already exists
    ///
    /// Returns the path and whether it was created by this call. An existing
    /// directory keeps its ownership and permissions.
    pub fn ensure_subdir(&self, name: &str, logger: &Logger) -> WorkspaceResult<(PathBuf, bool)> {
        let path = self.root.join(name);
        let display = path.display().to_string();

        if path.exists() {
            logger.trace(Event::WorkspaceDirExists, &[("path", &display)]);
            return Ok((path, false));
        }

        DirBuilder::new()
            .mode(SUBDIR_MODE)
            .create(&path)
            .map_err(|e| WorkspaceError::io_error_at_path(&path, e))?;
        // mkdir mode is filtered by the umask
        fs::set_permissions(&path, Permissions::from_mode(SUBDIR_MODE))
            .map_err(|e| WorkspaceError::io_error_at_path(&path, e))?;
        chown(&path, Some(self.owner.nix_uid()), Some(self.owner.nix_gid()))
            .map_err(|e| WorkspaceError::permission(&path, e))?;

        logger.info(Event::WorkspaceDirCreated, &[("path", &display)]);
        Ok((path, true))
    }

    /// Remove the whole tree, files before their parent directories, root last
    ///
    /// Only call after the database instance has stopped.
    pub fn purge(self, logger: &Logger) -> WorkspaceResult<()> {
        let mut removed: u64 = 0;

        for entry in WalkDir::new(&self.root).contents_first(true) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.root).to_path_buf();
                WorkspaceError::io_error_at_path(&path, e.into())
            })?;

            let path = entry.path();
            let result = if entry.file_type().is_dir() {
                fs::remove_dir(path)
            } else {
                fs::remove_file(path)
            };
            result.map_err(|e| WorkspaceError::io_error_at_path(path, e))?;
            removed += 1;
        }

        logger.info(
            Event::WorkspacePurged,
            &[
                ("entries", &removed.to_string()),
                ("path", &self.root.display().to_string()),
            ],
        );
        Ok(())
    }
}
