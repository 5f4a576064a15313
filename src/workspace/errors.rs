//! Workspace errors
//!
//! OS-level failures (permission denied, disk full) are FATAL and are not
//! retried.

use std::fmt;
use std::io;
use std::path::Path;

/// Workspace error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceErrorCode {
    /// Explicit `--tmpdir` does not exist or is not a directory
    B2sWorkspaceMissing,
    /// Filesystem operation failed
    B2sWorkspaceIo,
    /// Ownership or permission change failed
    B2sWorkspacePermission,
}

impl WorkspaceErrorCode {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceErrorCode::B2sWorkspaceMissing => "B2S_WORKSPACE_MISSING",
            WorkspaceErrorCode::B2sWorkspaceIo => "B2S_WORKSPACE_IO",
            WorkspaceErrorCode::B2sWorkspacePermission => "B2S_WORKSPACE_PERMISSION",
        }
    }
}

impl fmt::Display for WorkspaceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Workspace error with context
#[derive(Debug)]
pub struct WorkspaceError {
    code: WorkspaceErrorCode,
    message: String,
    source: Option<io::Error>,
}

impl WorkspaceError {
    fn new(code: WorkspaceErrorCode, message: impl Into<String>, source: Option<io::Error>) -> Self {
        Self {
            code,
            message: message.into(),
            source,
        }
    }

    /// Explicit workspace root is missing
    pub fn missing(path: &Path) -> Self {
        Self::new(
            WorkspaceErrorCode::B2sWorkspaceMissing,
            format!("{} tmpdir does not exist", path.display()),
            None,
        )
    }

    /// I/O failure at a path
    pub fn io_error_at_path(path: &Path, source: io::Error) -> Self {
        Self::new(
            WorkspaceErrorCode::B2sWorkspaceIo,
            format!("I/O error at {}", path.display()),
            Some(source),
        )
    }

    /// chown/chmod failure at a path
    pub fn permission(path: &Path, reason: impl fmt::Display) -> Self {
        Self::new(
            WorkspaceErrorCode::B2sWorkspacePermission,
            format!("Failed to set ownership of {}: {}", path.display(), reason),
            None,
        )
    }

    /// Returns the error code
    pub fn code(&self) -> WorkspaceErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Configuration errors are detected before any process is launched
    pub fn is_configuration(&self) -> bool {
        self.code == WorkspaceErrorCode::B2sWorkspaceMissing
    }
}

impl fmt::Display for WorkspaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[FATAL] {}: {}", self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for WorkspaceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for workspace operations
pub type WorkspaceResult<T> = Result<T, WorkspaceError>;
