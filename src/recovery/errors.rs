//! Log replay errors
//!
//! All log replay errors are FATAL: a data directory that failed replay
//! cannot be used to start the engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::process::ToolError;

/// Log replay error
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("[FATAL] B2S_RECOVERY_NO_DATA: data directory {} does not exist", .0.display())]
    MissingDataDir(PathBuf),

    #[error("[FATAL] B2S_RECOVERY_TOOL: log replay failed for {}: {source}", .path.display())]
    Tool {
        path: PathBuf,
        #[source]
        source: ToolError,
    },

    #[error(
        "[FATAL] B2S_RECOVERY_MARKER: failed to record completed replay at {}: {source}",
        .path.display()
    )]
    Marker {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RecoveryError {
    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            RecoveryError::MissingDataDir(_) => "B2S_RECOVERY_NO_DATA",
            RecoveryError::Tool { .. } => "B2S_RECOVERY_TOOL",
            RecoveryError::Marker { .. } => "B2S_RECOVERY_MARKER",
        }
    }

    /// Whether the external replay tool is to blame
    pub fn is_tool_failure(&self) -> bool {
        matches!(self, RecoveryError::Tool { .. })
    }
}

/// Result type for log replay
pub type RecoveryResult<T> = Result<T, RecoveryError>;
