//! Run-level errors
//!
//! Every stage error is wrapped unchanged; `kind()` sorts them into the
//! failure taxonomy the command line maps onto exit codes.

use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::extract::{ExtractError, ExtractErrorCode};
use crate::identity::IdentityError;
use crate::instance::{InstanceError, InstanceErrorCode};
use crate::recovery::RecoveryError;
use crate::workspace::WorkspaceError;

/// Failure category of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Bad input detected before any external process ran
    Configuration,
    /// An external tool failed or could not be launched
    Tool,
    /// The instance crashed or never became ready
    Readiness,
    /// One or more databases could not be dumped
    Dump,
    /// Any other OS-level failure
    Io,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Configuration => "configuration",
            FailureKind::Tool => "tool",
            FailureKind::Readiness => "readiness",
            FailureKind::Dump => "dump",
            FailureKind::Io => "io",
        }
    }
}

/// Fatal run error
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("[FATAL] B2S_SOURCE_MISSING: backup archive {} does not exist", .0.display())]
    SourceMissing(PathBuf),

    #[error("[FATAL] B2S_OUTDIR_MISSING: output directory {} does not exist", .0.display())]
    OutdirMissing(PathBuf),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Recovery(#[from] RecoveryError),

    #[error(transparent)]
    Instance(#[from] InstanceError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl PipelineError {
    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::SourceMissing(_) => "B2S_SOURCE_MISSING",
            PipelineError::OutdirMissing(_) => "B2S_OUTDIR_MISSING",
            PipelineError::Identity(e) => e.code().as_str(),
            PipelineError::Workspace(e) => e.code().as_str(),
            PipelineError::Extract(e) => e.code().as_str(),
            PipelineError::Recovery(e) => e.code(),
            PipelineError::Instance(e) => e.code().as_str(),
            PipelineError::Catalog(e) => e.code(),
        }
    }

    /// Failure category
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::SourceMissing(_)
            | PipelineError::OutdirMissing(_)
            | PipelineError::Identity(_) => FailureKind::Configuration,

            PipelineError::Workspace(e) if e.is_configuration() => FailureKind::Configuration,
            PipelineError::Workspace(_) => FailureKind::Io,

            PipelineError::Extract(e) if e.is_tool_failure() => FailureKind::Tool,
            PipelineError::Extract(e) if e.code() == ExtractErrorCode::B2sExtractSource => {
                FailureKind::Configuration
            }
            PipelineError::Extract(_) => FailureKind::Io,

            PipelineError::Recovery(e) if e.is_tool_failure() => FailureKind::Tool,
            PipelineError::Recovery(_) => FailureKind::Io,

            PipelineError::Instance(e) if e.is_readiness_failure() => FailureKind::Readiness,
            PipelineError::Instance(e) if e.code() == InstanceErrorCode::B2sInstanceLaunch => {
                FailureKind::Tool
            }
            PipelineError::Instance(_) => FailureKind::Io,

            PipelineError::Catalog(CatalogError::InvalidPattern { .. }) => {
                FailureKind::Configuration
            }
            PipelineError::Catalog(CatalogError::Query(_)) => FailureKind::Tool,
            PipelineError::Catalog(_) => FailureKind::Dump,
        }
    }
}

/// Result type for a run
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::process::ExitStatus;
    use std::os::unix::process::ExitStatusExt;

    #[test]
    fn test_configuration_failures() {
        let missing = PipelineError::SourceMissing(PathBuf::from("/nope.xbstream"));
        assert_eq!(missing.kind(), FailureKind::Configuration);
        assert_eq!(missing.code(), "B2S_SOURCE_MISSING");
        assert!(missing.to_string().contains("/nope.xbstream"));

        let user = PipelineError::from(IdentityError::user_required());
        assert_eq!(user.kind(), FailureKind::Configuration);

        let tmpdir = PipelineError::from(WorkspaceError::missing(Path::new("/no/such/dir")));
        assert_eq!(tmpdir.kind(), FailureKind::Configuration);

        let pattern = PipelineError::from(CatalogError::InvalidPattern {
            pattern: "[".to_string(),
            reason: "unclosed".to_string(),
        });
        assert_eq!(pattern.kind(), FailureKind::Configuration);
    }

    #[test]
    fn test_readiness_failure() {
        let crashed = PipelineError::from(InstanceError::crashed(ExitStatus::from_raw(1 << 8)));
        assert_eq!(crashed.kind(), FailureKind::Readiness);
        assert_eq!(crashed.code(), "B2S_INSTANCE_CRASHED");
    }

    #[test]
    fn test_wrapped_display_is_unchanged() {
        let inner = IdentityError::unknown_user("mysql");
        let text = inner.to_string();
        assert_eq!(PipelineError::from(inner).to_string(), text);
    }
}
