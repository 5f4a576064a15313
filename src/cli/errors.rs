//! CLI-specific error types
//!
//! Every fatal path ends here; the code decides the process exit status.

use std::fmt;
use std::io;

use crate::pipeline::{FailureKind, PipelineError};

/// CLI error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Bad configuration, arguments or identity
    ConfigError,
    /// An external tool failed
    ToolFailed,
    /// The database instance never became ready
    InstanceNotReady,
    /// At least one database could not be dumped
    DumpFailed,
    /// I/O error
    IoError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "B2S_CLI_CONFIG_ERROR",
            Self::ToolFailed => "B2S_CLI_TOOL_FAILED",
            Self::InstanceNotReady => "B2S_CLI_INSTANCE_NOT_READY",
            Self::DumpFailed => "B2S_CLI_DUMP_FAILED",
            Self::IoError => "B2S_CLI_IO_ERROR",
        }
    }

    /// Process exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigError => 2,
            Self::ToolFailed => 3,
            Self::InstanceNotReady => 4,
            Self::DumpFailed => 5,
            Self::IoError => 1,
        }
    }
}

impl From<FailureKind> for CliErrorCode {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::Configuration => Self::ConfigError,
            FailureKind::Tool => Self::ToolFailed,
            FailureKind::Readiness => Self::InstanceNotReady,
            FailureKind::Dump => Self::DumpFailed,
            FailureKind::Io => Self::IoError,
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Some databases were not dumped
    pub fn dump_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::DumpFailed, msg)
    }

    /// Get the error code
    pub fn code(&self) -> CliErrorCode {
        self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        self.code.exit_code()
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<PipelineError> for CliError {
    fn from(e: PipelineError) -> Self {
        Self::new(e.kind().into(), e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_exit_codes_are_distinct() {
        let codes = [
            CliErrorCode::ConfigError,
            CliErrorCode::ToolFailed,
            CliErrorCode::InstanceNotReady,
            CliErrorCode::DumpFailed,
            CliErrorCode::IoError,
        ];
        let mut exits: Vec<i32> = codes.iter().map(|c| c.exit_code()).collect();
        exits.sort();
        exits.dedup();
        assert_eq!(exits.len(), codes.len());
        assert!(!exits.contains(&0));
    }

    #[test]
    fn test_pipeline_error_mapping() {
        let err = CliError::from(PipelineError::SourceMissing(PathBuf::from("/x")));
        assert_eq!(err.code(), CliErrorCode::ConfigError);
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("B2S_SOURCE_MISSING"));
    }

    #[test]
    fn test_display() {
        let err = CliError::dump_failed("1 database(s) failed");
        assert_eq!(err.to_string(), "B2S_CLI_DUMP_FAILED: 1 database(s) failed");
    }
}
