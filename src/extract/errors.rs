//! Extraction errors
//!
//! A failed extraction or decompression leaves an inconsistent data
//! directory that cannot feed log replay, so every error here is FATAL.

use std::fmt;
use std::io;
use std::path::Path;

use crate::process::ToolError;
use crate::workspace::WorkspaceError;

/// Extraction error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractErrorCode {
    /// Input archive missing or unreadable
    B2sExtractSource,
    /// Archive-extraction tool failed
    B2sExtractTool,
    /// Block-decompression tool failed
    B2sExtractDecompress,
    /// Filesystem failure while walking or cleaning the data directory
    B2sExtractIo,
}

impl ExtractErrorCode {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractErrorCode::B2sExtractSource => "B2S_EXTRACT_SOURCE",
            ExtractErrorCode::B2sExtractTool => "B2S_EXTRACT_TOOL",
            ExtractErrorCode::B2sExtractDecompress => "B2S_EXTRACT_DECOMPRESS",
            ExtractErrorCode::B2sExtractIo => "B2S_EXTRACT_IO",
        }
    }
}

impl fmt::Display for ExtractErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug)]
enum Cause {
    Io(io::Error),
    Tool(ToolError),
    Workspace(WorkspaceError),
}

/// Extraction error with context
#[derive(Debug)]
pub struct ExtractError {
    code: ExtractErrorCode,
    message: String,
    source: Option<Cause>,
}

impl ExtractError {
    fn new(code: ExtractErrorCode, message: impl Into<String>, source: Option<Cause>) -> Self {
        Self {
            code,
            message: message.into(),
            source,
        }
    }

    /// The archive could not be opened
    pub fn source_unreadable(path: &Path, source: io::Error) -> Self {
        Self::new(
            ExtractErrorCode::B2sExtractSource,
            format!("Failed to open backup archive: {}", path.display()),
            Some(Cause::Io(source)),
        )
    }

    /// The archive-extraction tool failed
    pub fn tool(path: &Path, source: ToolError) -> Self {
        Self::new(
            ExtractErrorCode::B2sExtractTool,
            format!("Failed to extract backup archive: {}", path.display()),
            Some(Cause::Tool(source)),
        )
    }

    /// The block-decompression tool failed on one file
    pub fn decompress(path: &Path, source: ToolError) -> Self {
        Self::new(
            ExtractErrorCode::B2sExtractDecompress,
            format!("Failed to decompress {}", path.display()),
            Some(Cause::Tool(source)),
        )
    }

    /// I/O failure at a path
    pub fn io_error_at_path(path: &Path, source: io::Error) -> Self {
        Self::new(
            ExtractErrorCode::B2sExtractIo,
            format!("I/O error at {}", path.display()),
            Some(Cause::Io(source)),
        )
    }

    /// Returns the error code
    pub fn code(&self) -> ExtractErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether an external tool is to blame
    pub fn is_tool_failure(&self) -> bool {
        matches!(self.source, Some(Cause::Tool(_)))
    }
}

impl From<WorkspaceError> for ExtractError {
    fn from(err: WorkspaceError) -> Self {
        Self::new(
            ExtractErrorCode::B2sExtractIo,
            "Failed to prepare data directory",
            Some(Cause::Workspace(err)),
        )
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[FATAL] {}: {}", self.code, self.message)?;
        match &self.source {
            Some(Cause::Io(e)) => write!(f, " (caused by: {})", e),
            Some(Cause::Tool(e)) => write!(f, " (caused by: {})", e),
            Some(Cause::Workspace(e)) => write!(f, " (caused by: {})", e),
            None => Ok(()),
        }
    }
}

impl std::error::Error for ExtractError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.source {
            Some(Cause::Io(e)) => Some(e),
            Some(Cause::Tool(e)) => Some(e),
            Some(Cause::Workspace(e)) => Some(e),
            None => None,
        }
    }
}

/// Result type for extraction
pub type ExtractResult<T> = Result<T, ExtractError>;
