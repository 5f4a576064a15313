//! Catalog and dump errors

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::instance::SessionError;
use crate::process::ToolError;

/// Catalog query or dump failure
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("[FATAL] B2S_CATALOG_QUERY: failed to list databases: {0}")]
    Query(#[source] SessionError),

    #[error("[FATAL] B2S_CATALOG_PATTERN: invalid database pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("[ERROR] B2S_DUMP_TOOL: dump of '{database}' failed: {source}")]
    DumpTool {
        database: String,
        #[source]
        source: ToolError,
    },

    #[error("[ERROR] B2S_DUMP_OUTPUT: database name '{database}' is not a plain file name")]
    UnsafeName { database: String },

    #[error(
        "[ERROR] B2S_DUMP_OUTPUT: writing {} for '{database}' failed: {source}",
        .path.display()
    )]
    DumpOutput {
        database: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CatalogError {
    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::Query(_) => "B2S_CATALOG_QUERY",
            CatalogError::InvalidPattern { .. } => "B2S_CATALOG_PATTERN",
            CatalogError::DumpTool { .. } => "B2S_DUMP_TOOL",
            CatalogError::UnsafeName { .. } | CatalogError::DumpOutput { .. } => "B2S_DUMP_OUTPUT",
        }
    }

    /// Whether this failure is scoped to one database
    pub fn is_per_database(&self) -> bool {
        matches!(
            self,
            CatalogError::DumpTool { .. }
                | CatalogError::UnsafeName { .. }
                | CatalogError::DumpOutput { .. }
        )
    }
}

/// Result type for catalog and dump operations
pub type CatalogResult<T> = Result<T, CatalogError>;
