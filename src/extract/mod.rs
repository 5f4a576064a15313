//! Archive extraction
//!
//! 1. Stream the backup archive through the archive-extraction tool into
//!    `<workspace>/mysql`, running the tool as the run identity.
//! 2. Walk the extracted tree and decompress every block-compressed file
//!    in place, deleting each compressed file once it has been expanded.
//!
//! Both steps are safe to re-run: extraction is skipped when the data
//! directory already exists, and decompressed files no longer carry the
//! compressed suffix.

mod errors;

pub use errors::{ExtractError, ExtractErrorCode, ExtractResult};

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Config;
use crate::identity::Identity;
use crate::observability::{Event, Logger};
use crate::process::ToolCommand;
use crate::workspace::{DATA_DIR, Workspace};

/// File-creation mask for decompressed files
const DECOMPRESS_UMASK: u32 = 0o077;

/// Drives the archive-extraction and block-decompression tools
#[derive(Debug, Clone)]
pub struct ArchiveExtractor {
    extract_tool: String,
    decompress_tool: String,
    suffix: String,
}

impl ArchiveExtractor {
    pub fn new(config: &Config) -> Self {
        Self {
            extract_tool: config.tools.xbstream.clone(),
            decompress_tool: config.tools.qpress.clone(),
            suffix: config.suffix().to_string(),
        }
    }

    /// Extract `source` into the workspace data directory
    ///
    /// Returns `true` (already done) without doing any work when the data
    /// directory already exists.
    pub async fn extract(
        &self,
        source: &Path,
        workspace: &Workspace,
        identity: Identity,
        logger: &Logger,
    ) -> ExtractResult<bool> {
        let target = workspace.data_dir();
        if target.exists() {
            logger.warn(
                Event::ExtractSkipped,
                &[("path", &target.display().to_string())],
            );
            return Ok(true);
        }

        // Open before creating the target so a bad source leaves no marker
        let input = File::open(source).map_err(|e| ExtractError::source_unreadable(source, e))?;

        let (target, _) = workspace.ensure_subdir(DATA_DIR, logger)?;

        ToolCommand::new(&self.extract_tool)
            .arg("-x")
            .arg("-C")
            .arg(&target)
            .run_as(identity)
            .run_with_stdin(input)
            .await
            .map_err(|e| ExtractError::tool(source, e))?;

        Ok(false)
    }

    /// Decompress every block-compressed file under `target_dir`
    ///
    /// Returns the number of files decompressed by this call.
    pub async fn decompress_all(
        &self,
        target_dir: &Path,
        identity: Identity,
        logger: &Logger,
    ) -> ExtractResult<usize> {
        let files = self.compressed_files(target_dir)?;

        for file in &files {
            let dir = file.parent().unwrap_or(target_dir);

            ToolCommand::new(&self.decompress_tool)
                .arg("-d")
                .arg(file)
                .arg(dir)
                .run_as(identity)
                .umask(DECOMPRESS_UMASK)
                .run()
                .await
                .map_err(|e| ExtractError::decompress(file, e))?;

            fs::remove_file(file).map_err(|e| ExtractError::io_error_at_path(file, e))?;

            logger.trace(
                Event::DecompressFile,
                &[("path", &file.display().to_string())],
            );
        }

        Ok(files.len())
    }

    /// Regular files under `target_dir` whose name ends in `.<suffix>`
    fn compressed_files(&self, target_dir: &Path) -> ExtractResult<Vec<PathBuf>> {
        let extension = format!(".{}", self.suffix);
        let mut files = Vec::new();

        for entry in WalkDir::new(target_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(target_dir).to_path_buf();
                ExtractError::io_error_at_path(&path, e.into())
            })?;

            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if name.len() > extension.len() && name.ends_with(&extension) {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }
}
