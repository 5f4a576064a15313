//! Run configuration
//!
//! Optional JSON file (`--config <path>`). Every field has a default, so an
//! empty object `{}` is a valid configuration. Command-line flags override
//! file values.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::{CliError, CliResult};

/// Executables for the external collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPaths {
    /// Archive-extraction tool (stdin = archive, `-x -C <dir>`)
    #[serde(default = "default_xbstream")]
    pub xbstream: String,

    /// Block-decompression tool (`-d <file> <dir>`)
    #[serde(default = "default_qpress")]
    pub qpress: String,

    /// Log-replay tool (`--apply-log <dir>`)
    #[serde(default = "default_innobackupex")]
    pub innobackupex: String,

    /// Database engine server
    #[serde(default = "default_mysqld")]
    pub mysqld: String,

    /// Logical-dump tool
    #[serde(default = "default_mysqldump")]
    pub mysqldump: String,
}

fn default_xbstream() -> String {
    "xbstream".to_string()
}
fn default_qpress() -> String {
    "qpress".to_string()
}
fn default_innobackupex() -> String {
    "innobackupex".to_string()
}
fn default_mysqld() -> String {
    "mysqld".to_string()
}
fn default_mysqldump() -> String {
    "mysqldump".to_string()
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            xbstream: default_xbstream(),
            qpress: default_qpress(),
            innobackupex: default_innobackupex(),
            mysqld: default_mysqld(),
            mysqldump: default_mysqldump(),
        }
    }
}

/// What to do when dumping one database fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DumpFailurePolicy {
    /// Dump the remaining databases and report failures at the end
    #[default]
    Continue,
    /// Stop dumping at the first failure
    Abort,
}

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// External tool executables
    #[serde(default)]
    pub tools: ToolPaths,

    /// File-name suffix of block-compressed files (default "qp")
    #[serde(default = "default_compressed_suffix")]
    pub compressed_suffix: String,

    /// bzip2 block size for dump output, 1..=9 (default 6)
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    /// Sleep between readiness probes (default 1000ms)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Give up waiting for readiness after this long (default: never)
    #[serde(default)]
    pub ready_timeout_secs: Option<u64>,

    /// Log one warning when startup takes longer than this (default 60s)
    #[serde(default = "default_ready_warn_after_secs")]
    pub ready_warn_after_secs: u64,

    /// Engine open-file-descriptor limit (default 32000)
    #[serde(default = "default_open_files_limit")]
    pub open_files_limit: u64,

    /// Per-database failure policy (default "continue")
    #[serde(default)]
    pub on_dump_failure: DumpFailurePolicy,
}

fn default_compressed_suffix() -> String {
    "qp".to_string()
}
fn default_compression_level() -> u32 {
    6
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_ready_warn_after_secs() -> u64 {
    60
}
fn default_open_files_limit() -> u64 {
    32000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tools: ToolPaths::default(),
            compressed_suffix: default_compressed_suffix(),
            compression_level: default_compression_level(),
            poll_interval_ms: default_poll_interval_ms(),
            ready_timeout_secs: None,
            ready_warn_after_secs: default_ready_warn_after_secs(),
            open_files_limit: default_open_files_limit(),
            on_dump_failure: DumpFailurePolicy::default(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::config_error(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate field ranges
    pub fn validate(&self) -> CliResult<()> {
        if !(1..=9).contains(&self.compression_level) {
            return Err(CliError::config_error(format!(
                "compression_level must be between 1 and 9, got {}",
                self.compression_level
            )));
        }

        if self.poll_interval_ms == 0 {
            return Err(CliError::config_error("poll_interval_ms must be > 0"));
        }

        if self.ready_timeout_secs == Some(0) {
            return Err(CliError::config_error("ready_timeout_secs must be > 0"));
        }

        let suffix = self.compressed_suffix.trim_start_matches('.');
        if suffix.is_empty() || suffix.contains('/') {
            return Err(CliError::config_error(format!(
                "Invalid compressed_suffix: '{}'",
                self.compressed_suffix
            )));
        }

        let tools = [
            ("xbstream", &self.tools.xbstream),
            ("qpress", &self.tools.qpress),
            ("innobackupex", &self.tools.innobackupex),
            ("mysqld", &self.tools.mysqld),
            ("mysqldump", &self.tools.mysqldump),
        ];
        for (name, program) in tools {
            if program.trim().is_empty() {
                return Err(CliError::config_error(format!(
                    "tools.{} must not be empty",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Compressed-file suffix without a leading dot
    pub fn suffix(&self) -> &str {
        self.compressed_suffix.trim_start_matches('.')
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn ready_timeout(&self) -> Option<Duration> {
        self.ready_timeout_secs.map(Duration::from_secs)
    }

    pub fn ready_warn_after(&self) -> Duration {
        Duration::from_secs(self.ready_warn_after_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.tools, ToolPaths::default());
        assert_eq!(config.compressed_suffix, "qp");
        assert_eq!(config.compression_level, 6);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.ready_timeout(), None);
        assert_eq!(config.open_files_limit, 32000);
        assert_eq!(config.on_dump_failure, DumpFailurePolicy::Continue);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_tools_override() {
        let config: Config =
            serde_json::from_str(r#"{"tools":{"mysqld":"/opt/mysql/bin/mysqld"},"on_dump_failure":"abort"}"#)
                .unwrap();
        assert_eq!(config.tools.mysqld, "/opt/mysql/bin/mysqld");
        assert_eq!(config.tools.mysqldump, "mysqldump");
        assert_eq!(config.on_dump_failure, DumpFailurePolicy::Abort);
    }

    #[test]
    fn test_invalid_compression_level() {
        let config = Config {
            compression_level: 10,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            compression_level: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let config = Config {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_suffix_strips_leading_dot() {
        let config = Config {
            compressed_suffix: ".qp".to_string(),
            ..Default::default()
        };
        config.validate().unwrap();
        assert_eq!(config.suffix(), "qp");
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("backup2sql.json");
        fs::write(&path, r#"{"poll_interval_ms": 50, "ready_timeout_secs": 30}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.ready_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(Config::load(&temp.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_load_invalid_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.json");
        fs::write(&path, "not json").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(err.message().contains("Invalid config JSON"));
    }
}
