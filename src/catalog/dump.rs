//! Logical dump of one database to a bzip2 file
//!
//! The dump tool's standard output is streamed through a bzip2 encoder into
//! `<outdir>/<database>.sql.bz2`. A failed dump removes its partial output.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bzip2::Compression;
use bzip2::write::BzEncoder;
use tokio::io::AsyncReadExt;
use tokio::process::ChildStdout;
use tokio::sync::mpsc;

use super::errors::{CatalogError, CatalogResult};
use crate::config::Config;
use crate::process::ToolCommand;

/// Output file extension after `.sql`
pub const OUTPUT_EXTENSION: &str = "bz2";

const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks buffered between the reader and the blocking encoder
const WRITE_QUEUE: usize = 8;

/// Drives the logical-dump tool
#[derive(Debug, Clone)]
pub struct Dumper {
    tool: String,
    level: u32,
}

impl Dumper {
    pub fn new(config: &Config) -> Self {
        Self {
            tool: config.tools.mysqldump.clone(),
            level: config.compression_level,
        }
    }

    /// `<outdir>/<database>.sql.bz2`
    ///
    /// Names come from the restored catalog, so anything that would not
    /// stay a single file directly under `outdir` is rejected.
    pub fn output_path(outdir: &Path, database: &str) -> CatalogResult<PathBuf> {
        let unsafe_name = database.is_empty()
            || database == "."
            || database == ".."
            || database.contains(std::path::MAIN_SEPARATOR)
            || database.contains('\0')
            || Path::new(database).is_absolute();

        if unsafe_name {
            return Err(CatalogError::UnsafeName {
                database: database.to_string(),
            });
        }

        Ok(outdir.join(format!("{}.sql.{}", database, OUTPUT_EXTENSION)))
    }

    fn command(&self, socket: &Path, database: &str) -> ToolCommand {
        ToolCommand::new(&self.tool)
            .arg("-S")
            .arg(socket)
            .arg("--skip-lock-tables")
            .arg("--add-drop-table")
            .arg(database)
    }

    /// Dump `database` from the instance at `socket` into `output`
    ///
    /// Returns the number of uncompressed bytes written.
    pub async fn dump(&self, socket: &Path, database: &str, output: &Path) -> CatalogResult<u64> {
        let command = self.command(socket, database);

        let mut child = command
            .spawn_piped_stdout()
            .map_err(|source| CatalogError::DumpTool {
                database: database.to_string(),
                source,
            })?;

        let streamed = match child.stdout.take() {
            Some(stdout) => self.stream(stdout, output).await,
            None => Err(io::Error::other("dump tool stdout was not captured")),
        };

        let bytes = match streamed {
            Ok(bytes) => bytes,
            Err(source) => {
                let _ = child.kill().await;
                let _ = fs::remove_file(output);
                return Err(CatalogError::DumpOutput {
                    database: database.to_string(),
                    path: output.to_path_buf(),
                    source,
                });
            }
        };

        if let Err(source) = command.wait(child).await {
            let _ = fs::remove_file(output);
            return Err(CatalogError::DumpTool {
                database: database.to_string(),
                source,
            });
        }

        Ok(bytes)
    }

    /// Read the tool's stdout here; compress and write on a blocking thread
    async fn stream(&self, mut stdout: ChildStdout, output: &Path) -> io::Result<u64> {
        let (tx, rx) = mpsc::channel::<Vec<u8>>(WRITE_QUEUE);
        let path = output.to_path_buf();
        let level = self.level;
        let writer = tokio::task::spawn_blocking(move || write_compressed(&path, level, rx));

        let mut total: u64 = 0;
        let read = loop {
            let mut buf = vec![0u8; CHUNK_SIZE];
            let n = match stdout.read(&mut buf).await {
                Ok(n) => n,
                Err(e) => break Err(e),
            };
            if n == 0 {
                break Ok(());
            }
            buf.truncate(n);
            total += n as u64;
            // writer gone: its own error is reported below
            if tx.send(buf).await.is_err() {
                break Ok(());
            }
        };
        drop(tx);

        writer.await.map_err(io::Error::other)??;
        read?;
        Ok(total)
    }
}

fn write_compressed(output: &Path, level: u32, mut chunks: mpsc::Receiver<Vec<u8>>) -> io::Result<()> {
    let file = File::create(output)?;
    let mut encoder = BzEncoder::new(file, Compression::new(level));

    while let Some(chunk) = chunks.blocking_recv() {
        encoder.write_all(&chunk)?;
    }

    encoder.finish()?.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzip2::read::BzDecoder;
    use std::io::Read;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn fake_dump_tool(dir: &Path, body: &str) -> Dumper {
        let path = dir.join("mysqldump");
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = Config::default();
        config.tools.mysqldump = path.display().to_string();
        Dumper::new(&config)
    }

    fn bunzip(path: &Path) -> String {
        let mut out = String::new();
        BzDecoder::new(File::open(path).unwrap())
            .read_to_string(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            Dumper::output_path(Path::new("/out"), "app_db").unwrap(),
            PathBuf::from("/out/app_db.sql.bz2")
        );
        assert_eq!(
            Dumper::output_path(Path::new("/out"), "..data").unwrap(),
            PathBuf::from("/out/..data.sql.bz2")
        );
    }

    fn rejected(database: &str) -> bool {
        match Dumper::output_path(Path::new("/out"), database) {
            Err(e) => e.code() == "B2S_DUMP_OUTPUT" && e.is_per_database(),
            Ok(_) => false,
        }
    }

    #[test]
    fn test_output_path_rejects_parent_traversal() {
        assert!(rejected(".."));
        assert!(rejected("../etc/evil"));
    }

    #[test]
    fn test_output_path_rejects_absolute_name() {
        assert!(rejected("/etc/cron.d/evil"));
    }

    #[test]
    fn test_output_path_rejects_separator() {
        assert!(rejected("nested/db"));
    }

    #[test]
    fn test_output_path_rejects_current_dir_and_empty() {
        assert!(rejected("."));
        assert!(rejected(""));
    }

    #[test]
    fn test_command_arguments() {
        let dumper = Dumper::new(&Config::default());
        let cmd = dumper.command(Path::new("/ws/run/mysqld.sock"), "app_db");
        let args: Vec<_> = cmd
            .arg_list()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            ["-S", "/ws/run/mysqld.sock", "--skip-lock-tables", "--add-drop-table", "app_db"]
        );
    }

    #[tokio::test]
    async fn test_dump_streams_compressed_output() {
        let temp = TempDir::new().unwrap();
        let dumper = fake_dump_tool(temp.path(), r#"echo "-- socket $2"; echo "-- database $5""#);
        let output = Dumper::output_path(temp.path(), "app_db").unwrap();

        let bytes = dumper
            .dump(Path::new("/ws/run/mysqld.sock"), "app_db", &output)
            .await
            .unwrap();

        let text = bunzip(&output);
        assert_eq!(text, "-- socket /ws/run/mysqld.sock\n-- database app_db\n");
        assert_eq!(bytes, text.len() as u64);
    }

    #[tokio::test]
    async fn test_dump_large_output() {
        let temp = TempDir::new().unwrap();
        let dumper = fake_dump_tool(temp.path(), "i=0; while [ $i -lt 5000 ]; do echo \"INSERT INTO t VALUES ($i);\"; i=$((i+1)); done");
        let output = Dumper::output_path(temp.path(), "big").unwrap();

        dumper.dump(Path::new("/sock"), "big", &output).await.unwrap();

        let text = bunzip(&output);
        assert_eq!(text.lines().count(), 5000);
        assert!(text.ends_with("INSERT INTO t VALUES (4999);\n"));
    }

    #[tokio::test]
    async fn test_failed_dump_removes_partial_output() {
        let temp = TempDir::new().unwrap();
        let dumper = fake_dump_tool(temp.path(), "echo partial; exit 2");
        let output = Dumper::output_path(temp.path(), "broken").unwrap();

        let err = dumper.dump(Path::new("/sock"), "broken", &output).await.unwrap_err();

        assert_eq!(err.code(), "B2S_DUMP_TOOL");
        assert!(err.is_per_database());
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_unwritable_output() {
        let temp = TempDir::new().unwrap();
        let dumper = fake_dump_tool(temp.path(), "echo data");
        let output = temp.path().join("missing-dir").join("x.sql.bz2");

        let err = dumper.dump(Path::new("/sock"), "x", &output).await.unwrap_err();
        assert_eq!(err.code(), "B2S_DUMP_OUTPUT");
    }
}
