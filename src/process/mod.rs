//! External tool launching
//!
//! Every external collaborator (archive extraction, block decompression,
//! log replay, the engine itself, the dump tool) is started through
//! `ToolCommand`. Running a child as another OS identity is a first-class
//! option rather than an inline pre-exec closure:
//!
//! - the group id is set before the user id, since dropping the user id
//!   first removes the right to change the group id
//! - supplementary groups are cleared when dropping from root
//! - an optional file-creation mask is applied in the child before exec
//!
//! The identity is only applied when the controlling process is
//! privileged; otherwise the child already runs as the resolved identity.

use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{ExitStatus, Stdio};

use nix::sys::stat::{Mode, umask};
use thiserror::Error;
use tokio::process::{Child, Command};

use crate::identity::Identity;

/// Failure to run an external tool
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with status {code}")]
    ExitStatus { program: String, code: i32 },

    #[error("{program} terminated by signal {signal}")]
    Signaled { program: String, signal: i32 },

    #[error("I/O error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl ToolError {
    /// Map a finished process status; `Ok(())` on success
    pub fn check_status(program: &str, status: ExitStatus) -> Result<(), ToolError> {
        if status.success() {
            return Ok(());
        }
        match (status.code(), status.signal()) {
            (Some(code), _) => Err(ToolError::ExitStatus {
                program: program.to_string(),
                code,
            }),
            (None, Some(signal)) => Err(ToolError::Signaled {
                program: program.to_string(),
                signal,
            }),
            (None, None) => Err(ToolError::ExitStatus {
                program: program.to_string(),
                code: -1,
            }),
        }
    }

    pub fn program(&self) -> &str {
        match self {
            ToolError::Spawn { program, .. }
            | ToolError::ExitStatus { program, .. }
            | ToolError::Signaled { program, .. }
            | ToolError::Io { program, .. } => program,
        }
    }
}

/// Result type for tool invocations
pub type ToolResult<T> = Result<T, ToolError>;

/// Builder for an external tool invocation
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: OsString,
    args: Vec<OsString>,
    run_as: Option<Identity>,
    umask: Option<u32>,
}

impl ToolCommand {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            run_as: None,
            umask: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Run the child under `identity`
    pub fn run_as(mut self, identity: Identity) -> Self {
        self.run_as = Some(identity);
        self
    }

    /// Set the child's file-creation mask
    pub fn umask(mut self, mask: u32) -> Self {
        self.umask = Some(mask);
        self
    }

    /// Program name for diagnostics
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    pub fn arg_list(&self) -> &[OsString] {
        &self.args
    }

    fn build(&self) -> Command {
        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(identity) = self.run_as.filter(|id| id.is_privileged()) {
            // std applies gid, then clears supplementary groups, then uid
            cmd.gid(identity.gid());
            cmd.uid(identity.uid());
        }

        if let Some(mask) = self.umask {
            let mode = Mode::from_bits_truncate(mask as nix::libc::mode_t);
            // SAFETY: umask(2) is async-signal-safe and touches no memory
            // shared with the parent.
            unsafe {
                cmd.pre_exec(move || {
                    umask(mode);
                    Ok(())
                });
            }
        }

        let mut cmd = Command::from(cmd);
        cmd.kill_on_drop(false);
        cmd
    }

    fn spawn_with(&self, stdin: Stdio, stdout: Stdio) -> ToolResult<Child> {
        self.build()
            .stdin(stdin)
            .stdout(stdout)
            .spawn()
            .map_err(|source| ToolError::Spawn {
                program: self.program_name(),
                source,
            })
    }

    /// Spawn and wait; non-zero exit is an error
    pub async fn run(&self) -> ToolResult<()> {
        let child = self.spawn_with(Stdio::null(), Stdio::inherit())?;
        self.wait(child).await
    }

    /// Spawn with `input` as standard input and wait
    pub async fn run_with_stdin(&self, input: File) -> ToolResult<()> {
        let child = self.spawn_with(Stdio::from(input), Stdio::inherit())?;
        self.wait(child).await
    }

    /// Spawn without waiting
    pub fn spawn(&self) -> ToolResult<Child> {
        self.spawn_with(Stdio::null(), Stdio::inherit())
    }

    /// Spawn with standard output captured through a pipe
    pub fn spawn_piped_stdout(&self) -> ToolResult<Child> {
        self.spawn_with(Stdio::null(), Stdio::piped())
    }

    /// Wait for a child spawned from this command
    pub async fn wait(&self, mut child: Child) -> ToolResult<()> {
        let status = child.wait().await.map_err(|source| ToolError::Io {
            program: self.program_name(),
            source,
        })?;
        ToolError::check_status(&self.program_name(), status)
    }
}
