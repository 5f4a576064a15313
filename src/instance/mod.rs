//! Ephemeral database instance
//!
//! Exactly one throwaway engine process per run, pointed at the recovered
//! data directory:
//!
//! - no network listener, only a private unix control socket
//! - read-only, grant checks bypassed, general/slow query logs off
//! - scratch files in the workspace `tmp/`, socket and pid file in `run/`
//!
//! `start` returns as soon as the process is launched. `wait_ready` polls
//! the control socket, checking before every attempt whether the process
//! has already exited (fatal, never retried). `stop` sends SIGTERM and
//! reaps the process; it is a no-op once the instance has crashed or
//! stopped.

mod connector;
mod errors;
mod state;

pub use connector::{Connector, MySqlConnector, MySqlSession, Session, SessionError};
pub use errors::{InstanceError, InstanceErrorCode, InstanceResult};
pub use state::InstanceState;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tokio::process::Child;

use crate::config::Config;
use crate::identity::Identity;
use crate::observability::{Event, Logger};
use crate::process::ToolCommand;
use crate::workspace::{RUN_DIR, TMP_DIR, Workspace};

const SOCKET_NAME: &str = "mysqld.sock";
const PID_FILE_NAME: &str = "mysqld.pid";

/// Readiness polling parameters
#[derive(Debug, Clone, Copy)]
pub struct ReadyOptions {
    /// Sleep between failed probes
    pub poll_interval: Duration,
    /// Give up after this long; `None` waits for as long as the process lives
    pub timeout: Option<Duration>,
    /// Log a single warning once startup has taken this long
    pub warn_after: Duration,
}

impl ReadyOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            timeout: config.ready_timeout(),
            warn_after: config.ready_warn_after(),
        }
    }
}

/// Handle to the engine process and its control socket
pub struct EphemeralInstance {
    program: String,
    child: Option<Child>,
    data_dir: PathBuf,
    socket_path: PathBuf,
    pid_file: PathBuf,
    state: InstanceState,
}

impl EphemeralInstance {
    /// Launch the engine against the workspace data directory
    ///
    /// Creates the scratch and control directories if missing. Does not
    /// wait for readiness.
    pub fn start(
        config: &Config,
        workspace: &Workspace,
        identity: Identity,
        logger: &Logger,
    ) -> InstanceResult<Self> {
        let (tmp_dir, _) = workspace
            .ensure_subdir(TMP_DIR, logger)
            .map_err(InstanceError::launch)?;
        let (run_dir, _) = workspace
            .ensure_subdir(RUN_DIR, logger)
            .map_err(InstanceError::launch)?;

        let data_dir = workspace.data_dir();
        let socket_path = run_dir.join(SOCKET_NAME);
        let pid_file = run_dir.join(PID_FILE_NAME);

        let command = engine_command(config, identity, &data_dir, &tmp_dir, &socket_path, &pid_file);
        let child = command.spawn().map_err(InstanceError::launch)?;

        let pid = child.id().map(|p| p.to_string()).unwrap_or_default();
        logger.info(
            Event::InstanceLaunched,
            &[
                ("pid", &pid),
                ("socket", &socket_path.display().to_string()),
            ],
        );

        Ok(Self {
            program: command.program_name(),
            child: Some(child),
            data_dir,
            socket_path,
            pid_file,
            state: InstanceState::Starting,
        })
    }

    /// Wrap an already-spawned process as a starting instance
    pub fn from_child(program: impl Into<String>, child: Child, socket_path: PathBuf) -> Self {
        let run_dir = socket_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            program: program.into(),
            child: Some(child),
            data_dir: PathBuf::new(),
            pid_file: run_dir.join(PID_FILE_NAME),
            socket_path,
            state: InstanceState::Starting,
        }
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    fn transition(&mut self, next: InstanceState) {
        debug_assert!(self.state.can_transition_to(next), "{} -> {}", self.state, next);
        self.state = next;
    }

    /// Poll the control socket until the instance accepts a connection
    ///
    /// Fails with `B2S_INSTANCE_CRASHED` as soon as the process is seen to
    /// have exited. With no timeout configured the loop is bounded only by
    /// that check.
    pub async fn wait_ready<C: Connector>(
        &mut self,
        connector: &C,
        options: ReadyOptions,
        logger: &Logger,
    ) -> InstanceResult<C::Session> {
        if self.state != InstanceState::Starting {
            return Err(InstanceError::invalid_state("wait for", self.state));
        }

        let started = Instant::now();
        let mut attempts: u64 = 0;
        let mut warned = false;

        loop {
            let child = match self.child.as_mut() {
                Some(child) => child,
                None => return Err(InstanceError::invalid_state("wait for", self.state)),
            };

            let exited = child
                .try_wait()
                .map_err(|e| InstanceError::io(format!("Failed to poll {}", self.program), e))?;
            if let Some(status) = exited {
                self.child = None;
                self.transition(InstanceState::Crashed);
                logger.event(
                    Event::InstanceCrashed,
                    &[("attempts", &attempts.to_string()), ("status", &status.to_string())],
                );
                return Err(InstanceError::crashed(status));
            }

            attempts += 1;
            match connector.connect(&self.socket_path).await {
                Ok(session) => {
                    self.transition(InstanceState::Ready);
                    logger.info(
                        Event::InstanceReady,
                        &[
                            ("attempts", &attempts.to_string()),
                            ("elapsed_ms", &started.elapsed().as_millis().to_string()),
                        ],
                    );
                    return Ok(session);
                }
                Err(e) => {
                    logger.trace(
                        Event::InstanceProbeFailed,
                        &[("attempt", &attempts.to_string()), ("reason", e.message())],
                    );
                }
            }

            let elapsed = started.elapsed();
            if !warned && elapsed >= options.warn_after {
                warned = true;
                logger.warn(
                    Event::InstanceSlowStart,
                    &[("elapsed_secs", &elapsed.as_secs().to_string())],
                );
            }
            if let Some(limit) = options.timeout {
                if elapsed >= limit {
                    return Err(InstanceError::ready_timeout(limit, attempts));
                }
            }

            tokio::time::sleep(options.poll_interval).await;
        }
    }

    /// Send SIGTERM and wait for the process to exit
    ///
    /// No-op unless the instance is starting or ready.
    pub async fn stop(&mut self, logger: &Logger) -> InstanceResult<()> {
        if !self.state.needs_stop() {
            return Ok(());
        }
        let mut child = match self.child.take() {
            Some(child) => child,
            None => return Ok(()),
        };

        self.transition(InstanceState::Stopping);

        if let Some(pid) = child.id() {
            logger.info(Event::InstanceStopping, &[("pid", &pid.to_string())]);
            match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => {
                    return Err(InstanceError::io(
                        format!("Failed to signal {}", self.program),
                        e.into(),
                    ));
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| InstanceError::io(format!("Failed to reap {}", self.program), e))?;

        self.transition(InstanceState::Stopped);
        logger.info(Event::InstanceStopped, &[("status", &status.to_string())]);
        Ok(())
    }
}

/// Engine command line
fn engine_command(
    config: &Config,
    identity: Identity,
    data_dir: &Path,
    tmp_dir: &Path,
    socket_path: &Path,
    pid_file: &Path,
) -> ToolCommand {
    ToolCommand::new(&config.tools.mysqld).args([
        format!("--pid-file={}", pid_file.display()),
        "--skip-networking".to_string(),
        format!("--user={}", identity.uid()),
        format!("--tmpdir={}", tmp_dir.display()),
        format!("--socket={}", socket_path.display()),
        format!("--datadir={}", data_dir.display()),
        "--general-log=0".to_string(),
        "--read-only".to_string(),
        "--slow-query-log=0".to_string(),
        "--skip-grant-tables".to_string(),
        format!("--open-files-limit={}", config.open_files_limit),
    ])
}
