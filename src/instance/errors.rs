//! Instance manager errors

use std::error::Error as StdError;
use std::fmt;
use std::process::ExitStatus;
use std::time::Duration;

use super::state::InstanceState;

/// Instance error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceErrorCode {
    /// Engine binary could not be launched
    B2sInstanceLaunch,
    /// Engine exited before accepting connections
    B2sInstanceCrashed,
    /// Readiness wait exceeded the configured limit
    B2sInstanceTimeout,
    /// Operation not allowed in the current state
    B2sInstanceState,
    /// Signalling or reaping the engine process failed
    B2sInstanceIo,
}

impl InstanceErrorCode {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceErrorCode::B2sInstanceLaunch => "B2S_INSTANCE_LAUNCH",
            InstanceErrorCode::B2sInstanceCrashed => "B2S_INSTANCE_CRASHED",
            InstanceErrorCode::B2sInstanceTimeout => "B2S_INSTANCE_TIMEOUT",
            InstanceErrorCode::B2sInstanceState => "B2S_INSTANCE_STATE",
            InstanceErrorCode::B2sInstanceIo => "B2S_INSTANCE_IO",
        }
    }
}

impl fmt::Display for InstanceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Instance error with context
#[derive(Debug)]
pub struct InstanceError {
    code: InstanceErrorCode,
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl InstanceError {
    fn new(
        code: InstanceErrorCode,
        message: impl Into<String>,
        source: Option<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source,
        }
    }

    /// The engine could not be launched
    pub fn launch(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::new(
            InstanceErrorCode::B2sInstanceLaunch,
            "Failed to start database instance",
            Some(Box::new(source)),
        )
    }

    /// The engine exited while starting
    pub fn crashed(status: ExitStatus) -> Self {
        Self::new(
            InstanceErrorCode::B2sInstanceCrashed,
            format!("Database instance unexpectedly finished ({})", status),
            None,
        )
    }

    /// The engine did not become ready in time
    pub fn ready_timeout(limit: Duration, attempts: u64) -> Self {
        Self::new(
            InstanceErrorCode::B2sInstanceTimeout,
            format!(
                "Database instance not ready after {}s ({} connection attempts)",
                limit.as_secs(),
                attempts
            ),
            None,
        )
    }

    /// Operation attempted in the wrong state
    pub fn invalid_state(operation: &str, state: InstanceState) -> Self {
        Self::new(
            InstanceErrorCode::B2sInstanceState,
            format!("Cannot {} instance in state {}", operation, state),
            None,
        )
    }

    /// Process-level I/O failure
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::new(InstanceErrorCode::B2sInstanceIo, message, Some(Box::new(source)))
    }

    /// Returns the error code
    pub fn code(&self) -> InstanceErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the run failed because the instance never became ready
    pub fn is_readiness_failure(&self) -> bool {
        matches!(
            self.code,
            InstanceErrorCode::B2sInstanceCrashed | InstanceErrorCode::B2sInstanceTimeout
        )
    }
}

impl fmt::Display for InstanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[FATAL] {}: {}", self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl StdError for InstanceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Result type for instance operations
pub type InstanceResult<T> = Result<T, InstanceError>;
