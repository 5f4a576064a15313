//! Observable point events
//!
//! Stage boundaries (`<STAGE>_BEGIN` / `<STAGE>_COMPLETE`) are logged by
//! `ObservationScope`; everything else that can happen during a run is
//! listed here.

use std::fmt;

/// Observable events during a conversion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Run lifecycle
    /// Run begins
    RunStart,
    /// Run finished, every selected database dumped
    RunComplete,
    /// Run aborted on a fatal error
    RunFailed,
    /// Configuration file loaded
    ConfigLoaded,

    // Identity
    /// Controlling process has elevated privilege
    RunningPrivileged,
    /// Effective uid/gid for child processes decided
    IdentityResolved,

    // Workspace
    /// Workspace root validated or allocated
    WorkspaceReady,
    /// Workspace subdirectory created
    WorkspaceDirCreated,
    /// Workspace subdirectory already present
    WorkspaceDirExists,
    /// Workspace removed after the run
    WorkspacePurged,
    /// Workspace left on disk after the run
    WorkspaceRetained,

    // Extraction
    /// Data directory already present, extraction skipped
    ExtractSkipped,
    /// One block-compressed file decompressed
    DecompressFile,

    // Log replay
    /// Replay marker present, log replay skipped
    LogReplaySkipped,

    // Instance
    /// Engine process launched
    InstanceLaunched,
    /// Readiness probe failed, will retry
    InstanceProbeFailed,
    /// Instance has been starting for longer than expected
    InstanceSlowStart,
    /// Instance accepts connections
    InstanceReady,
    /// Engine process exited before becoming ready
    InstanceCrashed,
    /// Termination signal sent
    InstanceStopping,
    /// Engine process exited after stop
    InstanceStopped,

    // Catalog and dump
    /// Database names read from the instance
    CatalogListed,
    /// Database names selected by pattern
    CatalogFiltered,
    /// Selected database
    DatabaseSelected,
    /// Dump of one database begins
    DumpStart,
    /// Dump of one database written
    DumpComplete,
    /// Dump of one database failed
    DumpFailed,
    /// End-of-run dump summary
    DumpSummary,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::RunStart => "RUN_BEGIN",
            Event::RunComplete => "RUN_COMPLETE",
            Event::RunFailed => "RUN_FAILED",
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::RunningPrivileged => "RUNNING_PRIVILEGED",
            Event::IdentityResolved => "IDENTITY_RESOLVED",

            Event::WorkspaceReady => "WORKSPACE_READY",
            Event::WorkspaceDirCreated => "WORKSPACE_DIR_CREATED",
            Event::WorkspaceDirExists => "WORKSPACE_DIR_EXISTS",
            Event::WorkspacePurged => "WORKSPACE_PURGED",
            Event::WorkspaceRetained => "WORKSPACE_RETAINED",

            Event::ExtractSkipped => "EXTRACT_SKIPPED",
            Event::DecompressFile => "DECOMPRESS_FILE",

            Event::LogReplaySkipped => "LOG_REPLAY_SKIPPED",

            Event::InstanceLaunched => "INSTANCE_LAUNCHED",
            Event::InstanceProbeFailed => "INSTANCE_PROBE_FAILED",
            Event::InstanceSlowStart => "INSTANCE_SLOW_START",
            Event::InstanceReady => "INSTANCE_READY",
            Event::InstanceCrashed => "INSTANCE_CRASHED",
            Event::InstanceStopping => "INSTANCE_STOPPING",
            Event::InstanceStopped => "INSTANCE_STOPPED",

            Event::CatalogListed => "CATALOG_LISTED",
            Event::CatalogFiltered => "CATALOG_FILTERED",
            Event::DatabaseSelected => "DATABASE_SELECTED",
            Event::DumpStart => "DUMP_BEGIN",
            Event::DumpComplete => "DUMP_COMPLETE",
            Event::DumpFailed => "DUMP_FAILED",
            Event::DumpSummary => "DUMP_SUMMARY",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::RunFailed | Event::InstanceCrashed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
