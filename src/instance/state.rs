//! Instance lifecycle states
//!
//! ```text
//! NotStarted -> Starting -> Ready -> Stopping -> Stopped
//!                  |                    ^
//!                  +--> Crashed         |
//!                  +--------------------+   (stop while still starting)
//! ```

use std::fmt;

/// Lifecycle state of the ephemeral database instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    NotStarted,
    Starting,
    Ready,
    Stopping,
    Stopped,
    /// Process exited before the first successful probe
    Crashed,
}

impl InstanceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceState::NotStarted => "NOT_STARTED",
            InstanceState::Starting => "STARTING",
            InstanceState::Ready => "READY",
            InstanceState::Stopping => "STOPPING",
            InstanceState::Stopped => "STOPPED",
            InstanceState::Crashed => "CRASHED",
        }
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: InstanceState) -> bool {
        use InstanceState::*;
        matches!(
            (self, next),
            (NotStarted, Starting)
                | (Starting, Ready)
                | (Starting, Crashed)
                | (Starting, Stopping)
                | (Ready, Stopping)
                | (Stopping, Stopped)
        )
    }

    /// Whether a live process may still need a termination signal
    pub fn needs_stop(&self) -> bool {
        matches!(self, InstanceState::Starting | InstanceState::Ready)
    }

    /// No further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, InstanceState::Stopped | InstanceState::Crashed)
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use InstanceState::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(NotStarted.can_transition_to(Starting));
        assert!(Starting.can_transition_to(Ready));
        assert!(Ready.can_transition_to(Stopping));
        assert!(Stopping.can_transition_to(Stopped));
    }

    #[test]
    fn test_crash_only_from_starting() {
        assert!(Starting.can_transition_to(Crashed));
        assert!(!Ready.can_transition_to(Crashed));
        assert!(!NotStarted.can_transition_to(Crashed));
    }

    #[test]
    fn test_terminal_states() {
        for state in [Stopped, Crashed] {
            assert!(state.is_terminal());
            assert!(!state.needs_stop());
            for next in [NotStarted, Starting, Ready, Stopping, Stopped, Crashed] {
                assert!(!state.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_needs_stop() {
        assert!(Starting.needs_stop());
        assert!(Ready.needs_stop());
        assert!(!NotStarted.needs_stop());
        assert!(!Stopping.needs_stop());
    }
}
