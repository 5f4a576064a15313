//! Diagnostics for a conversion run
//!
//! - Structured logging (one JSON object per line)
//! - Typed lifecycle events
//! - Stage scopes with elapsed time
//!
//! A `Logger` is created once per run and handed to every stage by
//! reference. Nothing here is process-global.
//!
//! # Usage
//!
//! ```ignore
//! use backup2sql::observability::{Event, Logger, ObservationScope, Severity};
//!
//! let logger = Logger::new(Severity::Info);
//! logger.info(Event::RunStart, &[("source", "backup.xbstream")]);
//!
//! let scope = ObservationScope::new(&logger, "EXTRACT");
//! // ... do work ...
//! scope.complete();
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::{ObservationScope, Timer};

impl Logger {
    /// Log a lifecycle event at the severity implied by the event
    pub fn event(&self, event: Event, fields: &[(&str, &str)]) {
        let severity = if event.is_fatal() {
            Severity::Fatal
        } else {
            Severity::Info
        };
        self.log(severity, event, fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_uses_fatal_severity_for_fatal_events() {
        let logger = Logger::capture();
        logger.event(Event::InstanceCrashed, &[("status", "1")]);
        logger.event(Event::InstanceReady, &[]);

        let lines = logger.captured();
        assert!(lines[0].contains("\"severity\":\"FATAL\""));
        assert!(lines[1].contains("\"severity\":\"INFO\""));
    }
}
