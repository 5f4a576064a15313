//! ObservationScope for automatic begin/complete logging around a stage

use std::cell::Cell;
use std::time::Instant;

use super::logger::{Logger, Severity};

/// A scope that logs `{name}_BEGIN` on creation and `{name}_COMPLETE` or
/// `{name}_FAILED` when closed.
///
/// ```ignore
/// let scope = ObservationScope::new(logger, "EXTRACT");
/// // ... do work ...
/// scope.complete(); // logs EXTRACT_COMPLETE with elapsed_ms
/// // if never closed, logs EXTRACT_INCOMPLETE on drop
/// ```
pub struct ObservationScope<'a> {
    logger: &'a Logger,
    name: &'static str,
    completed: Cell<bool>,
    timer: Timer,
}

impl<'a> ObservationScope<'a> {
    /// Create a new observation scope and log `{name}_BEGIN`
    pub fn new(logger: &'a Logger, name: &'static str) -> Self {
        Self::with_fields(logger, name, &[])
    }

    /// Create a new observation scope with fields attached to the begin record
    pub fn with_fields(logger: &'a Logger, name: &'static str, fields: &[(&str, &str)]) -> Self {
        logger.log_named(Severity::Info, &format!("{}_BEGIN", name), fields);

        Self {
            logger,
            name,
            completed: Cell::new(false),
            timer: Timer::new(),
        }
    }

    /// Mark the scope as successfully completed
    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Mark the scope as successfully completed with additional fields
    pub fn complete_with_fields(self, extra_fields: &[(&str, &str)]) {
        self.completed.set(true);
        let elapsed = self.timer.elapsed_ms();

        let mut fields: Vec<(&str, &str)> = vec![("elapsed_ms", elapsed.as_str())];
        fields.extend(extra_fields.iter().copied());

        self.logger
            .log_named(Severity::Info, &format!("{}_COMPLETE", self.name), &fields);
    }

    /// Mark the scope as failed; logs `{name}_FAILED` at FATAL level
    pub fn fail(self, reason: &str) {
        self.completed.set(true);
        self.logger.log_named(
            Severity::Fatal,
            &format!("{}_FAILED", self.name),
            &[("reason", reason)],
        );
    }

    /// Check if the scope has been closed
    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.completed.get() {
            self.logger.log_named(
                Severity::Warn,
                &format!("{}_INCOMPLETE", self.name),
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}

/// A simple duration timer for logging elapsed time
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed milliseconds as a string
    pub fn elapsed_ms(&self) -> String {
        self.start.elapsed().as_millis().to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_logs_begin_and_complete() {
        let logger = Logger::capture();
        let scope = ObservationScope::new(&logger, "EXTRACT");
        assert!(!scope.is_completed());
        scope.complete_with_fields(&[("files", "3")]);

        let lines = logger.captured();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("EXTRACT_BEGIN"));
        assert!(lines[1].contains("EXTRACT_COMPLETE"));
        assert!(lines[1].contains("\"files\":\"3\""));
        assert!(lines[1].contains("elapsed_ms"));
    }

    #[test]
    fn test_scope_fail_is_fatal() {
        let logger = Logger::capture();
        let scope = ObservationScope::new(&logger, "LOG_REPLAY");
        scope.fail("exit status 1");

        let lines = logger.captured();
        assert!(lines[1].contains("LOG_REPLAY_FAILED"));
        assert!(lines[1].contains("FATAL"));
    }

    #[test]
    fn test_scope_drop_without_complete_warns() {
        let logger = Logger::capture();
        drop(ObservationScope::new(&logger, "DUMP"));

        let lines = logger.captured();
        assert!(lines[1].contains("DUMP_INCOMPLETE"));
        assert!(lines[1].contains("WARN"));
    }

    #[test]
    fn test_timer() {
        let timer = Timer::new();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let ms: u64 = timer.elapsed_ms().parse().unwrap();
        assert!(ms >= 10);
    }
}
