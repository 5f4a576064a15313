//! Structured JSON logger
//!
//! - One log line = one event
//! - Deterministic key ordering (event, severity, then fields by key)
//! - Synchronous, no buffering
//! - Passed by reference into every stage; there is no global logger

use std::fmt;
use std::io::{self, Write};
use std::sync::Mutex;

use super::events::Event;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Probe attempts and other chatty detail
    Trace = 0,
    /// Normal stage progress
    Info = 1,
    /// Unusual but recoverable conditions
    Warn = 2,
    /// Failure of one unit of work (e.g. a single database dump)
    Error = 3,
    /// The run cannot continue
    Fatal = 4,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

enum Sink {
    Console,
    Capture(Mutex<Vec<String>>),
}

/// A structured logger that outputs JSON lines
///
/// WARN and above go to stderr, everything else to stdout.
pub struct Logger {
    min_severity: Severity,
    sink: Sink,
}

impl Logger {
    /// Create a console logger that drops records below `min_severity`
    pub fn new(min_severity: Severity) -> Self {
        Self {
            min_severity,
            sink: Sink::Console,
        }
    }

    /// Create a logger that keeps every record in memory
    pub fn capture() -> Self {
        Self {
            min_severity: Severity::Trace,
            sink: Sink::Capture(Mutex::new(Vec::new())),
        }
    }

    /// Minimum severity that will be emitted
    pub fn min_severity(&self) -> Severity {
        self.min_severity
    }

    /// Lines recorded by a capturing logger (empty for console loggers)
    pub fn captured(&self) -> Vec<String> {
        match &self.sink {
            Sink::Console => Vec::new(),
            Sink::Capture(lines) => lines
                .lock()
                .map(|lines| lines.clone())
                .unwrap_or_default(),
        }
    }

    /// Log an event with the given severity and fields
    pub fn log(&self, severity: Severity, event: Event, fields: &[(&str, &str)]) {
        self.log_named(severity, event.as_str(), fields);
    }

    /// Log a free-form event name (used by observation scopes)
    pub fn log_named(&self, severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if severity < self.min_severity {
            return;
        }

        let line = render(severity, event, fields);

        match &self.sink {
            Sink::Console => {
                if severity >= Severity::Warn {
                    write_line(&mut io::stderr(), &line);
                } else {
                    write_line(&mut io::stdout(), &line);
                }
            }
            Sink::Capture(lines) => {
                if let Ok(mut lines) = lines.lock() {
                    lines.push(line.trim_end().to_string());
                }
            }
        }
    }

    /// Log at TRACE level
    pub fn trace(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Trace, event, fields);
    }

    /// Log at INFO level
    pub fn info(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Info, event, fields);
    }

    /// Log at WARN level
    pub fn warn(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Warn, event, fields);
    }

    /// Log at ERROR level
    pub fn error(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Error, event, fields);
    }

    /// Log at FATAL level
    pub fn fatal(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Fatal, event, fields);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(Severity::Info)
    }
}

fn write_line<W: Write>(writer: &mut W, line: &str) {
    // One write per record
    let _ = writer.write_all(line.as_bytes());
    let _ = writer.flush();
}

fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(256);

    output.push_str("{\"event\":\"");
    escape_json_string(&mut output, event);
    output.push_str("\",\"severity\":\"");
    output.push_str(severity.as_str());
    output.push('"');

    let mut sorted_fields: Vec<_> = fields.iter().collect();
    sorted_fields.sort_by_key(|(k, _)| *k);

    for (key, value) in sorted_fields {
        output.push_str(",\"");
        escape_json_string(&mut output, key);
        output.push_str("\":\"");
        escape_json_string(&mut output, value);
        output.push('"');
    }

    output.push_str("}\n");
    output
}

fn escape_json_string(output: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            c if c.is_control() => {
                output.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => output.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn test_log_json_format() {
        let logger = Logger::capture();
        logger.info(Event::RunStart, &[]);

        let lines = logger.captured();
        assert_eq!(lines.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(parsed["event"], "RUN_BEGIN");
        assert_eq!(parsed["severity"], "INFO");
    }

    #[test]
    fn test_log_deterministic_ordering() {
        let first = render(Severity::Info, "TEST", &[("zebra", "1"), ("apple", "2")]);
        let second = render(Severity::Info, "TEST", &[("apple", "2"), ("zebra", "1")]);
        assert_eq!(first, second);
        assert!(first.find("apple").unwrap() < first.find("zebra").unwrap());
        assert!(first.find("\"event\"").unwrap() < first.find("\"severity\"").unwrap());
    }

    #[test]
    fn test_log_escapes_special_chars() {
        let line = render(Severity::Info, "TEST", &[("message", "hello \"world\"\nline2")]);
        assert_eq!(line.chars().filter(|c| *c == '\n').count(), 1);

        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["message"], "hello \"world\"\nline2");
    }

    #[test]
    fn test_min_severity_filters_records() {
        let mut logger = Logger::capture();
        logger.min_severity = Severity::Warn;

        logger.info(Event::RunStart, &[]);
        logger.trace(Event::InstanceProbeFailed, &[]);
        logger.warn(Event::ExtractSkipped, &[]);

        let lines = logger.captured();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("EXTRACT_SKIPPED"));
    }

    #[test]
    fn test_console_logger_captures_nothing() {
        let logger = Logger::new(Severity::Fatal);
        logger.info(Event::RunStart, &[]);
        assert!(logger.captured().is_empty());
    }
}
