//! Logging sinks for failed exchanges.
//!
//! The helpers never pick a log level themselves: [`Severity::for_status`]
//! derives it from the status class, and the sink receives a structured
//! [`LogMessage`] with the triggering error passed separately.

use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use axum::http::StatusCode;

/// Log severity used for a failed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    /// `Error` for 5xx and above, `Warning` for everything else.
    pub fn for_status(status: StatusCode) -> Self {
        if status.as_u16() >= 500 {
            Severity::Error
        } else {
            Severity::Warning
        }
    }
}

/// A log line template: a fixed message plus ordered key/value fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    message: Cow<'static, str>,
    fields: Vec<(&'static str, String)>,
}

impl LogMessage {
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field. Fields keep insertion order.
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }

    /// The fields alone, rendered as `key=value` pairs separated by spaces.
    pub fn fields_display(&self) -> impl fmt::Display + '_ {
        FieldList(&self.fields)
    }

    /// Look up the first field with the given key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl From<&'static str> for LogMessage {
    fn from(message: &'static str) -> Self {
        Self::new(message)
    }
}

impl From<String> for LogMessage {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if !self.fields.is_empty() {
            write!(f, " {}", FieldList(&self.fields))?;
        }
        Ok(())
    }
}

struct FieldList<'a>(&'a [(&'static str, String)]);

impl fmt::Display for FieldList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

/// Destination for the log line written when an exchange fails.
///
/// Exactly two severities exist; which one is called is decided by the
/// response status, never by the caller.
pub trait ErrorLog: Send + Sync {
    fn warning(&self, message: &LogMessage, error: &(dyn Error + 'static));

    fn error(&self, message: &LogMessage, error: &(dyn Error + 'static));

    /// Dispatch to [`warning`](Self::warning) or [`error`](Self::error).
    fn log(&self, severity: Severity, message: &LogMessage, error: &(dyn Error + 'static)) {
        match severity {
            Severity::Warning => self.warning(message, error),
            Severity::Error => self.error(message, error),
        }
    }
}

impl<L: ErrorLog + ?Sized> ErrorLog for Arc<L> {
    fn warning(&self, message: &LogMessage, error: &(dyn Error + 'static)) {
        (**self).warning(message, error);
    }

    fn error(&self, message: &LogMessage, error: &(dyn Error + 'static)) {
        (**self).error(message, error);
    }
}

/// Sink that forwards to the `tracing` subscriber.
///
/// The event message is the fixed text; the caller's fields and the error
/// are recorded as the `fields` and `error` event fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl ErrorLog for TracingLog {
    fn warning(&self, message: &LogMessage, error: &(dyn Error + 'static)) {
        tracing::warn!(
            fields = %message.fields_display(),
            error = %error,
            "{}",
            message.message()
        );
    }

    fn error(&self, message: &LogMessage, error: &(dyn Error + 'static)) {
        tracing::error!(
            fields = %message.fields_display(),
            error = %error,
            "{}",
            message.message()
        );
    }
}

/// One record captured by [`MemoryLog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub severity: Severity,
    pub message: LogMessage,
    /// The error rendered with `Display`.
    pub error: String,
}

/// Sink that keeps every record in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn warnings(&self) -> Vec<LogRecord> {
        self.with_severity(Severity::Warning)
    }

    pub fn errors(&self) -> Vec<LogRecord> {
        self.with_severity(Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    fn with_severity(&self, severity: Severity) -> Vec<LogRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.severity == severity)
            .collect()
    }

    fn push(&self, severity: Severity, message: &LogMessage, error: &(dyn Error + 'static)) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogRecord {
                severity,
                message: message.clone(),
                error: error.to_string(),
            });
    }
}

impl ErrorLog for MemoryLog {
    fn warning(&self, message: &LogMessage, error: &(dyn Error + 'static)) {
        self.push(Severity::Warning, message, error);
    }

    fn error(&self, message: &LogMessage, error: &(dyn Error + 'static)) {
        self.push(Severity::Error, message, error);
    }
}
