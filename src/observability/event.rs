//! Pending structured log records.
//!
//! A `LogEvent` collects a level, an optional error and extra fields, and is
//! emitted exactly once through `tracing` when `msg` is called. Callers that
//! need to customise a record before it is written (fatal error handling)
//! receive and return one of these.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::Level;

/// A log record that has not been written yet.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "a LogEvent does nothing until `msg` is called"]
pub struct LogEvent {
    level: Level,
    error: Option<String>,
    fields: BTreeMap<String, Value>,
}

impl LogEvent {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            error: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn error() -> Self {
        Self::new(Level::ERROR)
    }

    pub fn warn() -> Self {
        Self::new(Level::WARN)
    }

    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Attach an error as the record's cause.
    pub fn err(mut self, error: &(dyn std::error::Error + 'static)) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Attach a string field.
    pub fn str(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.field(key, Value::String(value.into()))
    }

    /// Attach any serializable field. Values that fail to serialize are recorded as null.
    pub fn field(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.fields.insert(key.into(), value);
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn error_text(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Write the record with the given message.
    pub fn msg(self, message: &str) {
        let error = self.error.as_deref();
        let fields = (!self.fields.is_empty()).then(|| FieldsDisplay(&self.fields));

        match self.level {
            Level::ERROR => tracing::error!(error, fields = fields.map(tracing::field::display), "{message}"),
            Level::WARN => tracing::warn!(error, fields = fields.map(tracing::field::display), "{message}"),
            Level::INFO => tracing::info!(error, fields = fields.map(tracing::field::display), "{message}"),
            Level::DEBUG => tracing::debug!(error, fields = fields.map(tracing::field::display), "{message}"),
            _ => tracing::trace!(error, fields = fields.map(tracing::field::display), "{message}"),
        }
    }
}

struct FieldsDisplay<'a>(&'a BTreeMap<String, Value>);

impl fmt::Display for FieldsDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string(self.0).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}
