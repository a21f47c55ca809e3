//! Logging adapter used by Temporal connections.

use tracing::Level;

/// Where a connection writes its own log lines.
pub trait ClientLogger: Send + Sync {
    fn log(&self, level: Level, message: &str, fields: &[(&str, &str)]);

    fn debug(&self, message: &str, fields: &[(&str, &str)]) {
        self.log(Level::DEBUG, message, fields);
    }

    fn info(&self, message: &str, fields: &[(&str, &str)]) {
        self.log(Level::INFO, message, fields);
    }

    fn warn(&self, message: &str, fields: &[(&str, &str)]) {
        self.log(Level::WARN, message, fields);
    }

    fn error(&self, message: &str, fields: &[(&str, &str)]) {
        self.log(Level::ERROR, message, fields);
    }
}

/// Forwards to the process `tracing` subscriber under the `temporal` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl ClientLogger for TracingLogger {
    fn log(&self, level: Level, message: &str, fields: &[(&str, &str)]) {
        let fields = render_fields(fields);
        let fields = fields.as_deref();
        match level {
            Level::ERROR => tracing::error!(target: "temporal", fields, "{message}"),
            Level::WARN => tracing::warn!(target: "temporal", fields, "{message}"),
            Level::INFO => tracing::info!(target: "temporal", fields, "{message}"),
            Level::DEBUG => tracing::debug!(target: "temporal", fields, "{message}"),
            _ => tracing::trace!(target: "temporal", fields, "{message}"),
        }
    }
}

fn render_fields(fields: &[(&str, &str)]) -> Option<String> {
    if fields.is_empty() {
        return None;
    }
    let rendered: Vec<String> = fields.iter().map(|(key, value)| format!("{key}={value}")).collect();
    Some(rendered.join(" "))
}
