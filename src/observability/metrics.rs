//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Install the Prometheus recorder with a scrape endpoint
//! - Hand out prefixed metric handles to client connections
//!
//! # Metrics
//! - `<prefix>_connection_attempts` (counter): dial attempts
//! - `<prefix>_connection_failures` (counter): failed dials
//! - `<prefix>_connection_latency_seconds` (histogram): dial duration
//! - `<prefix>_health_checks` (counter): health probes by status
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every handle is a no-op
//! - The recorder is process-global, so it can be installed once

use std::net::SocketAddr;

use metrics::{Counter, Gauge, Histogram, Label};
use metrics_exporter_prometheus::PrometheusBuilder;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid metrics listen address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        source: std::net::AddrParseError,
    },

    #[error("error creating reporter: {0}")]
    Install(#[from] metrics_exporter_prometheus::BuildError),
}

/// Sink for client metrics. Names are prefixed with `prefix_` when a prefix is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsHandler {
    prefix: String,
}

impl MetricsHandler {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full metric name for `name`.
    pub fn metric_name(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}_{}", self.prefix, name)
        }
    }

    pub fn counter(&self, name: &str) -> Counter {
        metrics::counter!(self.metric_name(name))
    }

    pub fn counter_with_labels(&self, name: &str, labels: Vec<Label>) -> Counter {
        metrics::counter!(self.metric_name(name), labels)
    }

    pub fn gauge(&self, name: &str) -> Gauge {
        metrics::gauge!(self.metric_name(name))
    }

    pub fn histogram(&self, name: &str) -> Histogram {
        metrics::histogram!(self.metric_name(name))
    }
}

/// Install the global Prometheus recorder, serving scrapes on `listen_address`.
///
/// Must be called from inside a Tokio runtime for the exporter to share it.
pub fn install_prometheus(listen_address: &str, prefix: &str) -> Result<MetricsHandler, MetricsError> {
    let addr: SocketAddr = listen_address
        .parse()
        .map_err(|source| MetricsError::InvalidAddress {
            address: listen_address.to_string(),
            source,
        })?;

    PrometheusBuilder::new().with_http_listener(addr).install()?;

    tracing::info!(address = %addr, prefix, "Starting Prometheus service");
    Ok(MetricsHandler::new(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_are_prefixed() {
        let handler = MetricsHandler::new("temporal");
        assert_eq!(handler.metric_name("connection_attempts"), "temporal_connection_attempts");
    }

    #[test]
    fn empty_prefix_leaves_names_untouched() {
        let handler = MetricsHandler::default();
        assert_eq!(handler.metric_name("connection_attempts"), "connection_attempts");
    }

    #[test]
    fn invalid_listen_address_is_rejected() {
        let err = install_prometheus("not-an-address", "x").unwrap_err();
        assert!(matches!(err, MetricsError::InvalidAddress { .. }));
    }
}
