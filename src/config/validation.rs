//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Check paired settings (certificate needs a key)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Config → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::Config;
use crate::observability::logging::{all_levels, parse_level};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("logging.level {0:?} is not one of: {levels}", levels = all_levels())]
    UnknownLevel(String),

    #[error("server.port must not be 0")]
    ZeroPort,

    #[error("{0} must be greater than 0")]
    ZeroValue(&'static str),

    #[error("{section}: cert_path and key_path must be set together")]
    UnpairedCertificate { section: &'static str },

    #[error("{field} {value:?} is not a socket address")]
    InvalidAddress { field: &'static str, value: String },
}

/// Check `config` and report every problem found.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if parse_level(&config.logging.level).is_err() {
        errors.push(ValidationError::UnknownLevel(config.logging.level.clone()));
    }

    let server = &config.server;
    if server.port == 0 {
        errors.push(ValidationError::ZeroPort);
    }
    let durations = [
        ("server.timeout_secs", server.timeout_secs),
        ("server.http2_keepalive_interval_secs", server.http2_keepalive_interval_secs),
        ("server.http2_keepalive_timeout_secs", server.http2_keepalive_timeout_secs),
    ];
    for (field, value) in durations {
        if value == Some(0) {
            errors.push(ValidationError::ZeroValue(field));
        }
    }
    if server.concurrency_limit_per_connection == Some(0) {
        errors.push(ValidationError::ZeroValue("server.concurrency_limit_per_connection"));
    }
    if server.max_concurrent_streams == Some(0) {
        errors.push(ValidationError::ZeroValue("server.max_concurrent_streams"));
    }
    if let Some(tls) = &server.tls {
        if tls.cert_path.is_empty() || tls.key_path.is_empty() {
            errors.push(ValidationError::UnpairedCertificate { section: "server.tls" });
        }
    }

    let temporal = &config.temporal;
    if temporal.cert_path.is_empty() != temporal.key_path.is_empty() {
        errors.push(ValidationError::UnpairedCertificate { section: "temporal" });
    }
    check_address(&mut errors, "temporal.health_address", &temporal.health_address);
    if let Some(metrics) = &temporal.metrics {
        check_address(&mut errors, "temporal.metrics.listen_address", &metrics.listen_address);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
