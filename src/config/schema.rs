//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every section has defaults so an empty file is a valid config.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::grpc::ServerOption;
use crate::net::{load_server_tls, TlsError};
use crate::observability::LoggingConfig;
use crate::temporal::{ClientOption, DEFAULT_HOST_PORT, DEFAULT_NAMESPACE, WORKFLOW_SERVICE};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    /// gRPC server settings (serve mode).
    pub server: ServerConfig,

    /// Log level and output format.
    pub logging: LoggingConfig,

    /// Temporal frontend connection.
    pub temporal: TemporalConfig,
}

/// gRPC server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Default port when `--port` is not given.
    pub port: u16,

    /// Register the server reflection service.
    pub reflection: bool,

    /// Per-request timeout.
    pub timeout_secs: Option<u64>,

    pub concurrency_limit_per_connection: Option<usize>,

    pub http2_keepalive_interval_secs: Option<u64>,

    pub http2_keepalive_timeout_secs: Option<u64>,

    pub max_concurrent_streams: Option<u32>,

    /// Serve over TLS with this certificate and key.
    pub tls: Option<TlsConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            reflection: true,
            timeout_secs: None,
            concurrency_limit_per_connection: None,
            http2_keepalive_interval_secs: None,
            http2_keepalive_timeout_secs: None,
            max_concurrent_streams: None,
            tls: None,
        }
    }
}

impl ServerConfig {
    /// Server options for every setting that is present, in field order.
    ///
    /// Fails only when the TLS certificate or key cannot be loaded.
    pub fn server_options(&self) -> Result<Vec<ServerOption>, TlsError> {
        let mut options = Vec::new();

        if let Some(secs) = self.timeout_secs {
            options.push(ServerOption::Timeout(Duration::from_secs(secs)));
        }
        if let Some(limit) = self.concurrency_limit_per_connection {
            options.push(ServerOption::ConcurrencyLimitPerConnection(limit));
        }
        if let Some(secs) = self.http2_keepalive_interval_secs {
            options.push(ServerOption::Http2KeepaliveInterval(Duration::from_secs(secs)));
        }
        if let Some(secs) = self.http2_keepalive_timeout_secs {
            options.push(ServerOption::Http2KeepaliveTimeout(Duration::from_secs(secs)));
        }
        if let Some(streams) = self.max_concurrent_streams {
            options.push(ServerOption::MaxConcurrentStreams(streams));
        }
        if let Some(tls) = &self.tls {
            let tls = load_server_tls(Path::new(&tls.cert_path), Path::new(&tls.key_path))?;
            options.push(ServerOption::Tls(tls));
        }

        Ok(options)
    }
}

/// TLS certificate and key for the gRPC listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Temporal connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TemporalConfig {
    pub host_port: String,

    pub namespace: String,

    /// API key; takes precedence over `cert_path`/`key_path`.
    pub api_key: String,

    /// Use TLS with the bundled web PKI roots.
    pub tls: bool,

    pub cert_path: String,

    pub key_path: String,

    /// Expose a Prometheus scrape endpoint and record connection metrics.
    pub metrics: Option<MetricsConfig>,

    /// Listen address for `GET /health`.
    pub health_address: String,

    /// gRPC service name checked by the health endpoint.
    pub health_service: String,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            host_port: DEFAULT_HOST_PORT.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            api_key: String::new(),
            tls: false,
            cert_path: String::new(),
            key_path: String::new(),
            metrics: None,
            health_address: "0.0.0.0:8080".to_string(),
            health_service: WORKFLOW_SERVICE.to_string(),
        }
    }
}

impl TemporalConfig {
    /// Connection options in application order.
    pub fn client_options(&self) -> Vec<ClientOption> {
        let mut options = vec![
            ClientOption::tracing(),
            ClientOption::auth_detection(&self.api_key, &self.cert_path, &self.key_path),
            ClientOption::Tls(self.tls),
            ClientOption::HostPort(self.host_port.clone()),
            ClientOption::Namespace(self.namespace.clone()),
        ];
        if let Some(metrics) = &self.metrics {
            options.push(ClientOption::PrometheusMetrics {
                listen_address: metrics.listen_address.clone(),
                prefix: metrics.prefix.clone(),
            });
        }
        options
    }
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Scrape endpoint address, e.g. "0.0.0.0:9090".
    pub listen_address: String,

    /// Prepended to every metric name.
    pub prefix: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:9090".to_string(),
            prefix: "temporal".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(config.server.reflection);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.temporal.host_port, DEFAULT_HOST_PORT);
        assert_eq!(config.temporal.namespace, DEFAULT_NAMESPACE);
        assert!(config.temporal.metrics.is_none());
    }

    #[test]
    fn server_options_follow_field_order() {
        let config = ServerConfig {
            timeout_secs: Some(5),
            http2_keepalive_interval_secs: Some(30),
            max_concurrent_streams: Some(64),
            ..ServerConfig::default()
        };
        let options = config.server_options().unwrap();

        assert_eq!(options.len(), 3);
        assert!(matches!(options[0], ServerOption::Timeout(d) if d == Duration::from_secs(5)));
        assert!(matches!(options[1], ServerOption::Http2KeepaliveInterval(d) if d == Duration::from_secs(30)));
        assert!(matches!(options[2], ServerOption::MaxConcurrentStreams(64)));
    }

    #[test]
    fn missing_server_certificate_fails() {
        let config = ServerConfig {
            tls: Some(TlsConfig {
                cert_path: "/nonexistent/cert.pem".into(),
                key_path: "/nonexistent/key.pem".into(),
            }),
            ..ServerConfig::default()
        };
        assert!(config.server_options().is_err());
    }

    #[test]
    fn client_options_pick_api_key_and_metrics() {
        let config: TemporalConfig = toml::from_str(
            r#"
            host_port = "temporal.internal:7233"
            api_key = "secret"
            cert_path = "cert.pem"
            key_path = "key.pem"

            [metrics]
            listen_address = "127.0.0.1:9464"
            "#,
        )
        .unwrap();

        let names: Vec<_> = config.client_options().iter().map(ClientOption::name).collect();
        assert_eq!(
            names,
            ["logger", "api_key", "tls", "host_port", "namespace", "prometheus_metrics"]
        );
    }
}
