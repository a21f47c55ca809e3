//! Client configuration and the options that build it up.
//!
//! A [`ClientOptions`] starts from defaults (or a caller-supplied value) and
//! is modified by an ordered list of [`ClientOption`]s. Options run in
//! order, later ones overwrite earlier ones, and the first failure stops
//! the sequence before any connection is attempted.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tonic::transport::{ClientTlsConfig, Identity};

use crate::net::load_identity;
use crate::observability::{install_prometheus, MetricsHandler};
use crate::temporal::logger::{ClientLogger, TracingLogger};
use crate::temporal::ConnectionError;

/// Frontend address used when none is given.
pub const DEFAULT_HOST_PORT: &str = "localhost:7233";

/// Namespace used when none is given.
pub const DEFAULT_NAMESPACE: &str = "default";

/// How the client authenticates to the frontend.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Sent as `authorization: Bearer <key>` on every call.
    ApiKey(String),
    /// Client certificate presented during the TLS handshake.
    Mtls(Identity),
}

/// Transport settings.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// TLS for the channel; `None` means plaintext unless mTLS credentials are set.
    pub tls: Option<ClientTlsConfig>,
    pub connect_timeout: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            tls: None,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Everything needed to open a connection.
#[derive(Clone, Default)]
pub struct ClientOptions {
    /// `host:port` of the frontend. Empty means [`DEFAULT_HOST_PORT`].
    pub host_port: String,
    /// Empty means [`DEFAULT_NAMESPACE`].
    pub namespace: String,
    /// Reported to the server as `client-identity`.
    pub identity: Option<String>,
    pub credentials: Option<Credentials>,
    pub connection: ConnectionOptions,
    pub metrics: Option<MetricsHandler>,
    pub logger: Option<Arc<dyn ClientLogger>>,
}

impl ClientOptions {
    pub fn effective_host_port(&self) -> &str {
        if self.host_port.is_empty() {
            DEFAULT_HOST_PORT
        } else {
            &self.host_port
        }
    }

    pub fn effective_namespace(&self) -> &str {
        if self.namespace.is_empty() {
            DEFAULT_NAMESPACE
        } else {
            &self.namespace
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let credentials = match &self.credentials {
            Some(Credentials::ApiKey(_)) => "api-key",
            Some(Credentials::Mtls(_)) => "mtls",
            None => "none",
        };
        f.debug_struct("ClientOptions")
            .field("host_port", &self.host_port)
            .field("namespace", &self.namespace)
            .field("identity", &self.identity)
            .field("credentials", &credentials)
            .field("connection", &self.connection)
            .field("metrics", &self.metrics)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

/// One named change to [`ClientOptions`].
#[derive(Clone)]
pub enum ClientOption {
    /// Authenticate with an API key. An empty key does nothing.
    ApiKey(String),
    Credentials(Credentials),
    /// Replace the transport settings wholesale.
    Connection(ConnectionOptions),
    /// Set the frontend address; empty means [`DEFAULT_HOST_PORT`].
    HostPort(String),
    /// Set the namespace; empty means [`DEFAULT_NAMESPACE`].
    Namespace(String),
    Identity(String),
    Logger(Arc<dyn ClientLogger>),
    Metrics(MetricsHandler),
    /// Install the Prometheus recorder on `listen_address` and record into it.
    PrometheusMetrics { listen_address: String, prefix: String },
    /// Authenticate with a client certificate loaded from disk.
    Mtls { cert_path: PathBuf, key_path: PathBuf },
    /// Enable TLS with the bundled web PKI roots. `false` does nothing.
    Tls(bool),
    NoOp,
}

impl ClientOption {
    /// Pick credentials from whatever is available: an API key wins, then
    /// a certificate/key pair, otherwise nothing.
    pub fn auth_detection(api_key: &str, cert_path: &str, key_path: &str) -> Self {
        if !api_key.is_empty() {
            return Self::ApiKey(api_key.to_string());
        }

        if !cert_path.is_empty() && !key_path.is_empty() {
            return Self::Mtls {
                cert_path: PathBuf::from(cert_path),
                key_path: PathBuf::from(key_path),
            };
        }

        Self::NoOp
    }

    /// Route connection logs to the process `tracing` subscriber.
    pub fn tracing() -> Self {
        Self::Logger(Arc::new(TracingLogger))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ApiKey(_) => "api_key",
            Self::Credentials(_) => "credentials",
            Self::Connection(_) => "connection",
            Self::HostPort(_) => "host_port",
            Self::Namespace(_) => "namespace",
            Self::Identity(_) => "identity",
            Self::Logger(_) => "logger",
            Self::Metrics(_) => "metrics",
            Self::PrometheusMetrics { .. } => "prometheus_metrics",
            Self::Mtls { .. } => "mtls",
            Self::Tls(_) => "tls",
            Self::NoOp => "noop",
        }
    }

    /// Apply this option to `options`.
    pub fn apply(self, options: &mut ClientOptions) -> Result<(), ConnectionError> {
        match self {
            Self::ApiKey(key) => {
                if !key.is_empty() {
                    options.credentials = Some(Credentials::ApiKey(key));
                }
            }
            Self::Credentials(credentials) => options.credentials = Some(credentials),
            Self::Connection(connection) => options.connection = connection,
            Self::HostPort(host_port) => {
                options.host_port = if host_port.is_empty() {
                    DEFAULT_HOST_PORT.to_string()
                } else {
                    host_port
                };
            }
            Self::Namespace(namespace) => {
                options.namespace = if namespace.is_empty() {
                    DEFAULT_NAMESPACE.to_string()
                } else {
                    namespace
                };
            }
            Self::Identity(identity) => options.identity = Some(identity),
            Self::Logger(logger) => options.logger = Some(logger),
            Self::Metrics(metrics) => options.metrics = Some(metrics),
            Self::PrometheusMetrics {
                listen_address,
                prefix,
            } => {
                let metrics = install_prometheus(&listen_address, &prefix)?;
                options.metrics = Some(metrics);
            }
            Self::Mtls {
                cert_path,
                key_path,
            } => {
                let identity = load_identity(&cert_path, &key_path)?;
                options.credentials = Some(Credentials::Mtls(identity));
            }
            Self::Tls(enabled) => {
                if enabled {
                    options.connection.tls = Some(ClientTlsConfig::new().with_webpki_roots());
                }
            }
            Self::NoOp => {}
        }
        Ok(())
    }
}

impl fmt::Debug for ClientOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClientOption").field(&self.name()).finish()
    }
}

/// Apply `opts` to `options` in order, stopping at the first failure.
pub fn apply_options<I>(options: &mut ClientOptions, opts: I) -> Result<(), ConnectionError>
where
    I: IntoIterator<Item = ClientOption>,
{
    for option in opts {
        let name = option.name();
        option.apply(options).map_err(|e| {
            tracing::debug!(option = name, error = %e, "Client option failed");
            e
        })?;
    }
    Ok(())
}
