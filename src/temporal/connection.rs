//! Opening a connection to the Temporal frontend.

use std::sync::Arc;
use std::time::Instant;

use metrics::Label;
use thiserror::Error;
use tonic::metadata::{AsciiMetadataValue, MetadataValue};
use tonic::service::interceptor::InterceptedService;
use tonic::service::Interceptor;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tonic::{Request, Status};
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;
use tonic_health::pb::HealthCheckRequest;

use crate::net::TlsError;
use crate::observability::{MetricsError, MetricsHandler};
use crate::temporal::logger::ClientLogger;
use crate::temporal::options::{apply_options, ClientOption, ClientOptions, Credentials};

/// gRPC service implemented by the Temporal frontend.
pub const WORKFLOW_SERVICE: &str = "temporal.api.workflowservice.v1.WorkflowService";

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("error loading tls key pair: {0}")]
    Tls(#[from] TlsError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error("invalid value for {field}: {value:?}")]
    InvalidMetadata { field: &'static str, value: String },

    #[error("invalid Temporal address {host_port:?}: {source}")]
    InvalidAddress {
        host_port: String,
        source: tonic::transport::Error,
    },

    #[error("failed to connect to Temporal at {host_port}: {source}")]
    Dial {
        host_port: String,
        source: tonic::transport::Error,
    },

    #[error("health check failed: {0}")]
    Health(#[from] Status),

    #[error("service {service:?} is {status:?}")]
    NotServing { service: String, status: ServingStatus },
}

/// Adds namespace, identity and API key headers to every call.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    namespace: AsciiMetadataValue,
    identity: Option<AsciiMetadataValue>,
    authorization: Option<AsciiMetadataValue>,
}

impl RequestMetadata {
    fn new(options: &ClientOptions) -> Result<Self, ConnectionError> {
        let namespace = ascii("namespace", options.effective_namespace())?;
        let identity = options
            .identity
            .as_deref()
            .map(|identity| ascii("identity", identity))
            .transpose()?;
        let authorization = match &options.credentials {
            Some(Credentials::ApiKey(key)) => Some(ascii("api key", &format!("Bearer {key}"))?),
            _ => None,
        };

        Ok(Self {
            namespace,
            identity,
            authorization,
        })
    }
}

fn ascii(field: &'static str, value: &str) -> Result<AsciiMetadataValue, ConnectionError> {
    MetadataValue::try_from(value).map_err(|_| ConnectionError::InvalidMetadata {
        field,
        // Never echo credentials back into logs.
        value: if field == "api key" { "<redacted>".into() } else { value.to_string() },
    })
}

impl Interceptor for RequestMetadata {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let metadata = request.metadata_mut();
        metadata.insert("temporal-namespace", self.namespace.clone());
        if let Some(identity) = &self.identity {
            metadata.insert("client-identity", identity.clone());
        }
        if let Some(authorization) = &self.authorization {
            metadata.insert("authorization", authorization.clone());
        }
        Ok(request)
    }
}

/// An open channel to the Temporal frontend.
#[derive(Clone)]
pub struct Connection {
    channel: Channel,
    metadata: RequestMetadata,
    host_port: String,
    namespace: String,
    metrics: Option<MetricsHandler>,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl Connection {
    /// Dial the frontend described by `options`. Failures are not retried.
    pub async fn dial(options: ClientOptions) -> Result<Self, ConnectionError> {
        let host_port = options.effective_host_port().to_string();
        let namespace = options.effective_namespace().to_string();
        let metadata = RequestMetadata::new(&options)?;

        let tls = match (&options.connection.tls, &options.credentials) {
            (tls, Some(Credentials::Mtls(identity))) => Some(
                tls.clone()
                    .unwrap_or_else(|| ClientTlsConfig::new().with_webpki_roots())
                    .identity(identity.clone()),
            ),
            (tls, _) => tls.clone(),
        };

        let scheme = if tls.is_some() { "https" } else { "http" };
        let invalid = |source| ConnectionError::InvalidAddress {
            host_port: host_port.clone(),
            source,
        };
        let mut endpoint = Endpoint::from_shared(format!("{scheme}://{host_port}"))
            .map_err(invalid)?
            .connect_timeout(options.connection.connect_timeout);
        if let Some(tls) = tls {
            endpoint = endpoint.tls_config(tls).map_err(invalid)?;
        }

        if let Some(metrics) = &options.metrics {
            metrics.counter("connection_attempts").increment(1);
        }
        let started = Instant::now();

        let channel = match endpoint.connect().await {
            Ok(channel) => channel,
            Err(source) => {
                if let Some(metrics) = &options.metrics {
                    metrics.counter("connection_failures").increment(1);
                }
                if let Some(logger) = &options.logger {
                    logger.error(
                        "Failed to connect to Temporal",
                        &[("host_port", &host_port), ("error", &source.to_string())],
                    );
                }
                return Err(ConnectionError::Dial { host_port, source });
            }
        };

        if let Some(metrics) = &options.metrics {
            metrics
                .histogram("connection_latency_seconds")
                .record(started.elapsed().as_secs_f64());
        }
        if let Some(logger) = &options.logger {
            logger.info(
                "Connected to Temporal",
                &[("host_port", &host_port), ("namespace", &namespace)],
            );
        }

        Ok(Self {
            channel,
            metadata,
            host_port,
            namespace,
            metrics: options.metrics,
            logger: options.logger,
        })
    }

    pub fn host_port(&self) -> &str {
        &self.host_port
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The raw channel, without request metadata.
    pub fn channel(&self) -> Channel {
        self.channel.clone()
    }

    /// The channel wrapped so every call carries namespace and credentials.
    /// Generated Temporal clients are built on top of this.
    pub fn intercepted(&self) -> InterceptedService<Channel, RequestMetadata> {
        InterceptedService::new(self.channel.clone(), self.metadata.clone())
    }

    /// Ask the frontend's `grpc.health.v1` service whether `service` is serving.
    pub async fn check_health(&self, service: &str) -> Result<(), ConnectionError> {
        let mut client = HealthClient::new(self.intercepted());
        let result = client
            .check(HealthCheckRequest {
                service: service.to_string(),
            })
            .await
            .map_err(ConnectionError::from)
            .and_then(|response| {
                let status = response.into_inner().status();
                if status == ServingStatus::Serving {
                    Ok(())
                } else {
                    Err(ConnectionError::NotServing {
                        service: service.to_string(),
                        status,
                    })
                }
            });

        if let Some(metrics) = &self.metrics {
            let status = if result.is_ok() { "healthy" } else { "unhealthy" };
            metrics
                .counter_with_labels("health_checks", vec![Label::new("status", status)])
                .increment(1);
        }
        if let (Err(e), Some(logger)) = (&result, &self.logger) {
            logger.warn("Temporal health check failed", &[("error", &e.to_string())]);
        }

        result
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("host_port", &self.host_port)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// Apply `opts` on top of `initial` and dial.
///
/// A failing option is returned unchanged and no connection is attempted.
pub async fn connect_with<I>(mut initial: ClientOptions, opts: I) -> Result<Connection, ConnectionError>
where
    I: IntoIterator<Item = ClientOption>,
{
    apply_options(&mut initial, opts)?;
    Connection::dial(initial).await
}

/// Dial with only the given options applied to the defaults.
pub async fn new_connection<I>(opts: I) -> Result<Connection, ConnectionError>
where
    I: IntoIterator<Item = ClientOption>,
{
    connect_with(ClientOptions::default(), opts).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_carries_namespace_and_api_key() {
        let options = ClientOptions {
            namespace: "orders".into(),
            identity: Some("worker-1".into()),
            credentials: Some(Credentials::ApiKey("secret".into())),
            ..ClientOptions::default()
        };
        let mut metadata = RequestMetadata::new(&options).unwrap();
        let request = metadata.call(Request::new(())).unwrap();

        let headers = request.metadata();
        assert_eq!(headers.get("temporal-namespace").unwrap(), "orders");
        assert_eq!(headers.get("client-identity").unwrap(), "worker-1");
        assert_eq!(headers.get("authorization").unwrap(), "Bearer secret");
    }

    #[test]
    fn metadata_defaults_namespace() {
        let mut metadata = RequestMetadata::new(&ClientOptions::default()).unwrap();
        let request = metadata.call(Request::new(())).unwrap();
        assert_eq!(request.metadata().get("temporal-namespace").unwrap(), "default");
        assert!(request.metadata().get("authorization").is_none());
    }

    #[test]
    fn non_ascii_api_key_is_rejected_without_echo() {
        let options = ClientOptions {
            credentials: Some(Credentials::ApiKey("sécret\n".into())),
            ..ClientOptions::default()
        };
        let err = RequestMetadata::new(&options).unwrap_err();
        assert!(!err.to_string().contains("sécret"));
    }
}
