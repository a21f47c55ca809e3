//! Server-level options applied before the gRPC server is built.

use std::time::Duration;

use tonic::transport::{Server, ServerTlsConfig};

use crate::grpc::ServerError;

/// One adjustment to the tonic server builder.
///
/// Options are applied in the order given; a later option of the same kind
/// replaces an earlier one.
#[derive(Debug, Clone)]
pub enum ServerOption {
    /// Per-request timeout.
    Timeout(Duration),
    /// Maximum in-flight requests per connection.
    ConcurrencyLimitPerConnection(usize),
    Http2KeepaliveInterval(Duration),
    Http2KeepaliveTimeout(Duration),
    /// Maximum concurrent HTTP/2 streams per connection.
    MaxConcurrentStreams(u32),
    /// Serve over TLS.
    Tls(ServerTlsConfig),
    /// Encoded `FileDescriptorSet` exposed through server reflection.
    FileDescriptorSet(&'static [u8]),
}

impl ServerOption {
    pub(crate) fn apply(self, server: Server) -> Result<Server, ServerError> {
        let server = match self {
            Self::Timeout(timeout) => server.timeout(timeout),
            Self::ConcurrencyLimitPerConnection(limit) => server.concurrency_limit_per_connection(limit),
            Self::Http2KeepaliveInterval(interval) => server.http2_keepalive_interval(Some(interval)),
            Self::Http2KeepaliveTimeout(timeout) => server.http2_keepalive_timeout(Some(timeout)),
            Self::MaxConcurrentStreams(max) => server.max_concurrent_streams(Some(max)),
            Self::Tls(tls) => server.tls_config(tls).map_err(ServerError::Tls)?,
            // Consumed by the reflection service, not the transport.
            Self::FileDescriptorSet(_) => server,
        };
        Ok(server)
    }
}
