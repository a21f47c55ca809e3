//! Temporal frontend connection and its health endpoint.
//!
//! # Data Flow
//! ```text
//! ClientOptions::default() (or caller's initial value)
//!     → options.rs: ClientOption values applied in order, first failure aborts
//!     → connection.rs: Endpoint (http/https), dial, RequestMetadata interceptor
//!     → Connection
//!         → check_health(service)       grpc.health.v1 on the frontend
//!         → health.rs: GET /health      200 OK / 503 Down
//! ```
//!
//! # Design Decisions
//! - Options are plain values, so a list of them can be built from config and inspected
//! - Credentials: an API key beats a certificate pair
//! - The connection is a bare gRPC channel; generated Temporal clients wrap `intercepted()`

pub mod connection;
pub mod health;
pub mod logger;
pub mod options;

pub use connection::{connect_with, new_connection, Connection, ConnectionError, RequestMetadata, WORKFLOW_SERVICE};
pub use health::{health_router, serve_health_check, spawn_health_check, HealthError, HealthProbe, ServiceProbe};
pub use logger::{ClientLogger, TracingLogger};
pub use options::{
    apply_options, ClientOption, ClientOptions, ConnectionOptions, Credentials, DEFAULT_HOST_PORT,
    DEFAULT_NAMESPACE,
};
