//! HTTP health-check endpoint backed by the Temporal connection.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, routing::get, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::errors::BoxError;
use crate::temporal::connection::{Connection, WORKFLOW_SERVICE};

/// A health check slower than this counts as down.
const CHECK_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("invalid health check address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        source: std::net::AddrParseError,
    },

    #[error("failed to bind health check listener on {address}: {source}")]
    Bind {
        address: SocketAddr,
        source: std::io::Error,
    },

    #[error("health check server failed: {0}")]
    Serve(#[source] std::io::Error),
}

/// Something the endpoint can ask "are you up?".
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self) -> Result<(), BoxError>;
}

#[async_trait]
impl HealthProbe for Connection {
    async fn probe(&self) -> Result<(), BoxError> {
        self.check_health(WORKFLOW_SERVICE).await?;
        Ok(())
    }
}

/// Probes a connection against a specific gRPC service name.
#[derive(Debug, Clone)]
pub struct ServiceProbe {
    connection: Connection,
    service: String,
}

impl ServiceProbe {
    pub fn new(connection: Connection, service: impl Into<String>) -> Self {
        Self {
            connection,
            service: service.into(),
        }
    }
}

#[async_trait]
impl HealthProbe for ServiceProbe {
    async fn probe(&self) -> Result<(), BoxError> {
        self.connection.check_health(&self.service).await?;
        Ok(())
    }
}

/// `GET /health` answering `OK` or `Down`.
pub fn health_router(probe: Arc<dyn HealthProbe>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(probe)
        .layer(TraceLayer::new_for_http())
}

async fn health_handler(State(probe): State<Arc<dyn HealthProbe>>) -> (StatusCode, &'static str) {
    let error = match tokio::time::timeout(CHECK_TIMEOUT, probe.probe()).await {
        Ok(Ok(())) => {
            tracing::debug!("Temporal connection healthy");
            return (StatusCode::OK, "OK");
        }
        Ok(Err(e)) => e.to_string(),
        Err(_) => format!("no answer within {CHECK_TIMEOUT:?}"),
    };

    tracing::error!(error = %error, "Temporal connection unhealthy");
    (StatusCode::SERVICE_UNAVAILABLE, "Down")
}

/// Bind `address` and serve the health endpoint until the listener fails.
pub async fn serve_health_check(address: &str, probe: Arc<dyn HealthProbe>) -> Result<(), HealthError> {
    let address: SocketAddr = address.parse().map_err(|source| HealthError::InvalidAddress {
        address: address.to_string(),
        source,
    })?;
    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| HealthError::Bind { address, source })?;

    axum::serve(listener, health_router(probe))
        .await
        .map_err(HealthError::Serve)
}

/// Run [`serve_health_check`] on a background task.
pub fn spawn_health_check(address: impl Into<String>, probe: Arc<dyn HealthProbe>) -> JoinHandle<()> {
    let address = address.into();
    tokio::spawn(async move {
        tracing::info!(address = %address, "Starting healthcheck service");
        if let Err(e) = serve_health_check(&address, probe).await {
            tracing::error!(error = %e, "Healthcheck service stopped");
        }
    })
}
