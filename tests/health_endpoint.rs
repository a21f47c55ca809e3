mod common;

use std::sync::Arc;
use std::time::Duration;

use service_helpers::temporal::{
    new_connection, spawn_health_check, ClientOption, HealthProbe, ServiceProbe, WORKFLOW_SERVICE,
};
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic_health::ServingStatus;

async fn start_frontend(status: ServingStatus) -> String {
    let listener = common::local_listener().await;
    let address = listener.local_addr().unwrap().to_string();
    let (reporter, service) = tonic_health::server::health_reporter();
    reporter.set_service_status(WORKFLOW_SERVICE, status).await;

    tokio::spawn(
        Server::builder()
            .add_service(service)
            .serve_with_incoming(TcpListenerStream::new(listener)),
    );
    address
}

/// GET /health, retrying while the endpoint starts up.
async fn get_health(port: u16) -> (u16, String) {
    let url = format!("http://127.0.0.1:{port}/health");
    let client = reqwest::Client::new();
    for _ in 0..50 {
        if let Ok(response) = client.get(&url).send().await {
            let status = response.status().as_u16();
            return (status, response.text().await.unwrap());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("health endpoint on port {port} never came up");
}

async fn serve(probe: Arc<dyn HealthProbe>) -> u16 {
    let port = common::free_port().await;
    spawn_health_check(format!("127.0.0.1:{port}"), probe);
    port
}

#[tokio::test]
async fn serving_frontend_is_ok() {
    let address = start_frontend(ServingStatus::Serving).await;
    let connection = new_connection([ClientOption::HostPort(address)]).await.unwrap();

    let port = serve(Arc::new(connection)).await;

    assert_eq!(get_health(port).await, (200, "OK".to_string()));
}

#[tokio::test]
async fn not_serving_frontend_is_down() {
    let address = start_frontend(ServingStatus::NotServing).await;
    let connection = new_connection([ClientOption::HostPort(address)]).await.unwrap();

    let port = serve(Arc::new(connection)).await;

    assert_eq!(get_health(port).await, (503, "Down".to_string()));
}

#[tokio::test]
async fn service_probe_checks_the_named_service() {
    let address = start_frontend(ServingStatus::Serving).await;
    let connection = new_connection([ClientOption::HostPort(address)]).await.unwrap();

    let healthy = ServiceProbe::new(connection.clone(), WORKFLOW_SERVICE);
    assert!(healthy.probe().await.is_ok());

    let unknown = ServiceProbe::new(connection, "temporal.api.operatorservice.v1.OperatorService");
    assert!(unknown.probe().await.is_err());
}

#[tokio::test]
async fn unhealthy_request_is_logged() {
    let (capture, _guard) = common::capture();
    let address = start_frontend(ServingStatus::NotServing).await;
    let connection = new_connection([ClientOption::HostPort(address)]).await.unwrap();

    let port = serve(Arc::new(connection)).await;
    assert_eq!(get_health(port).await.0, 503);

    let event = capture.find("Temporal connection unhealthy").unwrap();
    assert_eq!(event.level, tracing::Level::ERROR);
    assert!(capture.find("Starting healthcheck service").is_some());
}
