mod common;

use service_helpers::basic::{
    self, BasicServiceClient, Command1Request, Command2Request, Commands, SERVICE_NAME,
};
use service_helpers::config::ServerConfig;
use service_helpers::grpc::GrpcServer;
use service_helpers::observability::Logger;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tonic::transport::Channel;
use tonic::Code;
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;
use tonic_health::pb::HealthCheckRequest;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;

fn server() -> GrpcServer {
    GrpcServer::new("basic", "Basic example", Logger::detached(LevelFilter::INFO))
        .with_factory(basic::factory(Commands::new("db")))
}

async fn channel(address: std::net::SocketAddr) -> Channel {
    Channel::from_shared(format!("http://{address}"))
        .unwrap()
        .connect()
        .await
        .unwrap()
}

async fn health_client(address: std::net::SocketAddr) -> HealthClient<Channel> {
    HealthClient::new(channel(address).await)
}

async fn status(client: &mut HealthClient<Channel>, service: &str) -> Result<ServingStatus, tonic::Status> {
    let response = client
        .check(HealthCheckRequest {
            service: service.to_string(),
        })
        .await?;
    Ok(response.into_inner().status())
}

#[tokio::test]
async fn port_in_use_is_fatal() {
    let (capture, _guard) = common::capture();
    let occupied = TcpListener::bind("0.0.0.0:0").await.unwrap();
    let port = occupied.local_addr().unwrap().port();

    let code = server().execute_from(["basic", "--port", &port.to_string()]).await;

    assert_eq!(code, 1);
    let event = capture.find("Failed to start listener").unwrap();
    assert_eq!(event.level, Level::ERROR);
    assert!(event.field("error").is_some());
    assert_eq!(event.field("fields"), Some(format!(r#"{{"port":{port}}}"#).as_str()));
}

#[tokio::test]
async fn health_reports_server_and_registered_services() {
    let listener = common::local_listener().await;
    let address = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let serving = tokio::spawn(server().serve_with_listener(listener, async {
        let _ = stopped.await;
    }));

    let mut client = health_client(address).await;
    assert_eq!(status(&mut client, "").await.unwrap(), ServingStatus::Serving);
    assert_eq!(status(&mut client, SERVICE_NAME).await.unwrap(), ServingStatus::Serving);
    assert_eq!(
        status(&mut client, "not.registered.Service").await.unwrap_err().code(),
        Code::NotFound
    );

    drop(client);
    stop.send(()).unwrap();
    serving.await.unwrap().unwrap();
}

#[tokio::test]
async fn factory_services_answer_over_the_wire() {
    let listener = common::local_listener().await;
    let address = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let serving = tokio::spawn(server().serve_with_listener(listener, async {
        let _ = stopped.await;
    }));

    let mut client = BasicServiceClient::new(channel(address).await);

    let response = client
        .command1(Command1Request { input: "hello".into() })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(response.output, "This has executed hello and the connection is db");

    let mut stream = client
        .command2(Command2Request {
            input1: "A".into(),
            input2: "B".into(),
        })
        .await
        .unwrap()
        .into_inner();
    let mut outputs = Vec::new();
    while let Some(message) = stream.message().await.unwrap() {
        outputs.push(message.output);
    }
    assert_eq!(
        outputs,
        [
            "This has executed A and the connection is db",
            "This has executed B and the connection is db",
        ]
    );

    drop(client);
    stop.send(()).unwrap();
    serving.await.unwrap().unwrap();
}

#[tokio::test]
async fn stream_error_reaches_the_client_after_earlier_messages() {
    let listener = common::local_listener().await;
    let address = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let serving = tokio::spawn(server().serve_with_listener(listener, async {
        let _ = stopped.await;
    }));

    let mut client = BasicServiceClient::new(channel(address).await);
    let mut stream = client
        .command2(Command2Request {
            input1: "A".into(),
            input2: String::new(),
        })
        .await
        .unwrap()
        .into_inner();

    let first = stream.message().await.unwrap().unwrap();
    assert!(first.output.starts_with("This has executed A"));
    let status = stream.message().await.unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    let unary = client
        .command1(Command1Request { input: String::new() })
        .await
        .unwrap_err();
    assert_eq!(unary.code(), Code::InvalidArgument);

    drop(client);
    stop.send(()).unwrap();
    serving.await.unwrap().unwrap();
}

#[tokio::test]
async fn server_logs_listening_address() {
    let (capture, _guard) = common::capture();
    let listener = common::local_listener().await;
    let address = listener.local_addr().unwrap();

    // Already-resolved signal: the server starts, then stops right away.
    server()
        .serve_with_listener(listener, async {})
        .await
        .unwrap();

    let event = capture.find("Server listening").unwrap();
    assert_eq!(event.field("address"), Some(address.to_string().as_str()));
    assert!(capture.find("Server stopped").is_some());
}

#[tokio::test]
async fn reflection_can_be_disabled() {
    let listener = common::local_listener().await;
    let config = ServerConfig {
        reflection: false,
        ..ServerConfig::default()
    };

    let result = GrpcServer::new("basic", "Basic example", Logger::detached(LevelFilter::INFO))
        .with_config(config)
        .serve_with_listener(listener, async {})
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn unreadable_tls_material_fails_before_serving() {
    let listener = common::local_listener().await;
    let config = ServerConfig {
        tls: Some(service_helpers::config::TlsConfig {
            cert_path: "/nonexistent/cert.pem".into(),
            key_path: "/nonexistent/key.pem".into(),
        }),
        ..ServerConfig::default()
    };

    let result = GrpcServer::new("basic", "Basic example", Logger::detached(LevelFilter::INFO))
        .with_config(config)
        .serve_with_listener(listener, async {})
        .await;
    assert!(matches!(result, Err(service_helpers::grpc::ServerError::TlsFiles(_))));
}
