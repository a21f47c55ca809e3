//! `basic.v1.BasicService`: the example service served by the `basic` bin.
//!
//! # Data Flow
//! ```text
//! serve mode:  client → BasicServiceServer → Commands::command1
//!                                          → Commands::command2 → ChannelStream → client
//! run mode:    basic run command1 --input X → Commands::command1 → log
//!              basic run command2 ...       → Commands::command2 → LogStream → log
//! ```
//!
//! # Design Decisions
//! - One `Commands` value backs both modes, so the handlers are written once
//! - An empty input is rejected with `INVALID_ARGUMENT`

pub mod proto;

use clap::{Arg, ArgMatches};
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};

use crate::errors::BoxError;
use crate::grpc::{ChannelStream, Listener, LogStream, ServiceRegistry, StreamSink};

pub use proto::basic_service_client::BasicServiceClient;
pub use proto::basic_service_server::{BasicService, BasicServiceServer, SERVICE_NAME};
pub use proto::{Command1Request, Command1Response, Command2Request, Command2Response};

/// Messages buffered per `Command2` stream before the handler waits on the client.
const STREAM_BUFFER: usize = 8;

/// The service's handlers.
#[derive(Debug, Clone)]
pub struct Commands {
    db: String,
}

impl Commands {
    /// `conn` stands in for a database connection string.
    pub fn new(conn: impl Into<String>) -> Self {
        Self { db: conn.into() }
    }

    fn execute(&self, cmd: &str) -> Result<String, Status> {
        if cmd.is_empty() {
            return Err(Status::invalid_argument("input must not be empty"));
        }
        Ok(format!("This has executed {cmd} and the connection is {}", self.db))
    }

    pub async fn command1(&self, request: Command1Request) -> Result<Command1Response, Status> {
        let output = self.execute(&request.input)?;
        Ok(Command1Response { output })
    }

    /// Send one response per input, in order.
    pub async fn command2(
        &self,
        request: Command2Request,
        stream: &dyn StreamSink<Command2Response>,
    ) -> Result<(), Status> {
        for input in [&request.input1, &request.input2] {
            let output = self.execute(input)?;
            stream.send(Command2Response { output }).await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl BasicService for Commands {
    async fn command1(&self, request: Request<Command1Request>) -> Result<Response<Command1Response>, Status> {
        Commands::command1(self, request.into_inner()).await.map(Response::new)
    }

    type Command2Stream = ReceiverStream<Result<Command2Response, Status>>;

    async fn command2(&self, request: Request<Command2Request>) -> Result<Response<Self::Command2Stream>, Status> {
        let (sink, stream) = ChannelStream::channel(STREAM_BUFFER);
        let commands = self.clone();
        let request = request.into_inner();

        tokio::spawn(async move {
            if let Err(status) = Commands::command2(&commands, request, &sink).await {
                if sink.fail(status).await.is_err() {
                    tracing::debug!("Client left before Command2 finished");
                }
            }
        });

        Ok(Response::new(stream))
    }
}

/// Route `BasicService` and report it as SERVING.
pub fn factory(commands: Commands) -> impl Fn(&mut ServiceRegistry) + Send + Sync + 'static {
    move |registry| {
        registry
            .routes_mut()
            .add_service(BasicServiceServer::new(commands.clone()));
        registry.set_serving(SERVICE_NAME);
    }
}

fn flag(matches: &ArgMatches, name: &str) -> String {
    matches.get_one::<String>(name).cloned().unwrap_or_default()
}

/// `run command1 --input X`
pub fn command1_listener(commands: Commands) -> Listener<Command1Response> {
    Listener::new(move |matches: ArgMatches| {
        let commands = commands.clone();
        async move {
            let request = Command1Request {
                input: flag(&matches, "input"),
            };
            Ok::<_, BoxError>(commands.command1(request).await?)
        }
    })
    .with_flags(|cmd| {
        cmd.arg(
            Arg::new("input")
                .long("input")
                .default_value("default input")
                .help("Some input"),
        )
    })
}

/// `run command2 --input1 A --input2 B`, streaming to the log.
pub fn command2_listener(commands: Commands) -> Listener<()> {
    Listener::new(move |matches: ArgMatches| {
        let commands = commands.clone();
        async move {
            let request = Command2Request {
                input1: flag(&matches, "input1"),
                input2: flag(&matches, "input2"),
            };
            commands.command2(request, &LogStream::new()).await?;
            Ok::<_, BoxError>(())
        }
    })
    .with_flags(|cmd| {
        cmd.arg(
            Arg::new("input1")
                .long("input1")
                .default_value("default input1")
                .help("Some input1"),
        )
        .arg(
            Arg::new("input2")
                .long("input2")
                .default_value("default input2")
                .help("Some input2"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    #[async_trait::async_trait]
    impl StreamSink<Command2Response> for Collect {
        async fn send(&self, item: Command2Response) -> Result<(), Status> {
            self.0.lock().unwrap().push(item.output);
            Ok(())
        }
    }

    fn commands() -> Commands {
        Commands::new("root:password@localhost:3306")
    }

    #[tokio::test]
    async fn command1_reports_the_connection() {
        let response = commands()
            .command1(Command1Request { input: "hello".into() })
            .await
            .unwrap();
        assert_eq!(
            response.output,
            "This has executed hello and the connection is root:password@localhost:3306"
        );
    }

    #[tokio::test]
    async fn command2_sends_one_message_per_input() {
        let sink = Collect::default();
        let request = Command2Request {
            input1: "A".into(),
            input2: "B".into(),
        };
        commands().command2(request, &sink).await.unwrap();

        let outputs = sink.0.into_inner().unwrap();
        assert_eq!(outputs.len(), 2);
        assert!(outputs[0].starts_with("This has executed A"));
        assert!(outputs[1].starts_with("This has executed B"));
    }

    #[tokio::test]
    async fn empty_input_is_invalid() {
        let sink = Collect::default();
        let request = Command2Request {
            input1: "A".into(),
            input2: String::new(),
        };
        let status = commands().command2(request, &sink).await.unwrap_err();

        assert_eq!(status.code(), tonic::Code::InvalidArgument);
        assert_eq!(sink.0.into_inner().unwrap().len(), 1);
    }

    #[test]
    fn listeners_declare_their_flags() {
        let command1 = command1_listener(commands());
        let command2 = command2_listener(commands());
        let server = crate::grpc::GrpcServer::new(
            "basic",
            "Basic example",
            crate::observability::Logger::detached(tracing_subscriber::filter::LevelFilter::INFO),
        )
        .command("command1", command1)
        .command("command2", command2);

        let cli = server.cli();
        let run = cli.find_subcommand("run").unwrap();
        let command2 = run.find_subcommand("command2").unwrap();
        assert!(command2.get_arguments().any(|arg| arg.get_id() == "input1"));
        assert!(command2.get_arguments().any(|arg| arg.get_id() == "input2"));
        assert!(run.find_subcommand("command1").is_some());
    }
}
