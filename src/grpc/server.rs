//! gRPC server and CLI scaffold.
//!
//! # Responsibilities
//! - Build the CLI: root command (serve mode) and `run` (run mode)
//! - Apply the log level before anything else runs
//! - Serve mode: bind, add health + reflection, apply factories, serve
//! - Run mode: call one registered command directly and log its response

use std::ffi::OsString;
use std::fmt::Debug;
use std::future::Future;
use std::net::Ipv4Addr;

use clap::builder::PossibleValuesParser;
use clap::error::ErrorKind;
use clap::{Arg, ArgMatches};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::service::RoutesBuilder;
use tonic::transport::Server;
use tonic_health::ServingStatus;

use crate::config::ServerConfig;
use crate::errors::{BoxError, ExitError, FatalError};
use crate::grpc::command::{Listener, RunCommand};
use crate::grpc::options::ServerOption;
use crate::lifecycle::shutdown_signal;
use crate::net::TlsError;
use crate::observability::{all_levels, Logger, LoggerError, LEVELS};

const RUN_ABOUT: &str = "Debug a gRPC command by running it as single, standalone calls";

const RUN_LONG_ABOUT: &str = "Debug a gRPC command by running it as single, standalone calls. \
Configure all your input parameters as flags and watch it fly.

Any response from the command will be sent to the console. In production, this will be returned via gRPC.";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to start listener on port {port}: {source}")]
    Bind { port: u16, source: std::io::Error },

    #[error("failed to read listener address: {0}")]
    LocalAddr(#[source] std::io::Error),

    #[error("failed to load TLS material: {0}")]
    TlsFiles(#[from] TlsError),

    #[error("invalid TLS configuration: {0}")]
    Tls(#[source] tonic::transport::Error),

    #[error("gRPC server error: {0}")]
    Transport(#[source] tonic::transport::Error),

    #[error("failed to build reflection service: {0}")]
    Reflection(#[from] tonic_reflection::server::Error),

    #[error(transparent)]
    Logger(#[from] LoggerError),

    #[error("invalid command line arguments: {0}")]
    Cli(#[from] clap::Error),

    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    #[error("command {name:?} failed: {source}")]
    Command { name: String, source: BoxError },
}

impl From<ServerError> for ExitError {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::Bind { port, source } => FatalError::new("Failed to start listener")
                .with_cause(source)
                .with_params(move |event| event.field("port", port))
                .into(),
            ServerError::Command { name, source } => match source.downcast::<FatalError>() {
                Ok(fatal) => ExitError::Fatal(*fatal),
                Err(source) => FatalError::default()
                    .with_cause(source)
                    .with_params(move |event| event.str("command", name.clone()))
                    .into(),
            },
            other => ExitError::other(other),
        }
    }
}

/// Binds application services to the server before it starts.
pub type ServerFactory = Box<dyn Fn(&mut ServiceRegistry) + Send + Sync>;

/// What a [`ServerFactory`] can touch: the route table and the health service.
#[derive(Default)]
pub struct ServiceRegistry {
    routes: RoutesBuilder,
    serving: Vec<String>,
}

impl ServiceRegistry {
    /// Route table to add generated `*Server` services to.
    pub fn routes_mut(&mut self) -> &mut RoutesBuilder {
        &mut self.routes
    }

    /// Report `service_name` (the fully qualified proto service) as SERVING
    /// in `grpc.health.v1`.
    pub fn set_serving(&mut self, service_name: impl Into<String>) -> &mut Self {
        self.serving.push(service_name.into());
        self
    }

    pub fn serving(&self) -> &[String] {
        &self.serving
    }
}

/// A gRPC service with a CLI around it.
///
/// The root command serves; `run <command>` calls a single registered
/// command directly.
pub struct GrpcServer {
    name: String,
    description: String,
    logger: Logger,
    config: ServerConfig,
    options: Vec<ServerOption>,
    factories: Vec<ServerFactory>,
    commands: Vec<RunCommand>,
}

impl GrpcServer {
    pub fn new(name: impl Into<String>, description: impl Into<String>, logger: Logger) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            logger,
            config: ServerConfig::default(),
            options: Vec::new(),
            factories: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// Use `config` for the default port, reflection and transport settings.
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Extra server options, applied after those derived from the config.
    pub fn with_options(mut self, options: impl IntoIterator<Item = ServerOption>) -> Self {
        self.options.extend(options);
        self
    }

    pub fn with_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&mut ServiceRegistry) + Send + Sync + 'static,
    {
        self.factories.push(Box::new(factory));
        self
    }

    /// Register a command for run mode under `run <name>`.
    ///
    /// Flags declared by the listener must not reuse `-l` or `-p`.
    pub fn command<T>(mut self, name: impl Into<String>, listener: Listener<T>) -> Self
    where
        T: Debug + Send + 'static,
    {
        self.commands.push(RunCommand::new(name, listener));
        self
    }

    /// The full command tree.
    pub fn cli(&self) -> clap::Command {
        let run = self.commands.iter().fold(
            clap::Command::new("run")
                .about(RUN_ABOUT)
                .long_about(RUN_LONG_ABOUT)
                .subcommand_required(true)
                .arg_required_else_help(true),
            |run, command| run.subcommand(command.cli()),
        );

        clap::Command::new(self.name.clone())
            .about(self.description.clone())
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .global(true)
                    .value_parser(PossibleValuesParser::new(LEVELS))
                    .default_value(self.logger.level_name())
                    .help(format!("log level: {}", all_levels())),
            )
            .arg(
                Arg::new("port")
                    .short('p')
                    .long("port")
                    .value_parser(clap::value_parser!(u16))
                    .default_value(self.config.port.to_string())
                    .help("The server port"),
            )
            .subcommand(run)
    }

    /// Parse the process arguments, run, and return the exit code.
    pub async fn execute(self) -> i32 {
        self.execute_from(std::env::args_os()).await
    }

    pub async fn execute_from<I, A>(self, args: I) -> i32
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString> + Clone,
    {
        crate::errors::handle_fatal_error(self.try_execute_from(args).await)
    }

    pub async fn try_execute_from<I, A>(self, args: I) -> Result<(), ExitError>
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString> + Clone,
    {
        let matches = match self.cli().try_get_matches_from(args) {
            Ok(matches) => matches,
            Err(err) => {
                print_usage(&err);
                return match err.kind() {
                    ErrorKind::DisplayHelp
                    | ErrorKind::DisplayVersion
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => Ok(()),
                    _ => Err(ServerError::Cli(err).into()),
                };
            }
        };

        if let Some(level) = matches.get_one::<String>("log-level") {
            self.logger.set_level(level).map_err(ServerError::from)?;
        }

        let result = match matches.subcommand() {
            Some(("run", run_matches)) => self.run_command(run_matches).await,
            _ => {
                let port = matches
                    .get_one::<u16>("port")
                    .copied()
                    .unwrap_or(self.config.port);
                self.serve(port).await
            }
        };
        result.map_err(ExitError::from)
    }

    async fn run_command(&self, matches: &ArgMatches) -> Result<(), ServerError> {
        let Some((name, command_matches)) = matches.subcommand() else {
            return Ok(());
        };

        let command = self
            .commands
            .iter()
            .find(|command| command.name == name)
            .ok_or_else(|| ServerError::UnknownCommand(name.to_string()))?;

        tracing::debug!(command = name, "Running command");
        command
            .invoke(command_matches.clone())
            .await
            .map_err(|source| ServerError::Command {
                name: name.to_string(),
                source,
            })
    }

    /// Bind `0.0.0.0:<port>` and serve until a shutdown signal arrives.
    pub async fn serve(self, port: u16) -> Result<(), ServerError> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map_err(|source| ServerError::Bind { port, source })?;

        self.serve_with_listener(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `signal` resolves.
    pub async fn serve_with_listener<F>(self, listener: TcpListener, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let address = listener.local_addr().map_err(ServerError::LocalAddr)?;

        let mut options = self.config.server_options()?;
        options.extend(self.options);

        let mut descriptor_sets = vec![tonic_health::pb::FILE_DESCRIPTOR_SET];
        let mut server = Server::builder();
        for option in options {
            if let ServerOption::FileDescriptorSet(set) = option {
                descriptor_sets.push(set);
                continue;
            }
            server = option.apply(server)?;
        }

        let (health_reporter, health_service) = tonic_health::server::health_reporter();
        let mut registry = ServiceRegistry::default();
        registry.routes.add_service(health_service);

        if self.config.reflection {
            registry
                .routes
                .add_service(reflection_builder(&descriptor_sets).build_v1()?);
            registry
                .routes
                .add_service(reflection_builder(&descriptor_sets).build_v1alpha()?);
        }

        for factory in &self.factories {
            factory(&mut registry);
        }

        for service in &registry.serving {
            health_reporter
                .set_service_status(service, ServingStatus::Serving)
                .await;
        }

        let services = registry.serving.len();
        let router = server.add_routes(registry.routes.routes());

        tracing::info!(address = %address, services, "Server listening");
        router
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), signal)
            .await
            .map_err(ServerError::Transport)?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

fn reflection_builder<'b>(descriptor_sets: &[&'b [u8]]) -> tonic_reflection::server::Builder<'b> {
    descriptor_sets
        .iter()
        .fold(tonic_reflection::server::Builder::configure(), |builder, set| {
            builder.register_encoded_file_descriptor_set(set)
        })
}

/// Write clap's help, version or usage error to the terminal.
fn print_usage(err: &clap::Error) {
    if let Err(e) = err.print() {
        tracing::debug!(error = %e, "Failed to print usage");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    fn server() -> GrpcServer {
        GrpcServer::new("basic", "Basic example", Logger::detached(LevelFilter::INFO))
            .command("command1", Listener::new(|_| async { Ok::<_, BoxError>("done") }))
    }

    #[test]
    fn cli_has_global_log_level_and_port() {
        let cli = server().cli();
        cli.clone().debug_assert();

        let matches = cli
            .try_get_matches_from(["basic", "-p", "4000", "-l", "debug"])
            .unwrap();
        assert_eq!(matches.get_one::<u16>("port"), Some(&4000));
        assert_eq!(matches.get_one::<String>("log-level").map(String::as_str), Some("debug"));
    }

    #[test]
    fn port_defaults_to_config() {
        let matches = server().cli().try_get_matches_from(["basic"]).unwrap();
        assert_eq!(matches.get_one::<u16>("port"), Some(&3000));
    }

    #[test]
    fn log_level_is_accepted_after_run() {
        let matches = server()
            .cli()
            .try_get_matches_from(["basic", "run", "command1", "--log-level", "trace"])
            .unwrap();
        assert_eq!(matches.get_one::<String>("log-level").map(String::as_str), Some("trace"));
    }

    #[test]
    fn log_level_is_case_sensitive() {
        let err = server()
            .cli()
            .try_get_matches_from(["basic", "--log-level", "DEBUG"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn bind_error_becomes_fatal_error() {
        let err = ServerError::Bind {
            port: 3000,
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
        };
        match ExitError::from(err) {
            ExitError::Fatal(fatal) => assert_eq!(fatal.msg, "Failed to start listener"),
            ExitError::Other(other) => panic!("expected fatal error, got {other}"),
        }
    }

    #[tokio::test]
    async fn help_exits_cleanly() {
        assert_eq!(server().execute_from(["basic", "--help"]).await, 0);
    }

    #[tokio::test]
    async fn unknown_flag_exits_with_failure() {
        assert_eq!(server().execute_from(["basic", "--no-such-flag"]).await, 1);
    }
}
