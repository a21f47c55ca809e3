//! `basic`: a small gRPC service showing how the helpers fit together.
//!
//! ```text
//! basic [--port 3000] [--log-level info]     serve BasicService + health + reflection
//! basic run command1 --input X               call Command1 directly
//! basic run command2 --input1 A --input2 B   stream Command2 to the log
//! ```

use service_helpers::basic::{self, Commands};
use service_helpers::grpc::GrpcServer;
use service_helpers::observability::{Logger, LoggingConfig};

const NAME: &str = "basic";
const DESCRIPTION: &str = "Basic example gRPC service to simulate how the library works";

#[tokio::main]
async fn main() {
    let logger = match Logger::init(&LoggingConfig::default()) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("failed to initialise logging: {e}");
            std::process::exit(1);
        }
    };

    let commands = Commands::new("root:password@localhost:3306");

    let server = GrpcServer::new(NAME, DESCRIPTION, logger)
        .with_factory(basic::factory(commands.clone()))
        .command("command1", basic::command1_listener(commands.clone()))
        .command("command2", basic::command2_listener(commands));

    std::process::exit(server.execute().await);
}
