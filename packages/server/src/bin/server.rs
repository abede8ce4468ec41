//! Hiroba broadcast server.
//!
//! Without a subcommand the process is the coordinator: it starts one worker
//! process per CPU on the same port, relays operator console lines to them
//! and shuts them all down on `shutdown`, Ctrl+C or SIGTERM.
//!
//! Run with:
//! ```not_rust
//! CLIENT_TOKEN=s3cret cargo run --bin hiroba-server
//! cargo run --bin hiroba-server -- --client-token s3cret --port 3000 --workers 2
//! ```

use std::{error::Error, io};

use clap::{Parser, Subcommand};
use tokio::{io::BufReader, runtime::Builder};

use hiroba_server::{
    config::{ServerArgs, ServerConfig},
    infrastructure::channel::ChannelReader,
    ui::{
        WorkerServer, bind_listener, coordinator::default_worker_count, install_panic_hook,
        run_coordinator,
    },
};
use hiroba_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hiroba-server")]
#[command(about = "Broadcast WebSocket server with supervised worker processes", long_about = None)]
struct Cli {
    #[command(flatten)]
    server: ServerArgs,

    /// Number of worker processes (defaults to the number of CPUs)
    #[arg(short = 'w', long, env = "WORKERS")]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Supervise the workers and read the operator console (default)
    Coordinator,
    /// Serve WebSocket clients; started by the coordinator
    #[command(hide = true)]
    Worker {
        /// Slot of this worker in the coordinator's pool
        #[arg(long)]
        worker_index: usize,
    },
}

fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Command::Coordinator) {
        Command::Coordinator => coordinator_main(cli.server, cli.workers),
        Command::Worker { worker_index } => worker_main(cli.server, worker_index),
    };

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

fn coordinator_main(args: ServerArgs, workers: Option<usize>) -> Result<(), Box<dyn Error>> {
    let config = ServerConfig::try_from(args)?;
    let workers = workers.unwrap_or_else(default_worker_count);

    let runtime = Builder::new_multi_thread().enable_all().build()?;
    let result = runtime.block_on(run_coordinator(&config, workers));
    // The coordinator does not wait for its workers to drain
    runtime.shutdown_background();
    result
}

fn worker_main(args: ServerArgs, worker_index: usize) -> Result<(), Box<dyn Error>> {
    let config = ServerConfig::try_from(args)?;

    let span = tracing::info_span!("worker", index = worker_index, pid = std::process::id());
    let _entered = span.enter();
    install_panic_hook();

    let runtime = Builder::new_current_thread().enable_all().build()?;
    let result = runtime.block_on(run_worker(config, worker_index));
    // Stdin is read on a blocking thread that may still be parked
    runtime.shutdown_background();
    result
}

async fn run_worker(config: ServerConfig, worker_index: usize) -> Result<(), Box<dyn Error>> {
    let listener = bind_listener(&config.host, config.port)
        .await
        .map_err(|e| io::Error::new(e.kind(), format!("{}:{}: {}", config.host, config.port, e)))?;
    let channel = ChannelReader::new(BufReader::new(tokio::io::stdin()));

    WorkerServer::new(&config, worker_index)
        .serve(listener, channel)
        .await
}
