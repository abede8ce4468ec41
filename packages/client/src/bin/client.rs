//! Interactive Hiroba client with reconnection support.
//!
//! Sends each typed line as one message and prints broadcasts as
//! `[server] ...` / `[client] ...` and refusals as `! rejected: <reason>`.
//! Automatically reconnects on disconnection (max 5 attempts with 5 second
//! interval). Rejected credentials end the client immediately.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-client -- --token s3cret --name alice
//! CLIENT_TOKEN=s3cret cargo run --bin hiroba-client -- -u ws://127.0.0.1:3000/ws
//! ```

use clap::Parser;

use hiroba_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hiroba-client")]
#[command(about = "Interactive client for the Hiroba broadcast server", long_about = None)]
struct Args {
    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:3000/ws")]
    url: String,

    /// Shared client token
    #[arg(short = 't', long, env = "CLIENT_TOKEN", hide_env_values = true)]
    token: String,

    /// Display name (defaults to the connection id assigned by the server)
    #[arg(short = 'n', long)]
    name: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    // Run the client
    if let Err(e) = hiroba_client::run_client(args.url, args.token, args.name).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
