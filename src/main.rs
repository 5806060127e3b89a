//! Chat Relay — single-room WebSocket chat server
//!
//! Clients connect to `/ws`, announce a display name with a `join`
//! envelope, and every `message` they send afterwards is relayed to all
//! connected clients with the server's timestamp.
//!
//! Usage:
//!   chat-relay                                 # Default port 5000
//!   chat-relay --port 8080                     # Custom port
//!   chat-relay --hostname 0.0.0.0 --cors       # Public bind, allow any origin
//!   chat-relay --log-file                      # Also write ./chat-relay.log

use std::path::PathBuf;

use clap::Parser;
use relay_server::ChatRelay;
use relay_transport::{TransportConfig, TransportServer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chat-relay", about = "Chat Relay — real-time WebSocket chat server")]
struct Cli {
    /// Port to listen on (0 for OS-assigned)
    #[arg(long, default_value = "5000")]
    port: u16,

    /// Hostname to bind to
    #[arg(long, default_value = "127.0.0.1")]
    hostname: String,

    /// Allow cross-origin requests from any origin
    #[arg(long)]
    cors: bool,

    /// Maximum concurrent connections (unlimited if omitted)
    #[arg(long)]
    max_connections: Option<usize>,

    /// Largest inbound frame in bytes
    #[arg(long, default_value = "65536")]
    max_message_size: usize,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Write logs to a file (defaults to ./chat-relay.log if no path given)
    #[arg(long, default_missing_value = "DEFAULT", num_args = 0..=1)]
    log_file: Option<String>,
}

fn init_tracing(cli: &Cli) {
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let Some(log_file_arg) = cli.log_file.as_deref() else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return;
    };

    let log_path = if log_file_arg == "DEFAULT" {
        PathBuf::from("chat-relay.log")
    } else {
        PathBuf::from(log_file_arg)
    };

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    match std::fs::OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .init();
            eprintln!("Logging to {}", log_path.display());
        }
        Err(e) => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            error!("Failed to open log file {}: {e}", log_path.display());
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = TransportConfig {
        port: cli.port,
        hostname: cli.hostname.clone(),
        enable_cors: cli.cors,
        max_connections: cli.max_connections,
        max_message_size: cli.max_message_size,
    };

    let mut transport = match TransportServer::start(config, ChatRelay::new()).await {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to start transport: {e}");
            std::process::exit(1);
        }
    };

    info!(
        "Chat relay ready on ws://{}:{}/ws (health: http://{}:{}/health)",
        cli.hostname,
        transport.port(),
        cli.hostname,
        transport.port()
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }

    info!("Shutting down...");
    transport.stop().await;
}
