//! dispatchkv Server Binary
//!
//! Starts the TCP server for dispatchkv.

use std::sync::Arc;

use clap::Parser;
use dispatchkv::{Config, KvStore, Server};
use tracing_subscriber::{fmt, EnvFilter};

/// dispatchkv Server
#[derive(Parser, Debug)]
#[command(name = "dispatchkv-server")]
#[command(about = "In-memory key-value server with a single dispatcher thread")]
#[command(version)]
struct Args {
    /// Listen address (host:port, or :port for all interfaces)
    #[arg(short, long, default_value = dispatchkv::config::DEFAULT_LISTEN_ADDR)]
    listen: String,

    /// Largest partial frame buffered per connection, in KB
    #[arg(short = 'f', long, default_value = "16384")]
    max_frame_kb: usize,

    /// Socket read buffer per connection, in bytes
    #[arg(short, long, default_value = "4096")]
    read_buffer: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,dispatchkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("dispatchkv Server v{}", dispatchkv::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .listen_addr(&args.listen)
        .max_frame_kb(args.max_frame_kb)
        .read_buffer_size(args.read_buffer)
        .build();

    let server = match Server::bind(config, Arc::new(KvStore::new())) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
