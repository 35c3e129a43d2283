//! ZestKV Server Binary
//!
//! Starts the TCP server for ZestKV.

use std::sync::Arc;
use clap::Parser;
use zestkv::{Config, Engine};
use zestkv::network::Server;
use tracing_subscriber::{fmt, EnvFilter};

/// ZestKV Server
#[derive(Parser, Debug)]
#[command(name = "zestkv-server")]
#[command(about = "In-memory key-value server with sorted sets and TTLs")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Close connections idle for this many milliseconds (0 disables)
    #[arg(short, long, default_value = "5000")]
    idle_timeout_ms: u64,

    /// Drop clients that stop reading replies for this long (0 disables)
    #[arg(long, default_value = "5000")]
    write_timeout_ms: u64,

    /// Largest request or reply frame in bytes
    #[arg(long, default_value = "33554432")]
    max_frame_size: usize,

    /// Most arguments accepted in one request
    #[arg(long, default_value = "200000")]
    max_args: usize,

    /// Interval between background expiration sweeps
    #[arg(short, long, default_value = "100")]
    reap_interval_ms: u64,

    /// Maximum keys removed per sweep batch
    #[arg(long, default_value = "2000")]
    reap_batch_limit: usize,

    /// Sorted sets larger than this are freed off the request path
    #[arg(long, default_value = "1000")]
    lazy_free_threshold: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,zestkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("ZestKV Server v{}", zestkv::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    let config = build_config(&args);

    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized");

    let mut server = Server::new(config, engine);
    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

fn build_config(args: &Args) -> Config {
    Config::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .idle_timeout_ms(args.idle_timeout_ms)
        .write_timeout_ms(args.write_timeout_ms)
        .max_frame_size(args.max_frame_size)
        .max_args(args.max_args)
        .reap_interval_ms(args.reap_interval_ms)
        .reap_batch_limit(args.reap_batch_limit)
        .lazy_free_threshold(args.lazy_free_threshold)
        .build()
}
