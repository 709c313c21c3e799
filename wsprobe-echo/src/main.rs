//! `wsprobe-echo`: WebSocket echo server for trying out `wsprobe`.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 127.0.0.1:9000
//! cargo run --bin wsprobe-echo
//!
//! # Wrap replies as JSON envelopes on a custom address
//! cargo run --bin wsprobe-echo -- --bind 0.0.0.0:8080 --wrap
//! ```

use clap::Parser;
use wsprobe_echo::config::{EchoCliArgs, EchoConfig};
use wsprobe_echo::server;

#[tokio::main]
async fn main() {
    let cli = EchoCliArgs::parse();

    let config = match EchoConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, wrap = config.wrap, "starting echo server");

    match server::start_server(&config.bind_addr, config.options()).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "echo server listening on ws://{bound_addr}/ws");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "echo server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start echo server");
            std::process::exit(1);
        }
    }
}
