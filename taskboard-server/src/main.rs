//! `Taskboard` store server.
//!
//! Hosts the task table that every `taskboard` client reads and writes.
//!
//! # Usage
//!
//! ```bash
//! # In-memory store on the default address 127.0.0.1:9400
//! cargo run --bin taskboard-server
//!
//! # Persist to a JSON file on a custom address
//! cargo run --bin taskboard-server -- --bind 0.0.0.0:9400 --data-file tasks.json
//! ```

use std::sync::Arc;

use clap::Parser;
use taskboard_server::config::{ServerCliArgs, ServerConfig};
use taskboard_server::server;
use taskboard_server::store::TaskStoreState;

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, "starting taskboard store server");

    let state = match &config.data_file {
        Some(path) => match TaskStoreState::open(path).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "failed to open task snapshot");
                std::process::exit(1);
            }
        },
        None => TaskStoreState::new(),
    };

    match server::start_server_with_state(&config.bind_addr, Arc::new(state)).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "store server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "store server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start store server");
            std::process::exit(1);
        }
    }
}
