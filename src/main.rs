//! Multi-room WebSocket Chat Hub - Entry Point
//!
//! Opens the message store, starts the Hub actor with its default room and
//! accepts connections.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use room_hub::{serve, Config, FileMessageStore, Hub};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=room_hub=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("room_hub=info")),
        )
        .init();

    let config = Config::parse();

    let store = Arc::new(FileMessageStore::open(&config.data_dir).await?);
    info!("History files in {}", store.data_dir().display());

    // Create Hub actor and start
    let (hub, handle) = Hub::new(store);
    tokio::spawn(hub.run());

    let default_room = config.default_room_id();
    handle
        .create_room(
            default_room.clone(),
            config.default_room_name.clone(),
            config.default_room_description.clone(),
        )
        .await;

    info!("Hub actor started");

    // Start TCP listener
    let listener = TcpListener::bind(&config.addr).await?;
    info!("WebSocket Chat Hub listening on {}", config.addr);
    info!(
        "Connect with ws://{}/ws?room={}&username=<name>",
        config.addr, default_room
    );

    serve(listener, handle, default_room).await;

    Ok(())
}
