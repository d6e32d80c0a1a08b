use anyhow::Context;
use axum::{Router, routing::any};
use clap::Parser;
use droplink_server::{ConnectionRegistry, RoomRegistry, SignalingRouter, ws_handler};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{Level, info};

#[derive(Parser)]
#[command(name = "droplink-server", about = "Signaling relay for droplink rooms")]
struct Args {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let args = Args::parse();

    let connections = Arc::new(ConnectionRegistry::new());
    let rooms = Arc::new(RoomRegistry::new());
    let router = SignalingRouter::new(connections, rooms);

    let app = Router::new().route("/ws", any(ws_handler)).with_state(router);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("signaling server listening on {addr}");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
