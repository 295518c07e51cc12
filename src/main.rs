//! CLI for Airwave
//!
//! Subcommands:
//! - `server`: run the WebSocket server
//! - `device`: send one reading as a sensor device would (useful for smoke tests)

use clap::Parser;
use tracing::{error, info};

use airwave::broker::Broker;
use airwave::config::load_config;
use airwave::ingest::subscriber::spawn_pubsub_ingest;
use airwave::transport::context::AppContext;
use airwave::transport::websocket::start_websocket_server;

#[derive(Parser)]
#[command(name = "airwave")]
enum Command {
    /// Start the WebSocket server
    Server,
    /// Send one direct-path reading and print the enriched response
    Device {
        /// WebSocket server URL to connect to (default: ws://127.0.0.1:8080)
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
        /// Channel to write to
        #[arg(long)]
        channel: String,
        /// Write credential for the channel
        #[arg(long)]
        key: String,
        #[arg(long, default_value_t = 450.0)]
        co2: f64,
        #[arg(long, default_value_t = 0.5)]
        co: f64,
        #[arg(long, default_value_t = 15.0)]
        no2: f64,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    airwave::utils::logging::init("info");

    let cmd = Command::parse();

    match cmd {
        Command::Server => {
            if let Err(e) = run_server().await {
                error!("Server failed: {}", e);
            }
        }
        Command::Device {
            url,
            channel,
            key,
            co2,
            co,
            no2,
        } => {
            if let Err(e) = run_device(&url, &channel, &key, co2, co, no2).await {
                error!("Device failed: {}", e);
            }
        }
    }
}

async fn run_server() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let ctx = AppContext::new(config)?;

    tokio::spawn(Broker::start_retry_loop(ctx.broker.clone()));
    spawn_pubsub_ingest(ctx.broker.clone(), ctx.gateway.clone());

    tokio::select! {
        _ = start_websocket_server(addr, ctx) => {
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

async fn run_device(
    url: &str,
    channel: &str,
    key: &str,
    co2: f64,
    co: f64,
    no2: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    let (mut ws_stream, _response) = connect_async(url).await?;

    let frame = json!({
        "type": "ingest",
        "channel_id": channel,
        "credential": key,
        "co2": co2,
        "co": co,
        "no2": no2,
        "timestamp": chrono::Utc::now().timestamp_millis(),
    });
    ws_stream
        .send(WsMessage::Text(frame.to_string().into()))
        .await?;

    if let Some(Ok(WsMessage::Text(msg))) = ws_stream.next().await {
        println!("Server response: {msg}");
    }

    Ok(())
}
