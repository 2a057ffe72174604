use clap::Parser;
use client::network::{Client, ClientConfig, ClientResult};
use log::info;
use shared::{SKEW_THRESHOLD_MS, UPDATE_INTERVAL_MS};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server WebSocket URL
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:8080")]
    server: String,

    /// Player name; omit to watch as an observer
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Accumulated skew that triggers a snapshot request
    #[arg(short = 'k', long, default_value_t = SKEW_THRESHOLD_MS)]
    skew_threshold_ms: i64,

    /// Replica projection interval in milliseconds
    #[arg(short = 'u', long, default_value_t = UPDATE_INTERVAL_MS)]
    update_interval_ms: u64,

    /// Horizontal velocity to request after joining
    #[arg(long, allow_hyphen_values = true)]
    vx: Option<f64>,

    /// Vertical velocity to request after joining
    #[arg(long, allow_hyphen_values = true)]
    vy: Option<f64>,
}

#[tokio::main]
async fn main() -> ClientResult<()> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let velocity = match (args.vx, args.vy) {
        (None, None) => None,
        (vx, vy) => Some((vx.unwrap_or(0.0), vy.unwrap_or(0.0))),
    };

    let config = ClientConfig {
        name: args.name,
        skew_threshold_ms: args.skew_threshold_ms,
        update_interval: Duration::from_millis(args.update_interval_ms),
        velocity,
        ..ClientConfig::default()
    };

    info!("Starting client...");
    let mut client = Client::connect(&args.server, config).await?;

    tokio::select! {
        result = client.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Leaving...");
            client.shutdown().await?;
        }
    }

    Ok(())
}
