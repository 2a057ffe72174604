use clap::Parser;
use log::info;
use server::network::{Server, ServerConfig, ServerResult};
use shared::TIME_SYNC_INTERVAL_MS;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Interval between time-sync broadcasts in milliseconds
    #[arg(short, long, default_value_t = TIME_SYNC_INTERVAL_MS)]
    time_sync_ms: u64,

    /// Number of enemies spawned at startup
    #[arg(short, long, default_value = "2")]
    enemies: usize,

    /// Maximum number of open connections, players and observers combined
    #[arg(short, long, default_value = "32")]
    max_connections: usize,
}

#[tokio::main]
async fn main() -> ServerResult<()> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);

    let config = ServerConfig {
        time_sync_interval: Duration::from_millis(args.time_sync_ms),
        enemy_count: args.enemies,
        max_connections: args.max_connections,
    };

    info!("Starting server on {}", address);
    info!(
        "Time sync every {}ms, {} enemies, up to {} connections",
        args.time_sync_ms, args.enemies, args.max_connections
    );

    let server = Server::bind(&address, config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
