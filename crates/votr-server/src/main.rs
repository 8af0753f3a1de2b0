//! votr server binary.
//!
//! # Usage
//!
//! ```bash
//! # Serve on the default port with client assets from ./static
//! votr-server
//!
//! # Custom address and asset directory, verbose logging
//! votr-server --bind 127.0.0.1:8080 --static-dir web --log-level debug
//! ```

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use votr_server::{Server, ServerRuntimeConfig, SessionConfig};

/// votr room server
#[derive(Parser, Debug)]
#[command(name = "votr-server")]
#[command(about = "Real-time planning-poker room server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:12345")]
    bind: String,

    /// Directory with index.html and client assets
    #[arg(short, long, default_value = "static")]
    static_dir: PathBuf,

    /// Seconds between keepalive pings
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
    ping_interval: u64,

    /// Seconds of client silence before a session is dropped
    #[arg(long, default_value = "20", value_parser = clap::value_parser!(u64).range(1..))]
    read_timeout: u64,

    /// Largest inbound frame in bytes
    #[arg(long, default_value = "512")]
    max_message_size: usize,

    /// Seconds between room statistics log lines
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u64).range(1..))]
    stats_interval: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("votr server starting");
    tracing::info!("Binding to {}", args.bind);

    if !args.static_dir.join("index.html").is_file() {
        tracing::warn!("No index.html in {} - room pages will 404", args.static_dir.display());
    }

    let config = ServerRuntimeConfig {
        bind_address: args.bind,
        static_dir: args.static_dir,
        stats_interval: Duration::from_secs(args.stats_interval),
        session: SessionConfig {
            ping_interval: Duration::from_secs(args.ping_interval),
            read_timeout: Duration::from_secs(args.read_timeout),
            max_message_size: args.max_message_size,
            ..SessionConfig::default()
        },
        ..ServerRuntimeConfig::default()
    };

    let server = Server::bind(config).await?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
