//! Hindsight server - a history server for finished-job archives.
//!
//! Mirrors job archives from the configured remote locations into a local
//! directory and serves that directory read-only over HTTP, long after the
//! system that produced the archives has shut down.

mod server;

use anyhow::Result;
use clap::Parser;
use hindsight_core::{MirrorConfig, MirrorLifecycle};
use server::DashboardServer;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "hindsight-server")]
#[command(about = "History server for finished-job archives")]
struct Args {
    /// Comma-separated list of remote locations to mirror archives from
    #[arg(long)]
    archive_locations: String,

    /// Interval between archive refresh cycles, in milliseconds
    #[arg(long, default_value = "10000")]
    refresh_interval_ms: u64,

    /// Local mirror root (defaults to a generated temp directory)
    #[arg(long)]
    web_dir: Option<PathBuf>,

    /// Dashboard poll interval hint, in milliseconds
    #[arg(long, default_value = "10000")]
    web_refresh_interval_ms: u64,

    /// Host to bind the dashboard on
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind the dashboard on (0 = auto-assign)
    #[arg(long, default_value = "8082")]
    port: u16,

    /// Advertise SSL in the dashboard config (serving itself stays plain HTTP)
    #[arg(long)]
    ssl_enabled: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("Starting hindsight server");

    let config = MirrorConfig {
        archive_locations: args.archive_locations,
        refresh_interval: Duration::from_millis(args.refresh_interval_ms),
        web_dir: args.web_dir,
        web_refresh_interval: Duration::from_millis(args.web_refresh_interval_ms),
        ssl_enabled: args.ssl_enabled,
    };

    let frontend = DashboardServer::new(&args.host, args.port);
    let lifecycle = MirrorLifecycle::new(config, Box::new(frontend));
    lifecycle.run().await?;

    info!("Shut down cleanly");
    Ok(())
}
