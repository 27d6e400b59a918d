//! Vitrine Daemon - Main entry point
//!
//! Serves the gallery page, bridges the embedded viewers, and drives the
//! per-exhibit click cycles.

mod api;
mod config;
mod server;
mod state;
mod ws;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "vitrine")]
#[command(about = "Embeds hosted 3D model viewers and toggles part visibility on click")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "vitrine.toml")]
    config: PathBuf,

    /// Bind address for web server
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write a starter configuration file and exit
    #[arg(long)]
    init_config: bool,

    /// Open the gallery page in a browser once serving
    #[arg(long)]
    open: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Vitrine v{}", env!("CARGO_PKG_VERSION"));

    if args.init_config {
        config::save_default_config(&args.config)?;
        println!("Wrote starter configuration to {}", args.config.display());
        return Ok(());
    }

    // Load configuration
    let mut config = config::load_config(&args.config)?;

    // Override bind address if specified
    if let Some(bind) = args.bind {
        config.daemon.bind = bind;
    }

    info!(
        bind = %config.daemon.bind,
        exhibits = config.exhibits.len(),
        "Configuration loaded"
    );

    // Create application state (validates the exhibit list)
    let state = state::AppState::new(config.clone())?;

    if args.open {
        let url = gallery_url(&config);
        tokio::spawn(async move {
            // Give the listener a moment to come up
            tokio::time::sleep(Duration::from_millis(500)).await;
            if let Err(e) = open::that(&url) {
                warn!(error = %e, url = %url, "Failed to open browser");
            }
        });
    }

    server::run(state, &config.daemon.bind, config.daemon.tls.as_ref()).await?;

    Ok(())
}

/// Browser-reachable URL for the configured bind address
fn gallery_url(config: &config::Config) -> String {
    let scheme = if config.daemon.tls.is_some() {
        "https"
    } else {
        "http"
    };
    let host = config.daemon.bind.replace("0.0.0.0", "127.0.0.1");
    format!("{}://{}/", scheme, host)
}
