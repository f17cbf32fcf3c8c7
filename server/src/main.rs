//! LicenseCore license server
//!
//! Serves the register / challenge / validate endpoints over HTTP and
//! sweeps expired nonces in the background.
//!
//! Usage:
//!   licensecore-server --port 5108 --database license.db

use anyhow::{Context, Result};
use clap::Parser;
use licensecore::{LicenseService, ServiceConfig};
use licensecore_crypto::IntegritySecret;
use licensecore_server::{build_router, open_store, parse_integrity_secret, spawn_sweeper};
use std::{sync::Arc, time::Duration};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "licensecore-server")]
#[command(about = "Hybrid post-quantum license server")]
struct Args {
    /// Address to bind the HTTP listener to
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// HTTP port
    #[arg(short, long, default_value = "5108")]
    port: u16,

    /// SQLite database path, or ":memory:" for a non-persistent store
    #[arg(short, long, default_value = "license.db")]
    database: String,

    /// Hex-encoded 32-byte secret for record integrity hashes
    #[arg(long, env = "LICENSECORE_INTEGRITY_SECRET", hide_env_values = true)]
    integrity_secret: Option<String>,

    /// Seconds an issued nonce stays valid
    #[arg(long, default_value = "30")]
    nonce_ttl_secs: u32,

    /// Seconds between expired-nonce sweeps (0 disables sweeping)
    #[arg(long, default_value = "60")]
    sweep_interval_secs: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("LicenseCore server starting...");
    let store = open_store(&args.database)?;
    let integrity = match args.integrity_secret.as_deref() {
        Some(hex_secret) => parse_integrity_secret(hex_secret)?,
        None => {
            warn!("No integrity secret configured; using a random one for this process");
            IntegritySecret::generate()
        }
    };
    let config = ServiceConfig {
        nonce_ttl: chrono::Duration::seconds(i64::from(args.nonce_ttl_secs)),
        ..ServiceConfig::default()
    };
    let service = Arc::new(LicenseService::new(store, integrity, config));

    if args.sweep_interval_secs > 0 {
        spawn_sweeper(service.clone(), Duration::from_secs(args.sweep_interval_secs));
    }

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("License API listening on {}", addr);

    axum::serve(listener, build_router(service))
        .await
        .context("HTTP server failed")?;
    Ok(())
}
