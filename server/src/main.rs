//! Ferry Upload Server – receives multipart file uploads and streams
//! per-file progress back as newline-delimited JSON.
//!
//! This binary:
//! 1. Reads configuration from `ferry.conf`
//! 2. Ensures the upload directory exists
//! 3. Runs an axum HTTP server exposing the upload, listing and
//!    health endpoints.

mod files;
mod server;
mod upload;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── load config ──────────────────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| ferry_common::config::Config::default_path().to_string());
    let config = ferry_common::config::load_or_default(&PathBuf::from(&config_path));

    info!(
        "Ferry Upload Server starting (listen={}, upload_dir={})",
        config.listen_addr,
        config.upload_dir.display()
    );

    // Ensure the upload directory exists.  Failure is logged, not
    // fatal: the handler retries per request and write errors surface
    // per file.
    if let Err(e) = std::fs::create_dir_all(&config.upload_dir) {
        warn!(
            "Cannot create upload directory {}: {e}",
            config.upload_dir.display()
        );
    }

    // ── ctrl-c ───────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = shutdown.clone();
    ctrlc::set_handler(move || {
        shutdown_flag.store(true, Ordering::Relaxed);
        info!("Shutdown signal received");
    })
    .context("Cannot set Ctrl-C handler")?;

    // ── start HTTP server ────────────────────────────────────────────
    server::run(&config, shutdown).await?;

    info!("Ferry Upload Server stopped");
    Ok(())
}
