//! Ferry Upload Client – sends files to the upload server and renders
//! the streamed per-file progress.

mod selection;
mod stream;
mod upload;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use ferry_common::protocol::{FileStatus, UploadEvent};

use crate::selection::PendingFile;
use crate::upload::Uploader;

#[derive(Parser)]
#[command(name = "ferry-client", about = "Upload files with streamed progress")]
struct Args {
    /// Config file path (defaults to /etc/ferry/ferry.conf)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Upload server URL (overrides the config)
    #[arg(long)]
    server: Option<String>,

    /// Files to upload
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    // ── load config ──────────────────────────────────────────────────
    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(ferry_common::config::Config::default_path()));
    let config = ferry_common::config::load_or_default(&config_path);
    let server_url = args.server.unwrap_or(config.server_url.clone());

    // ── build the selection ──────────────────────────────────────────
    let mut candidates = Vec::new();
    for path in &args.files {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .with_context(|| format!("Not a file path: {}", path.display()))?;
        candidates.push(PendingFile { filename, bytes });
    }

    let mut uploader = Uploader::new(&server_url, config.upload_limits());
    let rejected = uploader.selection_mut().add_files(candidates)?;
    for rejection in &rejected {
        warn!("Skipping {rejection}");
    }
    if uploader.selection().pending().is_empty() {
        bail!("No uploadable files left after validation");
    }

    // ── upload ───────────────────────────────────────────────────────
    let files = uploader
        .submit(
            |event| {
                if let UploadEvent::Progress {
                    current_file,
                    processed_count,
                    total_files,
                    percent,
                    ..
                } = event
                {
                    info!("[{percent:>3}%] {processed_count}/{total_files} {current_file}");
                }
            },
            |files| info!("Upload complete: {} file(s) processed", files.len()),
        )
        .await?;

    // ── summary ──────────────────────────────────────────────────────
    let mut failed = 0usize;
    for file in &files {
        match file.status {
            FileStatus::Completed => info!("  completed  {}", file.filename),
            _ => {
                failed += 1;
                error!(
                    "  failed     {} ({})",
                    file.filename,
                    file.message.as_deref().unwrap_or("no reason given")
                );
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} file(s) failed", files.len());
    }

    Ok(())
}
