//! Multipart upload handler with streamed NDJSON progress.
//!
//! The request is staged fully (one `Vec` of file buffers), validated,
//! and then processed file by file in a spawned task that writes one
//! progress line per file into a bounded channel.  The response body
//! streams straight out of that channel, so a slow reader suspends the
//! producer instead of growing a buffer.  A dropped reader (client
//! abort) closes the channel and the batch stops before its next file.

use std::convert::Infallible;
use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::body::Body;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use bytes::Bytes;
use futures::channel::mpsc;
use futures::SinkExt;
use tracing::{debug, error, info, warn};

use ferry_common::protocol::{percent, ErrorResponse, ProcessedFile, UploadEvent};
use ferry_common::validate::{self, UploadLimits};

use crate::server::AppState;

/// One file buffered out of the multipart form.
#[derive(Debug, Clone)]
pub(crate) struct StagedFile {
    pub filename: String,
    pub bytes: Bytes,
}

/// `POST /api/upload` – handle file uploads with real-time progress.
pub async fn upload_files(State(state): State<AppState>, multipart: Multipart) -> Response {
    // Idempotent; a failure here is not fatal because each write
    // failure surfaces as a per-file `failed` record.
    if let Err(e) = std::fs::create_dir_all(&state.upload_dir) {
        warn!(
            "Cannot create upload directory {}: {e}",
            state.upload_dir.display()
        );
    }

    let files = match stage_files(multipart).await {
        Ok(files) => files,
        Err(e) => {
            warn!("Rejecting unparseable upload form: {e}");
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("malformed multipart form: {e}"),
            );
        }
    };

    if files.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "no files provided".to_string());
    }

    info!("Upload batch started ({} file(s))", files.len());

    // Bounded channel: the batch task suspends in `send` until the
    // transport has drained the previous line.
    let (tx, rx) = mpsc::channel::<Result<Bytes, Infallible>>(1);
    tokio::spawn(process_batch(files, state.upload_dir.clone(), state.limits.clone(), tx));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(rx),
    )
        .into_response()
}

/// Drain the multipart form into memory.  Parts without a filename are
/// stray form fields and are skipped without error.
async fn stage_files(mut multipart: Multipart) -> Result<Vec<StagedFile>, MultipartError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(filename) = field.file_name().map(|n| n.to_string()) else {
            debug!("Skipping non-file form field {:?}", field.name());
            continue;
        };
        let bytes = field.bytes().await?;
        files.push(StagedFile { filename, bytes });
    }

    Ok(files)
}

/// Process a staged batch, emitting one progress line per file and a
/// terminal line, then close the stream by dropping the sender.
pub(crate) async fn process_batch(
    files: Vec<StagedFile>,
    upload_dir: PathBuf,
    limits: UploadLimits,
    mut tx: mpsc::Sender<Result<Bytes, Infallible>>,
) {
    if let Err(e) = run_batch(files, &upload_dir, &limits, &mut tx).await {
        // Unexpected failure outside per-file handling.  The status
        // line is already committed, so the only way to report it is
        // one final error event.
        error!("Upload batch aborted: {e:#}");
        let event = UploadEvent::Error {
            message: format!("upload aborted: {e}"),
        };
        let _ = emit(&mut tx, &event).await;
    }
}

async fn run_batch(
    files: Vec<StagedFile>,
    upload_dir: &Path,
    limits: &UploadLimits,
    tx: &mut mpsc::Sender<Result<Bytes, Infallible>>,
) -> anyhow::Result<()> {
    let total = files.len();
    // Local accumulator: each request owns its own counter and record
    // list, nothing is shared across requests.
    let mut processed: Vec<ProcessedFile> = Vec::with_capacity(total);

    for (index, file) in files.into_iter().enumerate() {
        // Checked between files only; a file already being written is
        // finished before the batch notices the client left.
        if tx.is_closed() {
            info!(
                "Client gone after {} of {total} file(s), stopping batch",
                processed.len()
            );
            return Ok(());
        }

        let record = match validate::check(&file.filename, file.bytes.len() as u64, limits) {
            Err(e) => {
                warn!("Rejecting {}: {e}", file.filename);
                ProcessedFile::failed(&file.filename, e.to_string())
            }
            Ok(()) => match persist(upload_dir, &file).await {
                Ok(path) => {
                    debug!("Stored {} ({} bytes)", path.display(), file.bytes.len());
                    ProcessedFile::completed(&file.filename)
                }
                Err(e) => {
                    error!("Error processing {}: {e:#}", file.filename);
                    ProcessedFile::failed(&file.filename, "failed to process file")
                }
            },
        };
        processed.push(record);

        let event = UploadEvent::Progress {
            current_file: file.filename,
            processed_count: index + 1,
            total_files: total,
            percent: percent(index + 1, total),
            processed_files: processed.clone(),
        };
        if !emit(tx, &event).await? {
            return Ok(());
        }
    }

    let event = UploadEvent::Complete {
        status: "success".to_string(),
        files: processed,
    };
    emit(tx, &event).await?;
    Ok(())
}

/// Send one event as an NDJSON line.  `Ok(false)` means the receiver
/// is gone and the batch should stop quietly.
async fn emit(
    tx: &mut mpsc::Sender<Result<Bytes, Infallible>>,
    event: &UploadEvent,
) -> anyhow::Result<bool> {
    let line = event.to_line().context("serialize progress event")?;
    Ok(tx.send(Ok(Bytes::from(line))).await.is_ok())
}

/// Write one file under its submitted name, reduced to its final path
/// component so a crafted part name cannot escape the upload dir.
/// Same-name collisions are last-write-wins.
async fn persist(upload_dir: &Path, file: &StagedFile) -> anyhow::Result<PathBuf> {
    let name = storage_name(&file.filename)
        .ok_or_else(|| anyhow::anyhow!("unusable filename {:?}", file.filename))?;
    let path = upload_dir.join(name);
    tokio::fs::write(&path, &file.bytes)
        .await
        .with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

fn storage_name(filename: &str) -> Option<&str> {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

// ─── tests ───────────────────────────────────────────────────────────────
