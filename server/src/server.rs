//! HTTP server wiring for the upload service.
//!
//! Routes:
//!   GET  /api/health   → health check
//!   GET  /api/files    → paginated listing of stored files
//!   POST /api/upload   → multipart upload with streamed NDJSON progress

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use ferry_common::config::Config;
use ferry_common::protocol::HealthResponse;
use ferry_common::validate::UploadLimits;

use crate::{files, upload};

/// Whole-request body cap.  Individual files are checked against the
/// configured per-file limit; this only stops a runaway request from
/// being buffered unboundedly while the form is parsed.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Shared state for route handlers.
#[derive(Clone)]
pub struct AppState {
    pub upload_dir: PathBuf,
    pub limits: UploadLimits,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(upload_dir: PathBuf, limits: UploadLimits) -> Self {
        Self {
            upload_dir,
            limits,
            start_time: Instant::now(),
        }
    }
}

/// Build the router.  Split out of [`run`] so tests can drive it
/// without binding a socket.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/files", get(files::list_files))
        .route("/api/upload", post(upload::upload_files))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server. Blocks until shutdown.
pub async fn run(config: &Config, shutdown: Arc<AtomicBool>) -> anyhow::Result<()> {
    let state = AppState::new(config.upload_dir.clone(), config.upload_limits());
    let app = router(state);

    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!("Upload HTTP server listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            loop {
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
            }
        })
        .await?;

    Ok(())
}

// ── route handlers ───────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

// ─── tests ───────────────────────────────────────────────────────────────
