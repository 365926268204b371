//! Submission and stream consumption.
//!
//! `submit` posts the selection as one multipart form (every part
//! under the `files` field) and then reads the response body
//! incrementally, applying each NDJSON event to the selection as it
//! arrives.  Every failure class maps to its own [`UploadError`]
//! variant so the user sees what actually went wrong, and every path
//! leaves the selection in a retryable, non-uploading state.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use thiserror::Error;
use tracing::{debug, info};

use ferry_common::protocol::{ErrorResponse, ProcessedFile, UploadEvent};
use ferry_common::validate::UploadLimits;

use crate::selection::Selection;
use crate::stream::EventReader;

/// What went wrong with an upload, one variant per failure class.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("an upload is already in flight")]
    UploadInFlight,
    #[error("nothing to upload: the selection is empty")]
    EmptySelection,
    #[error("cannot reach the upload server: {0}")]
    Connect(#[source] reqwest::Error),
    #[error("upload rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("connection lost mid-upload: {0}")]
    Interrupted(String),
    #[error("stream ended before a completion record arrived")]
    TruncatedStream,
    #[error("server aborted the upload: {message}")]
    Server { message: String },
}

/// HTTP client wrapping a [`Selection`].
pub struct Uploader {
    http: reqwest::Client,
    server_url: String,
    selection: Selection,
}

impl Uploader {
    pub fn new(server_url: impl Into<String>, limits: UploadLimits) -> Self {
        Self {
            http: reqwest::Client::new(),
            server_url: server_url.into().trim_end_matches('/').to_string(),
            selection: Selection::new(limits),
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    /// Upload the current selection.  `on_event` fires for every
    /// received event; `on_complete` fires exactly once, on the
    /// terminal completion record.
    pub async fn submit(
        &mut self,
        on_event: impl FnMut(&UploadEvent),
        on_complete: impl FnOnce(&[ProcessedFile]),
    ) -> Result<Vec<ProcessedFile>, UploadError> {
        let files = self.selection.begin_upload()?;
        let total = files.len();

        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let part = reqwest::multipart::Part::bytes(file.bytes).file_name(file.filename);
            form = form.part("files", part);
        }

        let url = format!("{}/api/upload", self.server_url);
        info!("Uploading {total} file(s) to {url}");

        let response = match self.http.post(&url).multipart(form).send().await {
            Ok(response) => response,
            Err(e) => {
                self.selection.fail();
                return Err(UploadError::Connect(e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            // The pre-stream rejection body is structured JSON; fall
            // back to the status text if it is not.
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) => body.error,
                Err(_) => status
                    .canonical_reason()
                    .unwrap_or("unrecognized server error")
                    .to_string(),
            };
            self.selection.fail();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| UploadError::Interrupted(e.to_string())));
        consume_stream(&mut self.selection, stream, on_event, on_complete).await
    }
}

/// Read the response body chunk by chunk, applying each event to the
/// selection.  Returns at the first terminal event; a stream that ends
/// without one is a failure, never a silent success.
pub(crate) async fn consume_stream<S>(
    selection: &mut Selection,
    mut stream: S,
    mut on_event: impl FnMut(&UploadEvent),
    on_complete: impl FnOnce(&[ProcessedFile]),
) -> Result<Vec<ProcessedFile>, UploadError>
where
    S: Stream<Item = Result<Bytes, UploadError>> + Unpin,
{
    let mut reader = EventReader::new();
    let mut on_complete = Some(on_complete);

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                selection.fail();
                return Err(e);
            }
        };
        for event in reader.push(&chunk) {
            on_event(&event);
            if let Some(outcome) = apply(selection, event, &mut on_complete) {
                return outcome;
            }
        }
    }

    // The server may close without a final newline.
    if let Some(event) = reader.finish() {
        on_event(&event);
        if let Some(outcome) = apply(selection, event, &mut on_complete) {
            return outcome;
        }
    }

    debug!("Stream ended without a terminal record");
    selection.fail();
    Err(UploadError::TruncatedStream)
}

fn apply<F: FnOnce(&[ProcessedFile])>(
    selection: &mut Selection,
    event: UploadEvent,
    on_complete: &mut Option<F>,
) -> Option<Result<Vec<ProcessedFile>, UploadError>> {
    match event {
        UploadEvent::Progress {
            processed_files, ..
        } => {
            selection.show_progress(processed_files);
            None
        }
        UploadEvent::Complete { files, .. } => {
            selection.complete(files.clone());
            if let Some(callback) = on_complete.take() {
                callback(&files);
            }
            Some(Ok(files))
        }
        UploadEvent::Error { message } => {
            selection.fail();
            Some(Err(UploadError::Server { message }))
        }
    }
}

// ─── tests ───────────────────────────────────────────────────────────────
