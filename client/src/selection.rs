//! Pending-selection state machine.
//!
//! Files move through one upload cycle:
//! `idle → selecting → uploading → {completed | failed}`, and a
//! terminal state relaxes back to `selecting` on the next mutation.
//! Only `idle`, `selecting` and the terminal states permit adding or
//! removing files; `uploading` refuses both and also refuses a second
//! concurrent submit.

use ferry_common::protocol::ProcessedFile;
use ferry_common::validate::{self, UploadLimits, ValidationError};

use crate::upload::UploadError;

/// Where the client is in the upload cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    Selecting,
    Uploading,
    Completed,
    Failed,
}

impl ClientState {
    fn is_terminal(self) -> bool {
        matches!(self, ClientState::Completed | ClientState::Failed)
    }
}

/// One file waiting to be uploaded.
#[derive(Debug, Clone)]
pub struct PendingFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// The client-side selection plus the last rendered record list.
#[derive(Debug)]
pub struct Selection {
    limits: UploadLimits,
    state: ClientState,
    pending: Vec<PendingFile>,
    /// Records currently shown to the user.  Replaced wholesale by
    /// each progress event (the wire list is cumulative, so the view
    /// never shrinks), and kept visible after a terminal state until
    /// the next upload is started.
    rendered: Vec<ProcessedFile>,
}

impl Selection {
    pub fn new(limits: UploadLimits) -> Self {
        Self {
            limits,
            state: ClientState::Idle,
            pending: Vec::new(),
            rendered: Vec::new(),
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn pending(&self) -> &[PendingFile] {
        &self.pending
    }

    pub fn rendered(&self) -> &[ProcessedFile] {
        &self.rendered
    }

    /// Append candidate files to the selection.  Each file failing
    /// validation is rejected individually and reported back; accepted
    /// files are appended.  Refused entirely while an upload runs.
    pub fn add_files(
        &mut self,
        candidates: Vec<PendingFile>,
    ) -> Result<Vec<ValidationError>, UploadError> {
        if self.state == ClientState::Uploading {
            return Err(UploadError::UploadInFlight);
        }
        if self.state.is_terminal() {
            // A new selection begins: drop the previous history.
            self.rendered.clear();
        }
        self.state = ClientState::Selecting;

        let mut rejected = Vec::new();
        for file in candidates {
            match validate::check(&file.filename, file.bytes.len() as u64, &self.limits) {
                Ok(()) => self.pending.push(file),
                Err(e) => rejected.push(e),
            }
        }
        Ok(rejected)
    }

    /// Remove one pending file by name.  No effect while uploading.
    pub fn remove_file(&mut self, filename: &str) -> bool {
        if self.state == ClientState::Uploading {
            return false;
        }
        let before = self.pending.len();
        self.pending.retain(|f| f.filename != filename);
        self.pending.len() != before
    }

    /// Take the selection for submission and enter `Uploading`.  The
    /// files are handed to the transport once; they are not retained.
    pub fn begin_upload(&mut self) -> Result<Vec<PendingFile>, UploadError> {
        if self.state == ClientState::Uploading {
            return Err(UploadError::UploadInFlight);
        }
        if self.pending.is_empty() {
            return Err(UploadError::EmptySelection);
        }
        self.state = ClientState::Uploading;
        Ok(std::mem::take(&mut self.pending))
    }

    /// Replace the rendered list with a progress event's cumulative
    /// record list.
    pub fn show_progress(&mut self, records: Vec<ProcessedFile>) {
        self.rendered = records;
    }

    /// Terminal success: render the final list and re-enable
    /// submission.  The history stays visible.
    pub fn complete(&mut self, records: Vec<ProcessedFile>) {
        self.rendered = records;
        self.state = ClientState::Completed;
    }

    /// Terminal failure: re-enable submission without discarding
    /// whatever progress was already rendered.
    pub fn fail(&mut self) {
        self.state = ClientState::Failed;
    }
}

// ─── tests ───────────────────────────────────────────────────────────────
