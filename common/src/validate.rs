//! Upload validation rules shared by client and server.
//!
//! The client applies these at selection time so bad files fail fast
//! with a per-file message; the server applies the same rules per file
//! so a bypassed client cannot sneak past them. A validation failure
//! never aborts a batch, it only marks that one file `failed`.

use std::path::Path;

use thiserror::Error;

/// Default maximum size of a single file: 5 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Default extension allow-list.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] =
    &["txt", "pdf", "png", "jpg", "jpeg", "gif"];

/// Per-file limits a batch is checked against.
#[derive(Debug, Clone)]
pub struct UploadLimits {
    pub max_file_size: u64,
    /// Lowercase extensions without the leading dot.
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

/// Why a single file was rejected. The display text is the message
/// shown to the user and carried in the wire-level `failed` record, so
/// each variant names the file and the exact rule it broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{filename} exceeds maximum size of {limit} bytes ({size} bytes)")]
    TooLarge {
        filename: String,
        size: u64,
        limit: u64,
    },
    #[error("{filename} has disallowed type \".{extension}\"")]
    DisallowedType { filename: String, extension: String },
}

/// Check one file against the limits.
pub fn check(filename: &str, size: u64, limits: &UploadLimits) -> Result<(), ValidationError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    if !limits.allowed_extensions.iter().any(|e| *e == extension) {
        return Err(ValidationError::DisallowedType {
            filename: filename.to_string(),
            extension,
        });
    }

    if size > limits.max_file_size {
        return Err(ValidationError::TooLarge {
            filename: filename.to_string(),
            size,
            limit: limits.max_file_size,
        });
    }

    Ok(())
}

// ─── tests ───────────────────────────────────────────────────────────────
