//! Shared HTTP protocol types for communication between the upload
//! client and the upload server.
//!
//! The upload endpoint streams newline-delimited JSON: each line is one
//! bare [`UploadEvent`] object terminated by `\n` (not SSE framing).

use serde::{Deserialize, Serialize};

/// Terminal (or in-flight) status of a single uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Uploading,
    Completed,
    Failed,
}

/// Result of handling one file, as reported on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedFile {
    pub filename: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProcessedFile {
    pub fn completed(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            status: FileStatus::Completed,
            message: Some("file processed successfully".into()),
        }
    }

    pub fn failed(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            status: FileStatus::Failed,
            message: Some(message.into()),
        }
    }
}

/// One streamed line of the upload response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UploadEvent {
    /// Emitted after each file is processed. `processed_files` is the
    /// cumulative ordered list of every record so far.
    Progress {
        current_file: String,
        processed_count: usize,
        total_files: usize,
        percent: u8,
        processed_files: Vec<ProcessedFile>,
    },
    /// Exactly one per request, always the last line on success.
    Complete {
        status: String,
        files: Vec<ProcessedFile>,
    },
    /// Processing aborted entirely; replaces the `complete` line.
    Error { message: String },
}

impl UploadEvent {
    /// Serialize to one NDJSON line, `\n`-terminated.
    pub fn to_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Body of a 4xx/5xx response sent before the stream opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health-check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
}

/// Metadata for one stored file, as returned by the listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub filename: String,
    pub size: u64,
    /// ISO-8601 modification timestamp.
    pub created: String,
}

/// Paginated listing of stored files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileListing {
    pub files: Vec<FileInfo>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

/// Integer percentage, `round(processed / total * 100)`.
///
/// Monotonically non-decreasing as `processed` grows for a fixed
/// `total`. Empty batches are rejected before any stream opens, so
/// `total == 0` never reaches this point; it returns 100 rather than
/// dividing by zero.
pub fn percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((processed as f64 / total as f64) * 100.0).round() as u8
}

// ─── tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_wire_format() {
        let event = UploadEvent::Progress {
            current_file: "a.txt".into(),
            processed_count: 1,
            total_files: 2,
            percent: 50,
            processed_files: vec![ProcessedFile::completed("a.txt")],
        };
        let line = event.to_line().unwrap();
        assert!(line.ends_with('\n'));

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["type"], "progress");
        assert_eq!(value["current_file"], "a.txt");
        assert_eq!(value["processed_count"], 1);
        assert_eq!(value["total_files"], 2);
        assert_eq!(value["percent"], 50);
        assert_eq!(value["processed_files"][0]["status"], "completed");
    }

    #[test]
    fn test_complete_wire_format() {
        let event = UploadEvent::Complete {
            status: "success".into(),
            files: vec![ProcessedFile::failed("b.txt", "failed to process file")],
        };
        let value: serde_json::Value =
            serde_json::from_str(&event.to_line().unwrap()).unwrap();
        assert_eq!(value["type"], "complete");
        assert_eq!(value["status"], "success");
        assert_eq!(value["files"][0]["status"], "failed");
        assert_eq!(value["files"][0]["message"], "failed to process file");
    }

    #[test]
    fn test_error_event_round_trip() {
        let line = r#"{"type":"error","message":"disk full"}"#;
        let event: UploadEvent = serde_json::from_str(line).unwrap();
        assert_eq!(
            event,
            UploadEvent::Error {
                message: "disk full".into()
            }
        );
    }

    #[test]
    fn test_percent_rounds() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(0, 5), 0);
    }

    #[test]
    fn test_percent_monotone() {
        for total in 1..=20usize {
            let mut last = 0;
            for processed in 0..=total {
                let p = percent(processed, total);
                assert!(p >= last, "percent regressed at {processed}/{total}");
                last = p;
            }
            assert_eq!(last, 100);
        }
    }
}
