//! Incremental NDJSON reader for the upload response body.
//!
//! Chunks arrive on arbitrary boundaries; this buffers partial lines
//! and parses each completed line independently.  A line that is not
//! valid JSON is logged and skipped so a single garbled line never
//! kills the rest of the stream.

use tracing::warn;

use ferry_common::protocol::UploadEvent;

#[derive(Debug, Default)]
pub struct EventReader {
    buf: Vec<u8>,
}

impl EventReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every event whose line completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<UploadEvent> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(event) = parse_line(&line[..line.len() - 1]) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing unterminated line at end-of-stream.
    pub fn finish(&mut self) -> Option<UploadEvent> {
        let line = std::mem::take(&mut self.buf);
        parse_line(&line)
    }
}

fn parse_line(line: &[u8]) -> Option<UploadEvent> {
    let text = std::str::from_utf8(line).ok()?.trim();
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str(text) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Skipping malformed stream line ({e}): {text}");
            None
        }
    }
}

// ─── tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_line_split_across_chunks() {
        let mut reader = EventReader::new();
        assert!(reader.push(b"{\"type\":\"error\",\"mess").is_empty());
        let events = reader.push(b"age\":\"boom\"}\n");
        assert_eq!(
            events,
            vec![UploadEvent::Error {
                message: "boom".into()
            }]
        );
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut reader = EventReader::new();
        let events = reader.push(
            b"{\"type\":\"error\",\"message\":\"one\"}\n{\"type\":\"error\",\"message\":\"two\"}\n",
        );
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_malformed_line_is_skipped() {
        let mut reader = EventReader::new();
        let events = reader.push(
            b"not json at all\n{\"type\":\"error\",\"message\":\"still fine\"}\n",
        );
        assert_eq!(
            events,
            vec![UploadEvent::Error {
                message: "still fine".into()
            }]
        );
    }

    #[test]
    fn test_blank_lines_ignored() {
        let mut reader = EventReader::new();
        assert!(reader.push(b"\n\n  \n").is_empty());
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut reader = EventReader::new();
        assert!(reader.push(b"{\"type\":\"error\",\"message\":\"tail\"}").is_empty());
        assert_eq!(
            reader.finish(),
            Some(UploadEvent::Error {
                message: "tail".into()
            })
        );
        assert_eq!(reader.finish(), None);
    }
}
