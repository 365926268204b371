//! Configuration parsing – reads a KEY=VALUE file (`ferry.conf`).
//!
//! Both binaries load the same file; each ignores fields it does not
//! need.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::validate::{UploadLimits, DEFAULT_MAX_FILE_SIZE};

/// Application configuration, shared between server and client.
#[derive(Debug, Clone)]
pub struct Config {
    // ── storage (server) ─────────────────────────────────────────────
    pub upload_dir: PathBuf,

    // ── validation (server + client) ─────────────────────────────────
    pub max_file_size: u64,
    /// Lowercase extensions without the leading dot.
    pub allowed_extensions: Vec<String>,

    // ── network (client ↔ server) ────────────────────────────────────
    /// Address the upload server listens on.
    pub listen_addr: String,
    /// URL the client uses to reach the upload server.
    pub server_url: String,
}

impl Config {
    /// Default config path.
    pub fn default_path() -> &'static str {
        "/etc/ferry/ferry.conf"
    }

    /// The per-file limits derived from this config.
    pub fn upload_limits(&self) -> UploadLimits {
        UploadLimits {
            max_file_size: self.max_file_size,
            allowed_extensions: self.allowed_extensions.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_extensions: UploadLimits::default().allowed_extensions,
            listen_addr: "0.0.0.0:8090".into(),
            server_url: "http://localhost:8090".into(),
        }
    }
}

/// Parse a `KEY=VALUE` configuration file.
///
/// Lines starting with `#` are comments.  Values may be optionally
/// double-quoted.  Unknown keys are silently ignored.
pub fn load(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read config: {}", path.display()))?;

    let map = parse_conf(&text);
    info!("Loaded config from {}", path.display());

    let defaults = Config::default();
    let get = |key: &str| -> Option<String> { map.get(key).cloned() };

    let allowed_extensions: Vec<String> = get("ALLOWED_EXTENSIONS")
        .map(|s| {
            s.split(',')
                .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect()
        })
        .unwrap_or(defaults.allowed_extensions);

    Ok(Config {
        upload_dir: get("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.upload_dir),
        max_file_size: get("MAX_FILE_SIZE")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_file_size),
        allowed_extensions,
        listen_addr: get("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
        server_url: get("SERVER_URL").unwrap_or(defaults.server_url),
    })
}

/// Like [`load`], but a missing file falls back to defaults so the
/// binaries run without any conf present.
pub fn load_or_default(path: &Path) -> Config {
    if path.exists() {
        match load(path) {
            Ok(config) => return config,
            Err(e) => warn!("Ignoring unreadable config: {e:#}"),
        }
    }
    Config::default()
}

/// Parse `KEY=VALUE` lines into a map, stripping optional double-quotes.
fn parse_conf(text: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, val)) = line.split_once('=') {
            let key = key.trim();
            let val = val.trim().trim_matches('"');
            map.insert(key.to_string(), val.to_string());
        }
    }
    map
}

// ─── tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_conf() {
        let text = r#"
# comment
UPLOAD_DIR=/data/uploads
MAX_FILE_SIZE="1048576"
ALLOWED_EXTENSIONS=".txt, .PDF"
LISTEN_ADDR=0.0.0.0:9090
"#;
        let map = parse_conf(text);
        assert_eq!(map["UPLOAD_DIR"], "/data/uploads");
        assert_eq!(map["MAX_FILE_SIZE"], "1048576");
        assert_eq!(map["LISTEN_ADDR"], "0.0.0.0:9090");
    }

    #[test]
    fn test_load_applies_defaults() {
        let tmp = tempfile("UPLOAD_DIR=/tmp/ferry_up\n");
        let config = load(tmp.as_path()).unwrap();
        assert_eq!(config.upload_dir, PathBuf::from("/tmp/ferry_up"));
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert!(config.allowed_extensions.contains(&"txt".to_string()));
    }

    #[test]
    fn test_extensions_normalized() {
        let tmp = tempfile("ALLOWED_EXTENSIONS=\".TXT,pdf , .Jpg\"\n");
        let config = load(tmp.as_path()).unwrap();
        assert_eq!(config.allowed_extensions, vec!["txt", "pdf", "jpg"]);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = load_or_default(Path::new("/nonexistent/ferry.conf"));
        assert_eq!(config.listen_addr, "0.0.0.0:8090");
    }

    fn tempfile(content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ferry_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}.conf", content.len()));
        std::fs::write(&path, content).unwrap();
        path
    }
}
