//! `GET /api/files` – paginated listing of stored files.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use ferry_common::protocol::{FileInfo, FileListing};

use crate::server::AppState;

const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    page: Option<usize>,
    page_size: Option<usize>,
}

pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<FileListing>, StatusCode> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);

    let dir = &state.upload_dir;
    if !dir.exists() {
        return Ok(Json(FileListing {
            files: vec![],
            total: 0,
            page,
            page_size,
        }));
    }

    let entries = std::fs::read_dir(dir).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let mut all_files = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Ok(meta) = path.metadata() else { continue };
        let modified = meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH);
        let created = modified
            .duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map(|d| {
                chrono::DateTime::from_timestamp(d.as_secs() as i64, 0)
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_default()
            })
            .unwrap_or_default();

        all_files.push(FileInfo {
            filename: entry.file_name().to_string_lossy().to_string(),
            size: meta.len(),
            created,
        });
    }

    // Stable order so pagination does not shuffle between requests.
    all_files.sort_by(|a, b| a.filename.cmp(&b.filename));

    let total = all_files.len();
    let start = (page - 1).saturating_mul(page_size).min(total);
    let end = start.saturating_add(page_size).min(total);

    Ok(Json(FileListing {
        files: all_files[start..end].to_vec(),
        total,
        page,
        page_size,
    }))
}

// ─── tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_common::validate::UploadLimits;

    fn state(dir: &std::path::Path) -> AppState {
        AppState::new(dir.to_path_buf(), UploadLimits::default())
    }

    #[tokio::test]
    async fn test_listing_paginates_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.txt", "a.txt", "b.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let Json(listing) = list_files(
            State(state(dir.path())),
            Query(ListQuery {
                page: Some(1),
                page_size: Some(2),
            }),
        )
        .await
        .unwrap();

        assert_eq!(listing.total, 3);
        assert_eq!(listing.files.len(), 2);
        assert_eq!(listing.files[0].filename, "a.txt");
        assert_eq!(listing.files[1].filename, "b.txt");

        let Json(second) = list_files(
            State(state(dir.path())),
            Query(ListQuery {
                page: Some(2),
                page_size: Some(2),
            }),
        )
        .await
        .unwrap();
        assert_eq!(second.files.len(), 1);
        assert_eq!(second.files[0].filename, "c.txt");
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty_listing() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("never_created");

        let Json(listing) = list_files(
            State(state(&gone)),
            Query(ListQuery {
                page: None,
                page_size: None,
            }),
        )
        .await
        .unwrap();

        assert_eq!(listing.total, 0);
        assert!(listing.files.is_empty());
        assert_eq!(listing.page, 1);
        assert_eq!(listing.page_size, DEFAULT_PAGE_SIZE);
    }

    #[tokio::test]
    async fn test_page_beyond_end_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("only.txt"), b"x").unwrap();

        let Json(listing) = list_files(
            State(state(dir.path())),
            Query(ListQuery {
                page: Some(9),
                page_size: Some(10),
            }),
        )
        .await
        .unwrap();

        assert_eq!(listing.total, 1);
        assert!(listing.files.is_empty());
    }
}
