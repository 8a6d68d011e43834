use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sqlx::AnyPool;
use walkdir::WalkDir;

use crate::dao::{self, TelegramInsert};
use crate::mapping::{media_insert_from_file, media_type_for_path};

const IMPORT_SOURCE: &str = "import";

/// A media file found on disk, named relative to the media root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub file_name: String,
    pub file_size: i64,
    pub media_type: &'static str,
    pub modified: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub scanned: usize,
    pub imported: usize,
    pub already_known: usize,
    pub unsupported: usize,
}

/// Walk `dir` (which must lie inside `media_root`) and collect media files.
/// Returns the files plus a count of entries with an unknown media type.
pub fn scan_media_tree(media_root: &Path, dir: &Path) -> Result<(Vec<ScannedFile>, usize)> {
    let root = media_root
        .canonicalize()
        .with_context(|| format!("media directory {}", media_root.display()))?;
    let dir = if dir.is_absolute() { dir.to_path_buf() } else { media_root.join(dir) };
    let dir = dir.canonicalize().with_context(|| format!("import directory {}", dir.display()))?;
    anyhow::ensure!(dir.starts_with(&root), "{} is outside the media directory {}", dir.display(), root.display());

    let mut files = Vec::new();
    let mut unsupported = 0;
    for entry in WalkDir::new(&dir).follow_links(false).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(media_type) = media_type_for_path(path) else {
            tracing::debug!(path = %path.display(), "skipping unsupported file");
            unsupported += 1;
            continue;
        };
        let meta = entry.metadata().with_context(|| format!("stat {}", path.display()))?;
        let modified = meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now())
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        files.push(ScannedFile {
            file_name: relative_name(&root, path)?,
            file_size: meta.len() as i64,
            media_type,
            modified,
        });
    }
    Ok((files, unsupported))
}

/// `/`-separated path of `path` below `root`.
fn relative_name(root: &Path, path: &Path) -> Result<String> {
    let rel: PathBuf = path.strip_prefix(root).with_context(|| format!("{} not under {}", path.display(), root.display()))?.into();
    let parts: Vec<String> = rel.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect();
    Ok(parts.join("/"))
}

/// Register scanned files that the store does not know yet.
pub async fn import_files(pool: &AnyPool, files: &[ScannedFile], channel: Option<&str>) -> Result<ImportReport> {
    let source_id = dao::upsert_source(pool, IMPORT_SOURCE).await?;
    let channel_id = match channel.map(str::trim).filter(|c| !c.is_empty()) {
        Some(title) => Some(dao::upsert_channel(pool, title).await?),
        None => None,
    };

    let mut report = ImportReport { scanned: files.len(), ..ImportReport::default() };
    for f in files {
        if dao::find_media_by_file_name(pool, &f.file_name).await?.is_some() {
            report.already_known += 1;
            continue;
        }
        let media_type_id = dao::upsert_media_type(pool, f.media_type).await?;
        let id = uuid::Uuid::new_v4().to_string();
        let insert = media_insert_from_file(id.clone(), f.file_name.clone(), f.file_size, media_type_id, source_id, f.modified.clone());
        dao::insert_media_item(pool, &insert).await?;
        if channel_id.is_some() {
            let meta = TelegramInsert {
                media_item_id: id,
                channel_id,
                message_id: None,
                date: Some(f.modified.clone()),
                text: None,
                url: None,
            };
            dao::upsert_telegram_metadata(pool, &meta).await?;
        }
        report.imported += 1;
    }
    tracing::info!(imported = report.imported, known = report.already_known, "import finished");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_relative_names_and_types() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("cats/2024")).unwrap();
        std::fs::write(root.join("cats/a.jpg"), b"12345").unwrap();
        std::fs::write(root.join("cats/2024/b.mp4"), b"1").unwrap();
        std::fs::write(root.join("cats/notes.txt"), b"x").unwrap();

        let (files, unsupported) = scan_media_tree(root, Path::new("cats")).unwrap();
        assert_eq!(unsupported, 1);
        let names: Vec<_> = files.iter().map(|f| (f.file_name.as_str(), f.media_type)).collect();
        assert_eq!(names, vec![("cats/2024/b.mp4", "video"), ("cats/a.jpg", "photo")]);
        assert_eq!(files[1].file_size, 5);
        assert!(files[1].modified.ends_with('Z'));
    }

    #[test]
    fn refuses_directories_outside_the_root() {
        let media = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        assert!(scan_media_tree(media.path(), other.path()).is_err());
    }
}
