use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::error::GalleryError;

/// Filesystem side of the gallery: the media tree and its recycle bin.
#[async_trait]
pub trait MediaFiles: Send + Sync {
    /// Move `file_name` from the media tree into the recycle bin.
    async fn recycle(&self, file_name: &str) -> Result<()>;
    /// Move `file_name` back from the recycle bin into the media tree.
    async fn restore(&self, file_name: &str) -> Result<()>;
    fn media_path(&self, file_name: &str) -> Result<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct LocalMediaFiles {
    media_dir: PathBuf,
    recycle_dir: PathBuf,
}

impl LocalMediaFiles {
    pub fn new(media_dir: impl Into<PathBuf>, recycle_dir: impl Into<PathBuf>) -> Self {
        Self { media_dir: media_dir.into(), recycle_dir: recycle_dir.into() }
    }

    fn recycle_path(&self, file_name: &str) -> Result<PathBuf> { join_inside(&self.recycle_dir, file_name) }

    async fn move_file(src: &Path, dst: &Path) -> Result<()> {
        if let Some(parent) = dst.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        if tokio::fs::rename(src, dst).await.is_ok() {
            return Ok(());
        }
        // rename fails across filesystems; fall back to copy + remove
        tokio::fs::copy(src, dst)
            .await
            .with_context(|| format!("moving {} to {}", src.display(), dst.display()))?;
        tokio::fs::remove_file(src).await.with_context(|| format!("removing {}", src.display()))?;
        Ok(())
    }
}

#[async_trait]
impl MediaFiles for LocalMediaFiles {
    async fn recycle(&self, file_name: &str) -> Result<()> {
        let src = self.media_path(file_name)?;
        let dst = self.recycle_path(file_name)?;
        Self::move_file(&src, &dst).await?;
        tracing::debug!(file = file_name, "recycled");
        Ok(())
    }

    async fn restore(&self, file_name: &str) -> Result<()> {
        let src = self.recycle_path(file_name)?;
        let dst = self.media_path(file_name)?;
        Self::move_file(&src, &dst).await?;
        tracing::debug!(file = file_name, "restored from recycle bin");
        Ok(())
    }

    fn media_path(&self, file_name: &str) -> Result<PathBuf> { join_inside(&self.media_dir, file_name) }
}

/// Join a stored relative file name onto `base`, refusing anything that could escape it.
pub fn join_inside(base: &Path, file_name: &str) -> Result<PathBuf> {
    let rel = Path::new(file_name);
    let safe = !file_name.is_empty() && rel.components().all(|c| matches!(c, Component::Normal(_)));
    if !safe {
        return Err(GalleryError::UnsafePath(file_name.to_string()).into());
    }
    Ok(base.join(rel))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_escaping_paths() {
        let base = Path::new("/srv/media");
        assert!(join_inside(base, "../etc/passwd").is_err());
        assert!(join_inside(base, "/etc/passwd").is_err());
        assert!(join_inside(base, "").is_err());
        assert_eq!(join_inside(base, "chan/a.jpg").unwrap(), PathBuf::from("/srv/media/chan/a.jpg"));
    }

    #[tokio::test]
    async fn recycle_and_restore_move_files() {
        let tmp = tempfile::tempdir().unwrap();
        let media = tmp.path().join("media");
        let bin = tmp.path().join("recycle");
        std::fs::create_dir_all(media.join("chan")).unwrap();
        std::fs::write(media.join("chan/a.jpg"), b"jpg").unwrap();

        let files = LocalMediaFiles::new(&media, &bin);
        files.recycle("chan/a.jpg").await.unwrap();
        assert!(!media.join("chan/a.jpg").exists());
        assert!(bin.join("chan/a.jpg").exists());

        files.restore("chan/a.jpg").await.unwrap();
        assert_eq!(std::fs::read(media.join("chan/a.jpg")).unwrap(), b"jpg");
        assert!(!bin.join("chan/a.jpg").exists());
    }

    #[tokio::test]
    async fn recycling_a_missing_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let files = LocalMediaFiles::new(tmp.path().join("m"), tmp.path().join("r"));
        assert!(files.recycle("ghost.jpg").await.is_err());
    }
}
