pub mod auth;
pub mod client;
pub mod config;
pub mod dao;
pub mod db;
pub mod error;
pub mod gesture;
pub mod ingest;
pub mod mapping;
pub mod server;
pub mod storage;
pub mod thumbnails;
pub mod types;

// --- Library API for embedding ---

/// Convenience re-exports for embedders.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::GalleryError;
    pub use crate::ingest::ImportReport;
    pub use crate::types::{
        DeletePageResult, FavoriteFilter, LibraryStats, MediaId, MediaItem, SearchPrefs, SortOrder, TagWeight, User,
    };
    pub use crate::{LoginSession, Teledeck, ThumbnailStatus};
}

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::Config;
use crate::db::Database;
use crate::error::GalleryError;
use crate::ingest::ImportReport;
use crate::mapping::thumbnail_name;
use crate::storage::{LocalMediaFiles, MediaFiles};
use crate::thumbnails::{FfmpegExtractor, FrameExtractor, ThumbnailResult, Thumbnailer};
use crate::types::{DeletePageResult, LibraryStats, MediaId, MediaItem, SearchPrefs, TagWeight, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailStatus {
    Ready(String),
    InProgress,
}

/// A freshly created login session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSession {
    pub user: User,
    pub session_id: String,
    /// Value for the session cookie.
    pub cookie_value: String,
}

/// Async library entry point. Owns the database, the media tree and the thumbnail workers.
pub struct Teledeck {
    config: Config,
    db: Database,
    files: Arc<dyn MediaFiles>,
    thumbnailer: Thumbnailer,
}

impl Teledeck {
    /// Connect, migrate and start the thumbnail workers with ffmpeg and the local media tree.
    pub async fn open(config: Config) -> Result<Self> {
        let files = Arc::new(LocalMediaFiles::new(&config.media_dir, &config.recycle_dir));
        let extractor = Arc::new(FfmpegExtractor::new(config.ffmpeg.clone()));
        Self::open_with(config, files, extractor).await
    }

    /// Like `open`, with the filesystem and frame extraction supplied by the caller.
    pub async fn open_with(config: Config, files: Arc<dyn MediaFiles>, extractor: Arc<dyn FrameExtractor>) -> Result<Self> {
        config.validate()?;
        let db = Database::connect(config.database_url.as_deref()).await?;
        db.run_migrations().await?;

        let (thumbnailer, results) = Thumbnailer::start(&config.thumbnail_dir, config.thumbnail_workers, extractor);
        tokio::spawn(persist_thumbnails(db.clone(), results));

        tracing::info!(media_dir = %config.media_dir.display(), page_size = config.page_size, "gallery opened");
        Ok(Self { config, db, files, thumbnailer })
    }

    pub fn config(&self) -> &Config { &self.config }

    pub fn database(&self) -> &Database { &self.db }

    fn page_size(&self) -> u32 { self.config.page_size }

    // --- browsing ---

    pub async fn gallery_page(&self, prefs: &SearchPrefs, page: u32) -> Result<Vec<MediaItem>> {
        dao::list_media_page(self.db.pool(), prefs, page.max(1), self.page_size()).await
    }

    pub async fn gallery_ids(&self, prefs: &SearchPrefs, page: u32) -> Result<Vec<MediaId>> {
        let ids = dao::list_media_ids(self.db.pool(), prefs, page.max(1), self.page_size()).await?;
        Ok(ids.into_iter().map(|id| MediaId { id }).collect())
    }

    /// Number of pages for `prefs`; zero when nothing matches.
    pub async fn total_pages(&self, prefs: &SearchPrefs) -> Result<u32> {
        let count = dao::count_media(self.db.pool(), prefs).await?.max(0) as u64;
        let size = self.page_size() as u64;
        Ok(count.div_ceil(size) as u32)
    }

    pub async fn media_item(&self, id: &str) -> Result<MediaItem> {
        dao::get_media_item(self.db.pool(), id).await?.ok_or_else(|| GalleryError::NotFound.into())
    }

    pub async fn toggle_favorite(&self, id: &str) -> Result<MediaItem> {
        let item = dao::toggle_favorite(self.db.pool(), id).await?.ok_or(GalleryError::NotFound)?;
        tracing::debug!(id, favorite = item.favorite, "favorite toggled");
        Ok(item)
    }

    // --- deletion ---

    /// Soft-delete `item` and move its file to the recycle bin. The mark is reverted if the move
    /// fails, unless the file was already gone.
    async fn recycle_item(&self, item: &MediaItem) -> Result<()> {
        if item.favorite {
            return Err(GalleryError::FavoriteProtected.into());
        }
        let pool = self.db.pool();
        if dao::mark_deleted(pool, &item.id, current_epoch_ms()).await? == 0 {
            // favorited or deleted since it was read
            return Err(match dao::get_media_item(pool, &item.id).await? {
                Some(m) if m.favorite => GalleryError::FavoriteProtected,
                _ => GalleryError::NotFound,
            }
            .into());
        }
        if let Err(e) = self.files.recycle(&item.file_name).await {
            if !is_missing_file(&e) {
                tracing::error!(id = %item.id, file = %item.file_name, error = %e, "recycle failed; reverting delete");
                dao::restore_deleted(pool, &item.id).await?;
                return Err(e.context(format!("recycling {}", item.file_name)));
            }
            tracing::warn!(id = %item.id, file = %item.file_name, "media file already missing; deleting the record only");
        }
        tracing::info!(id = %item.id, file = %item.file_name, "item deleted");
        Ok(())
    }

    /// Delete one item and return the item that slides into the last slot of `page`, if any.
    pub async fn recycle_and_get_next(&self, id: &str, prefs: &SearchPrefs, page: u32) -> Result<Option<MediaItem>> {
        let item = self.media_item(id).await?;
        self.recycle_item(&item).await?;
        let offset = page.max(1) as i64 * self.page_size() as i64 - 1;
        dao::media_at_offset(self.db.pool(), prefs, offset).await
    }

    /// Delete a selection from the current page. Favorites are skipped, not refused.
    pub async fn delete_page(&self, ids: &[String], prefs: &SearchPrefs, page: u32) -> Result<DeletePageResult> {
        if ids.is_empty() {
            return Err(GalleryError::EmptySelection.into());
        }
        let page = page.max(1);
        let on_page: HashSet<String> = dao::list_media_ids(self.db.pool(), prefs, page, self.page_size()).await?.into_iter().collect();
        if let Some(stray) = ids.iter().find(|id| !on_page.contains(*id)) {
            return Err(GalleryError::NotOnPage(stray.clone()).into());
        }

        let mut deleted_count = 0;
        let mut skipped_count = 0;
        let mut seen = HashSet::new();
        for id in ids.iter().filter(|id| seen.insert(id.as_str())) {
            let Some(item) = dao::get_media_item(self.db.pool(), id).await? else {
                skipped_count += 1;
                continue;
            };
            match self.recycle_item(&item).await {
                Ok(()) => deleted_count += 1,
                Err(e) => match e.downcast_ref::<GalleryError>() {
                    Some(GalleryError::FavoriteProtected | GalleryError::NotFound) => skipped_count += 1,
                    _ => return Err(e),
                },
            }
        }
        tracing::info!(deleted_count, skipped_count, page, "page delete");

        let next_page = self.gallery_page(prefs, page).await?;
        Ok(DeletePageResult { deleted_count, skipped_count, next_page })
    }

    /// Bring back the most recently deleted item. `None` when the recycle bin is empty.
    pub async fn undo_last_delete(&self) -> Result<Option<MediaItem>> {
        let pool = self.db.pool();
        let Some((id, file_name)) = dao::last_deleted(pool).await? else {
            return Ok(None);
        };
        if let Err(e) = self.files.restore(&file_name).await {
            if !is_missing_file(&e) {
                return Err(e.context(format!("restoring {file_name}")));
            }
            tracing::warn!(%id, file = %file_name, "recycled file missing; restoring the record only");
        }
        dao::restore_deleted(pool, &id).await?;
        tracing::info!(%id, file = %file_name, "delete undone");
        dao::get_media_item(pool, &id).await
    }

    // --- thumbnails ---

    /// Thumbnail for a video-like item, queueing generation when none exists yet.
    pub async fn thumbnail(&self, id: &str) -> Result<ThumbnailStatus> {
        let item = self.media_item(id).await?;
        if !item.is_video() {
            return Err(GalleryError::NotAVideo.into());
        }
        if let Some(name) = item.thumbnail {
            return Ok(ThumbnailStatus::Ready(name));
        }
        if self.thumbnailer.is_in_flight(&item.id) {
            return Ok(ThumbnailStatus::InProgress);
        }
        // generated earlier but never recorded
        let name = thumbnail_name(&item.id);
        if tokio::fs::try_exists(self.thumbnailer.out_dir().join(&name)).await.unwrap_or(false) {
            dao::set_thumbnail(self.db.pool(), &item.id, &name).await?;
            return Ok(ThumbnailStatus::Ready(name));
        }
        let src = self.files.media_path(&item.file_name)?;
        self.thumbnailer.request(&item.id, src)?;
        Ok(ThumbnailStatus::InProgress)
    }

    // --- tags ---

    pub async fn item_tags(&self, id: &str) -> Result<Vec<TagWeight>> {
        self.media_item(id).await?;
        dao::get_item_tags(self.db.pool(), id).await
    }

    pub async fn set_item_tags(&self, id: &str, tags: &[TagWeight]) -> Result<Vec<TagWeight>> {
        self.media_item(id).await?;
        if let Some(bad) = tags.iter().find(|t| t.name.trim().is_empty() || !(0.0..=1.0).contains(&t.weight)) {
            return Err(GalleryError::InvalidInput(format!("Invalid tag {:?} ({})", bad.name, bad.weight)).into());
        }
        dao::set_item_tags(self.db.pool(), id, tags).await?;
        dao::get_item_tags(self.db.pool(), id).await
    }

    // --- aesthetic scores ---

    /// Stored aesthetic score of an item; `None` until one is set.
    pub async fn image_score(&self, id: &str) -> Result<Option<f64>> {
        self.media_item(id).await?;
        dao::get_image_score(self.db.pool(), id).await
    }

    pub async fn set_image_score(&self, id: &str, score: f64) -> Result<f64> {
        self.media_item(id).await?;
        if !score.is_finite() {
            return Err(GalleryError::InvalidInput(format!("Invalid score {score}")).into());
        }
        dao::set_image_score(self.db.pool(), id, score).await?;
        tracing::debug!(id, score, "image score set");
        Ok(score)
    }

    // --- users & sessions ---

    pub async fn register(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        if email.is_empty() || !email.contains('@') || password.is_empty() {
            return Err(GalleryError::InvalidInput("Email and password are required".to_string()).into());
        }
        let hash = auth::hash_password(password)?;
        let id = dao::create_user(self.db.pool(), &email, &hash).await?.ok_or(GalleryError::UserExists)?;
        tracing::info!(user_id = id, "user registered");
        Ok(User { id, email })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession> {
        let email = normalize_email(email);
        let Some((user_id, email, hash)) = dao::find_user_by_email(self.db.pool(), &email).await? else {
            return Err(GalleryError::InvalidCredentials.into());
        };
        if !auth::verify_password(password, &hash) {
            return Err(GalleryError::InvalidCredentials.into());
        }
        let session_id = auth::new_session_id();
        dao::create_session(self.db.pool(), &session_id, user_id, current_epoch()).await?;
        let cookie_value = auth::encode_session_cookie(&session_id, user_id);
        tracing::info!(user_id, "login");
        Ok(LoginSession { user: User { id: user_id, email }, session_id, cookie_value })
    }

    /// Drop the session behind a cookie value. Unknown or malformed cookies are ignored.
    pub async fn logout(&self, cookie_value: &str) -> Result<()> {
        if let Some((session_id, _)) = auth::decode_session_cookie(cookie_value) {
            dao::delete_session(self.db.pool(), &session_id).await?;
        }
        Ok(())
    }

    pub async fn user_from_cookie(&self, cookie_value: &str) -> Result<Option<User>> {
        match auth::decode_session_cookie(cookie_value) {
            Some((session_id, user_id)) => dao::user_for_session(self.db.pool(), &session_id, user_id).await,
            None => Ok(None),
        }
    }

    // --- maintenance ---

    /// Register every media file under `dir` (inside the media directory) not yet in the store.
    pub async fn import_directory(&self, dir: &Path, channel: Option<&str>) -> Result<ImportReport> {
        let root = self.config.media_dir.clone();
        let target = dir.to_path_buf();
        let (files, unsupported) = tokio::task::spawn_blocking(move || ingest::scan_media_tree(&root, &target))
            .await
            .context("scan task panicked")??;
        let mut report = ingest::import_files(self.db.pool(), &files, channel).await?;
        report.unsupported = unsupported;
        Ok(report)
    }

    pub async fn stats(&self) -> Result<LibraryStats> { dao::library_stats(self.db.pool()).await }
}

async fn persist_thumbnails(db: Database, mut results: tokio::sync::mpsc::Receiver<ThumbnailResult>) {
    while let Some(r) = results.recv().await {
        match r.outcome {
            Ok(name) => {
                if let Err(e) = dao::set_thumbnail(db.pool(), &r.media_item_id, &name).await {
                    tracing::error!(id = %r.media_item_id, error = %e, "saving thumbnail failed");
                } else {
                    tracing::debug!(id = %r.media_item_id, file = %name, "thumbnail saved");
                }
            }
            Err(e) => tracing::error!(id = %r.media_item_id, error = %e, "thumbnail generation failed"),
        }
    }
}

fn is_missing_file(e: &anyhow::Error) -> bool {
    e.chain()
        .filter_map(|c| c.downcast_ref::<std::io::Error>())
        .any(|io| io.kind() == std::io::ErrorKind::NotFound)
}

fn normalize_email(email: &str) -> String { email.trim().to_ascii_lowercase() }

fn current_epoch() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

fn current_epoch_ms() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FavoriteFilter;
    use async_trait::async_trait;

    struct NoFrames;

    #[async_trait]
    impl FrameExtractor for NoFrames {
        async fn extract(&self, _src: &Path, out: &Path) -> Result<()> {
            tokio::fs::write(out, b"jpeg").await?;
            Ok(())
        }
    }

    struct Fixture {
        _tmp: tempfile::TempDir,
        media: std::path::PathBuf,
        recycle: std::path::PathBuf,
        deck: Teledeck,
    }

    async fn fixture(page_size: u32, files: &[&str]) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let media = tmp.path().join("media");
        let recycle = tmp.path().join("recycle");
        std::fs::create_dir_all(&media).unwrap();
        for f in files {
            std::fs::write(media.join(f), f.as_bytes()).unwrap();
        }
        let config = Config {
            database_url: Some(db::sqlite_url_for(&tmp.path().join("t.db"))),
            media_dir: media.clone(),
            recycle_dir: recycle.clone(),
            thumbnail_dir: tmp.path().join("thumbs"),
            page_size,
            ..Config::default()
        };
        let deck = Teledeck::open_with(config, Arc::new(LocalMediaFiles::new(&media, &recycle)), Arc::new(NoFrames)).await.unwrap();
        deck.import_directory(&media, Some("chan")).await.unwrap();
        Fixture { _tmp: tmp, media, recycle, deck }
    }

    fn by_name() -> SearchPrefs { SearchPrefs { sort: crate::types::SortOrder::IdAsc, ..SearchPrefs::default() } }

    async fn id_of(deck: &Teledeck, file: &str) -> String {
        dao::find_media_by_file_name(deck.database().pool(), file).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn pages_and_totals() {
        let fx = fixture(2, &["a.jpg", "b.jpg", "c.mp4"]).await;
        let prefs = SearchPrefs::default();
        assert_eq!(fx.deck.total_pages(&prefs).await.unwrap(), 2);
        assert_eq!(fx.deck.gallery_page(&prefs, 1).await.unwrap().len(), 2);
        assert_eq!(fx.deck.gallery_ids(&prefs, 2).await.unwrap().len(), 1);
        let videos = SearchPrefs { videos: true, ..SearchPrefs::default() };
        assert_eq!(fx.deck.total_pages(&videos).await.unwrap(), 1);
        let item = &fx.deck.gallery_page(&videos, 1).await.unwrap()[0];
        assert_eq!(item.file_name, "c.mp4");
        assert_eq!(item.channel_title.as_deref(), Some("chan"));
    }

    #[tokio::test]
    async fn favorites_cannot_be_deleted() {
        let fx = fixture(10, &["a.jpg"]).await;
        let id = id_of(&fx.deck, "a.jpg").await;
        assert!(fx.deck.toggle_favorite(&id).await.unwrap().favorite);
        let err = fx.deck.recycle_and_get_next(&id, &SearchPrefs::default(), 1).await.unwrap_err();
        assert_eq!(err.downcast_ref::<GalleryError>(), Some(&GalleryError::FavoriteProtected));
        assert!(fx.media.join("a.jpg").exists());

        let favs = SearchPrefs { favorites: FavoriteFilter::Favorites, ..SearchPrefs::default() };
        assert_eq!(fx.deck.total_pages(&favs).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_returns_next_and_undo_restores() {
        let fx = fixture(2, &["a.jpg", "b.jpg", "c.jpg"]).await;
        let prefs = by_name();
        let first = fx.deck.gallery_page(&prefs, 1).await.unwrap();
        let last = fx.deck.gallery_page(&prefs, 2).await.unwrap();

        let next = fx.deck.recycle_and_get_next(&first[0].id, &prefs, 1).await.unwrap();
        assert_eq!(next.map(|m| m.id), Some(last[0].id.clone()));
        assert!(fx.recycle.join(&first[0].file_name).exists());
        assert_eq!(fx.deck.total_pages(&prefs).await.unwrap(), 1);
        assert!(fx.deck.media_item(&first[0].id).await.is_err());

        let restored = fx.deck.undo_last_delete().await.unwrap().unwrap();
        assert_eq!(restored.id, first[0].id);
        assert!(fx.media.join(&first[0].file_name).exists());
        assert!(fx.deck.undo_last_delete().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_recycle_reverts_the_mark() {
        let fx = fixture(10, &["a.jpg"]).await;
        let id = id_of(&fx.deck, "a.jpg").await;
        // a plain file where the recycle bin should be
        std::fs::write(&fx.recycle, b"not a directory").unwrap();
        assert!(fx.deck.recycle_and_get_next(&id, &SearchPrefs::default(), 1).await.is_err());
        assert!(fx.deck.media_item(&id).await.is_ok());
        assert!(fx.media.join("a.jpg").exists());
    }

    #[tokio::test]
    async fn missing_file_still_deletes() {
        let fx = fixture(10, &["a.jpg", "b.jpg"]).await;
        let id = id_of(&fx.deck, "a.jpg").await;
        std::fs::remove_file(fx.media.join("a.jpg")).unwrap();
        fx.deck.recycle_and_get_next(&id, &SearchPrefs::default(), 1).await.unwrap();
        assert!(fx.deck.media_item(&id).await.is_err());
        assert_eq!(fx.deck.total_pages(&SearchPrefs::default()).await.unwrap(), 1);

        let restored = fx.deck.undo_last_delete().await.unwrap().unwrap();
        assert_eq!(restored.id, id);
    }

    #[tokio::test]
    async fn imports_without_channel_are_browsable() {
        let fx = fixture(10, &[]).await;
        std::fs::write(fx.media.join("plain.jpg"), b"x").unwrap();
        let report = fx.deck.import_directory(&fx.media, None).await.unwrap();
        assert_eq!(report.imported, 1);

        let id = id_of(&fx.deck, "plain.jpg").await;
        let item = fx.deck.media_item(&id).await.unwrap();
        assert_eq!((item.channel_title, item.message_id, item.telegram_text), (None, None, None));
        assert_eq!(fx.deck.gallery_page(&SearchPrefs::default(), 1).await.unwrap().len(), 1);
        assert!(fx.deck.toggle_favorite(&id).await.unwrap().favorite);
    }

    #[tokio::test]
    async fn image_scores() {
        let fx = fixture(10, &["a.jpg"]).await;
        let id = id_of(&fx.deck, "a.jpg").await;
        assert_eq!(fx.deck.image_score(&id).await.unwrap(), None);
        assert_eq!(fx.deck.set_image_score(&id, 5.5).await.unwrap(), 5.5);
        assert_eq!(fx.deck.image_score(&id).await.unwrap(), Some(5.5));

        let err = fx.deck.set_image_score(&id, f64::NAN).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<GalleryError>(), Some(GalleryError::InvalidInput(_))));
        let err = fx.deck.image_score("nope").await.unwrap_err();
        assert_eq!(err.downcast_ref::<GalleryError>(), Some(&GalleryError::NotFound));
    }

    #[tokio::test]
    async fn delete_page_checks_membership_and_skips_favorites() {
        let fx = fixture(2, &["a.jpg", "b.jpg", "c.jpg"]).await;
        let prefs = by_name();
        let page1: Vec<String> = fx.deck.gallery_page(&prefs, 1).await.unwrap().into_iter().map(|m| m.id).collect();
        let page2: Vec<String> = fx.deck.gallery_page(&prefs, 2).await.unwrap().into_iter().map(|m| m.id).collect();

        let err = fx.deck.delete_page(&page2, &prefs, 1).await.unwrap_err();
        assert_eq!(err.downcast_ref::<GalleryError>(), Some(&GalleryError::NotOnPage(page2[0].clone())));
        let err = fx.deck.delete_page(&[], &prefs, 1).await.unwrap_err();
        assert_eq!(err.downcast_ref::<GalleryError>(), Some(&GalleryError::EmptySelection));

        fx.deck.toggle_favorite(&page1[0]).await.unwrap();
        let res = fx.deck.delete_page(&page1, &prefs, 1).await.unwrap();
        assert_eq!((res.deleted_count, res.skipped_count), (1, 1));
        let ids: Vec<_> = res.next_page.iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec![page1[0].clone(), page2[0].clone()]);
    }

    #[tokio::test]
    async fn thumbnails_only_for_videos() {
        let fx = fixture(10, &["a.jpg", "v.mp4"]).await;
        let photo = id_of(&fx.deck, "a.jpg").await;
        let err = fx.deck.thumbnail(&photo).await.unwrap_err();
        assert_eq!(err.downcast_ref::<GalleryError>(), Some(&GalleryError::NotAVideo));

        let video = id_of(&fx.deck, "v.mp4").await;
        let mut status = fx.deck.thumbnail(&video).await.unwrap();
        for _ in 0..50 {
            if status != ThumbnailStatus::InProgress { break; }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            status = fx.deck.thumbnail(&video).await.unwrap();
        }
        assert_eq!(status, ThumbnailStatus::Ready(format!("{video}.jpg")));
    }

    #[tokio::test]
    async fn register_login_logout() {
        let fx = fixture(10, &[]).await;
        let user = fx.deck.register(" Me@Example.com ", "pw").await.unwrap();
        assert_eq!(user.email, "me@example.com");
        let err = fx.deck.register("me@example.com", "other").await.unwrap_err();
        assert_eq!(err.downcast_ref::<GalleryError>(), Some(&GalleryError::UserExists));

        let err = fx.deck.login("me@example.com", "wrong").await.unwrap_err();
        assert_eq!(err.downcast_ref::<GalleryError>(), Some(&GalleryError::InvalidCredentials));

        let session = fx.deck.login("me@example.com", "pw").await.unwrap();
        assert_eq!(fx.deck.user_from_cookie(&session.cookie_value).await.unwrap(), Some(user));
        fx.deck.logout(&session.cookie_value).await.unwrap();
        assert_eq!(fx.deck.user_from_cookie(&session.cookie_value).await.unwrap(), None);
        assert_eq!(fx.deck.user_from_cookie("garbage").await.unwrap(), None);
    }

    #[tokio::test]
    async fn import_is_idempotent() {
        let fx = fixture(10, &["a.jpg", "b.gif"]).await;
        let again = fx.deck.import_directory(&fx.media, None).await.unwrap();
        assert_eq!((again.scanned, again.imported, again.already_known), (2, 0, 2));
        let stats = fx.deck.stats().await.unwrap();
        assert_eq!((stats.total_items, stats.videos, stats.channels), (2, 1, 1));
    }
}
