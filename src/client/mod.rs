//! Typed HTTP client for the gallery API plus a cached, optimistic gallery view on top of it.

pub mod cache;

use std::sync::{Mutex, MutexGuard};

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::types::{
    Account, Credentials, DeletePageRequest, DeletePageResult, FavoriteFilter, ImageScore, MediaId, MediaItem, MessageBody,
    SearchPrefs, TagWeight, ThumbnailFile,
};
use crate::ThumbnailStatus;
use cache::GalleryCache;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("server returned {status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            ClientError::Url(_) => None,
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// One method per server route. Keeps the session cookie between calls.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder().user_agent("teledeck/0.1").cookie_store(true).build()?;
        Ok(Self { http, base })
    }

    fn url(&self, path: &str) -> ClientResult<Url> { Ok(self.base.join(path)?) }

    fn gallery_url(&self, path: &str, prefs: &SearchPrefs, page: u32) -> ClientResult<Url> {
        self.url(&format!("{path}?{}", prefs.to_query_with_page(page)))
    }

    async fn check(resp: Response) -> ClientResult<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<MessageBody>(&text).map(|b| b.message).unwrap_or(text);
        Err(ClientError::Api { status, message })
    }

    async fn json<T: DeserializeOwned>(resp: Response) -> ClientResult<T> { Ok(Self::check(resp).await?.json().await?) }

    pub async fn gallery(&self, prefs: &SearchPrefs, page: u32) -> ClientResult<Vec<MediaItem>> {
        Self::json(self.http.get(self.gallery_url("api/gallery", prefs, page)?).send().await?).await
    }

    pub async fn gallery_ids(&self, prefs: &SearchPrefs, page: u32) -> ClientResult<Vec<MediaId>> {
        Self::json(self.http.get(self.gallery_url("api/gallery/ids", prefs, page)?).send().await?).await
    }

    pub async fn total_pages(&self, prefs: &SearchPrefs) -> ClientResult<u32> {
        let url = self.url(&format!("api/gallery/totalPages?{}", prefs.to_query()))?;
        Self::json(self.http.get(url).send().await?).await
    }

    pub async fn media_item(&self, id: &str) -> ClientResult<MediaItem> {
        Self::json(self.http.get(self.url(&format!("api/media/{id}"))?).send().await?).await
    }

    /// Delete an item; returns the item that moved into the page, if any.
    pub async fn delete_item(&self, id: &str, prefs: &SearchPrefs, page: u32) -> ClientResult<Option<MediaItem>> {
        let resp = Self::check(self.http.delete(self.gallery_url(&format!("api/media/{id}"), prefs, page)?).send().await?).await?;
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Ok(Some(resp.json().await?))
    }

    pub async fn toggle_favorite(&self, id: &str) -> ClientResult<MediaItem> {
        Self::json(self.http.post(self.url(&format!("api/media/{id}/favorite"))?).send().await?).await
    }

    pub async fn item_tags(&self, id: &str) -> ClientResult<Vec<TagWeight>> {
        Self::json(self.http.get(self.url(&format!("api/media/{id}/tags"))?).send().await?).await
    }

    pub async fn set_item_tags(&self, id: &str, tags: &[TagWeight]) -> ClientResult<Vec<TagWeight>> {
        Self::json(self.http.put(self.url(&format!("api/media/{id}/tags"))?).json(tags).send().await?).await
    }

    pub async fn image_score(&self, id: &str) -> ClientResult<Option<f64>> {
        let body: ImageScore = Self::json(self.http.get(self.url(&format!("api/media/{id}/score"))?).send().await?).await?;
        Ok(body.score)
    }

    pub async fn set_image_score(&self, id: &str, score: f64) -> ClientResult<Option<f64>> {
        let body = ImageScore { score: Some(score) };
        let body: ImageScore = Self::json(self.http.put(self.url(&format!("api/media/{id}/score"))?).json(&body).send().await?).await?;
        Ok(body.score)
    }

    pub async fn delete_page(&self, ids: &[String], prefs: &SearchPrefs, page: u32) -> ClientResult<DeletePageResult> {
        let body = DeletePageRequest { item_ids: ids.to_vec() };
        Self::json(self.http.delete(self.gallery_url("api/page", prefs, page)?).json(&body).send().await?).await
    }

    /// `None` when there is nothing to restore.
    pub async fn undo(&self) -> ClientResult<Option<MediaItem>> {
        match Self::json(self.http.post(self.url("api/undo")?).send().await?).await {
            Ok(item) => Ok(Some(item)),
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn thumbnail(&self, id: &str) -> ClientResult<ThumbnailStatus> {
        let resp = Self::check(self.http.get(self.url(&format!("api/thumbnail/{id}"))?).send().await?).await?;
        if resp.status() == StatusCode::ACCEPTED {
            return Ok(ThumbnailStatus::InProgress);
        }
        let file: ThumbnailFile = resp.json().await?;
        Ok(ThumbnailStatus::Ready(file.file_name))
    }

    /// Signed-in account, `None` when not authenticated.
    pub async fn me(&self) -> ClientResult<Option<Account>> {
        match Self::json(self.http.get(self.url("api/me")?).send().await?).await {
            Ok(acct) => Ok(Some(acct)),
            Err(e) if e.status() == Some(StatusCode::UNAUTHORIZED) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Account> {
        let body = Credentials { email: email.to_string(), password: password.to_string() };
        Self::json(self.http.post(self.url("api/login")?).json(&body).send().await?).await
    }

    pub async fn logout(&self) -> ClientResult<()> {
        Self::check(self.http.post(self.url("api/logout")?).send().await?).await?;
        Ok(())
    }

    pub async fn register(&self, email: &str, password: &str) -> ClientResult<()> {
        let body = Credentials { email: email.to_string(), password: password.to_string() };
        Self::check(self.http.post(self.url("api/register")?).json(&body).send().await?).await?;
        Ok(())
    }

    pub async fn health(&self) -> ClientResult<bool> {
        let resp = self.http.get(self.url("api/health")?).send().await?;
        Ok(resp.status().is_success())
    }
}

/// Gallery view backed by [`GalleryCache`]: pages are prefetched around the current one and
/// mutations are applied locally first, then reconciled with the server's answer.
pub struct Gallery {
    api: ApiClient,
    cache: Mutex<GalleryCache>,
}

impl Gallery {
    pub fn new(api: ApiClient) -> Self { Self { api, cache: Mutex::new(GalleryCache::new()) } }

    pub fn api(&self) -> &ApiClient { &self.api }

    // never held across an await
    fn cache(&self) -> MutexGuard<'_, GalleryCache> { self.cache.lock().unwrap_or_else(|e| e.into_inner()) }

    pub fn cached_page(&self, prefs: &SearchPrefs, page: u32) -> Option<Vec<MediaItem>> { self.cache().page_items(prefs, page) }

    pub fn cached_item(&self, id: &str) -> Option<MediaItem> { self.cache().item(id).cloned() }

    pub async fn total_pages(&self, prefs: &SearchPrefs) -> ClientResult<u32> {
        if let Some(t) = self.cache().total_pages(prefs) {
            return Ok(t);
        }
        let total = self.api.total_pages(prefs).await?;
        self.cache().set_total_pages(prefs, total);
        Ok(total)
    }

    /// Current page from cache or server, fetching the neighbouring pages at the same time.
    /// A failed prefetch is logged and otherwise ignored.
    pub async fn load_page(&self, prefs: &SearchPrefs, page: u32) -> ClientResult<Vec<MediaItem>> {
        let page = page.max(1);
        let (fetch_current, neighbours) = {
            let cache = self.cache();
            let total = cache.total_pages(prefs);
            let neighbours: Vec<u32> = GalleryCache::pages_to_prefetch(page, total)
                .into_iter()
                .filter(|p| cache.needs_fetch(prefs, *p))
                .collect();
            (cache.needs_fetch(prefs, page), neighbours)
        };

        let prefetch = futures::future::join_all(neighbours.into_iter().map(|p| async move { (p, self.api.gallery(prefs, p).await) }));
        let current = async {
            if fetch_current { Some(self.api.gallery(prefs, page).await) } else { None }
        };
        let (current, prefetched) = futures::join!(current, prefetch);

        let mut cache = self.cache();
        for (p, res) in prefetched {
            match res {
                Ok(items) => {
                    cache.seed_page(prefs, p, items);
                }
                Err(e) => tracing::warn!(page = p, error = %e, "prefetch failed"),
            }
        }
        if let Some(res) = current {
            cache.seed_page(prefs, page, res?);
        }
        Ok(cache.page_items(prefs, page).unwrap_or_default())
    }

    pub async fn toggle_favorite(&self, id: &str, prefs: &SearchPrefs, page: u32) -> ClientResult<MediaItem> {
        let rb = self.cache().optimistic_favorite(id, prefs, page);
        match self.api.toggle_favorite(id).await {
            Ok(item) => {
                let mut cache = self.cache();
                cache.confirm_item(item.clone());
                if prefs.favorites != FavoriteFilter::All {
                    cache.invalidate_pages();
                }
                Ok(item)
            }
            Err(e) => {
                tracing::warn!(id, error = %e, "favorite failed; rolling back");
                self.cache().rollback(rb);
                Err(e)
            }
        }
    }

    /// Delete an item. The freed slot is filled with the server's next item.
    pub async fn delete(&self, id: &str, prefs: &SearchPrefs, page: u32) -> ClientResult<Option<MediaItem>> {
        let rb = self.cache().optimistic_remove(id, prefs, page);
        match self.api.delete_item(id, prefs, page).await {
            Ok(next) => {
                let mut cache = self.cache();
                if let Some(n) = &next {
                    cache.append_to_page(prefs, page, n.clone());
                }
                cache.invalidate_pages();
                Ok(next)
            }
            Err(e) => {
                tracing::warn!(id, error = %e, "delete failed; rolling back");
                self.cache().rollback(rb);
                Err(e)
            }
        }
    }

    pub async fn delete_page(&self, ids: &[String], prefs: &SearchPrefs, page: u32) -> ClientResult<DeletePageResult> {
        let rollbacks: Vec<_> = {
            let mut cache = self.cache();
            ids.iter().map(|id| cache.optimistic_remove(id, prefs, page)).collect()
        };
        match self.api.delete_page(ids, prefs, page).await {
            Ok(res) => {
                let mut cache = self.cache();
                cache.invalidate_pages();
                cache.seed_page(prefs, page, res.next_page.clone());
                Ok(res)
            }
            Err(e) => {
                tracing::warn!(error = %e, "page delete failed; rolling back");
                let mut cache = self.cache();
                // first snapshot holds the untouched page
                for rb in rollbacks.into_iter().rev() {
                    cache.rollback(rb);
                }
                Err(e)
            }
        }
    }

    /// Restore the last deleted item; `None` when there was nothing to restore.
    pub async fn undo(&self) -> ClientResult<Option<MediaItem>> {
        let restored = self.api.undo().await?;
        if let Some(item) = &restored {
            let mut cache = self.cache();
            cache.confirm_item(item.clone());
            cache.invalidate_pages();
        }
        Ok(restored)
    }
}
