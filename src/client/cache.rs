//! Client-side gallery cache with optimistic updates.
//!
//! Pages hold item ids only; the items themselves live in one map keyed by id so a
//! change to an item shows up on every page that lists it. Invalidated pages keep
//! their ids until they are fetched again.

use std::collections::HashMap;

use crate::types::{FavoriteFilter, MediaItem, SearchPrefs};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    prefs: String,
    page: u32,
}

impl PageKey {
    pub fn new(prefs: &SearchPrefs, page: u32) -> Self { Self { prefs: prefs.to_query(), page } }
}

#[derive(Debug, Clone)]
struct CachedPage {
    ids: Vec<String>,
    stale: bool,
}

/// Snapshot taken before an optimistic change; hand it back to `GalleryCache::rollback`.
#[derive(Debug, Clone, Default)]
pub struct Rollback {
    item: Option<MediaItem>,
    page: Option<(PageKey, Vec<String>)>,
}

impl Rollback {
    fn merge(mut self, other: Rollback) -> Self {
        self.item = self.item.or(other.item);
        self.page = self.page.or(other.page);
        self
    }
}

#[derive(Debug, Default)]
pub struct GalleryCache {
    pages: HashMap<PageKey, CachedPage>,
    items: HashMap<String, MediaItem>,
    total_pages: HashMap<String, u32>,
}

impl GalleryCache {
    pub fn new() -> Self { Self::default() }

    /// Store a freshly fetched page and its items. Returns the page's ids.
    pub fn seed_page(&mut self, prefs: &SearchPrefs, page: u32, items: Vec<MediaItem>) -> Vec<String> {
        let ids: Vec<String> = items.iter().map(|m| m.id.clone()).collect();
        for item in items {
            self.items.insert(item.id.clone(), item);
        }
        self.pages.insert(PageKey::new(prefs, page), CachedPage { ids: ids.clone(), stale: false });
        ids
    }

    pub fn page(&self, prefs: &SearchPrefs, page: u32) -> Option<&[String]> {
        self.pages.get(&PageKey::new(prefs, page)).map(|p| p.ids.as_slice())
    }

    /// Items of a cached page, in page order. Ids without a cached item are left out.
    pub fn page_items(&self, prefs: &SearchPrefs, page: u32) -> Option<Vec<MediaItem>> {
        let ids = self.page(prefs, page)?;
        Some(ids.iter().filter_map(|id| self.items.get(id).cloned()).collect())
    }

    /// True when the page is missing or was invalidated.
    pub fn needs_fetch(&self, prefs: &SearchPrefs, page: u32) -> bool {
        self.pages.get(&PageKey::new(prefs, page)).map_or(true, |p| p.stale)
    }

    pub fn item(&self, id: &str) -> Option<&MediaItem> { self.items.get(id) }

    pub fn total_pages(&self, prefs: &SearchPrefs) -> Option<u32> { self.total_pages.get(&prefs.to_query()).copied() }

    pub fn set_total_pages(&mut self, prefs: &SearchPrefs, total: u32) { self.total_pages.insert(prefs.to_query(), total); }

    /// Neighbouring pages worth fetching alongside `page`, within `1..=total` when the total is known.
    pub fn pages_to_prefetch(page: u32, total: Option<u32>) -> Vec<u32> {
        [page.checked_sub(1), page.checked_add(1)]
            .into_iter()
            .flatten()
            .filter(|p| *p >= 1 && total.map_or(true, |t| *p <= t))
            .collect()
    }

    /// Flip the cached favorite flag. Under a favorites filter the item also leaves the visible page.
    pub fn optimistic_favorite(&mut self, id: &str, prefs: &SearchPrefs, page: u32) -> Rollback {
        let mut rb = Rollback::default();
        if let Some(item) = self.items.get_mut(id) {
            rb.item = Some(item.clone());
            item.favorite = !item.favorite;
        }
        if prefs.favorites != FavoriteFilter::All {
            rb = rb.merge(self.optimistic_remove(id, prefs, page));
        }
        rb
    }

    /// Drop `id` from a cached page.
    pub fn optimistic_remove(&mut self, id: &str, prefs: &SearchPrefs, page: u32) -> Rollback {
        let key = PageKey::new(prefs, page);
        let Some(cached) = self.pages.get_mut(&key) else {
            return Rollback::default();
        };
        let before = cached.ids.clone();
        cached.ids.retain(|i| i != id);
        Rollback { item: None, page: Some((key, before)) }
    }

    /// Put `item` at the end of a cached page (the slot freed by a delete).
    pub fn append_to_page(&mut self, prefs: &SearchPrefs, page: u32, item: MediaItem) {
        let Some(cached) = self.pages.get_mut(&PageKey::new(prefs, page)) else {
            return;
        };
        if !cached.ids.contains(&item.id) {
            cached.ids.push(item.id.clone());
        }
        self.items.insert(item.id.clone(), item);
    }

    /// Replace the cached item with the server's copy.
    pub fn confirm_item(&mut self, item: MediaItem) { self.items.insert(item.id.clone(), item); }

    pub fn rollback(&mut self, rb: Rollback) {
        if let Some(item) = rb.item {
            self.items.insert(item.id.clone(), item);
        }
        if let Some((key, ids)) = rb.page {
            if let Some(cached) = self.pages.get_mut(&key) {
                cached.ids = ids;
            }
        }
    }

    /// Mark every page stale and forget page totals. Items stay cached.
    pub fn invalidate_pages(&mut self) {
        for p in self.pages.values_mut() {
            p.stale = true;
        }
        self.total_pages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, favorite: bool) -> MediaItem {
        MediaItem {
            id: id.into(),
            file_name: format!("{id}.jpg"),
            file_size: 1,
            media_type: "photo".into(),
            favorite,
            seen: false,
            channel_title: None,
            created_at: "2024-01-01T00:00:00Z".into(),
            message_id: None,
            telegram_date: None,
            telegram_text: None,
            telegram_url: None,
            thumbnail: None,
        }
    }

    fn seeded(prefs: &SearchPrefs) -> GalleryCache {
        let mut c = GalleryCache::new();
        c.seed_page(prefs, 1, vec![item("a", false), item("b", true), item("c", false)]);
        c
    }

    #[test]
    fn prefetch_neighbours_stay_in_range() {
        assert_eq!(GalleryCache::pages_to_prefetch(1, Some(3)), vec![2]);
        assert_eq!(GalleryCache::pages_to_prefetch(2, Some(3)), vec![1, 3]);
        assert_eq!(GalleryCache::pages_to_prefetch(3, Some(3)), vec![2]);
        assert_eq!(GalleryCache::pages_to_prefetch(1, None), vec![2]);
        assert!(GalleryCache::pages_to_prefetch(1, Some(1)).is_empty());
    }

    #[test]
    fn favorite_flip_keeps_page_under_all_filter() {
        let prefs = SearchPrefs::default();
        let mut c = seeded(&prefs);
        c.optimistic_favorite("a", &prefs, 1);
        assert!(c.item("a").unwrap().favorite);
        assert_eq!(c.page(&prefs, 1).unwrap().len(), 3);
    }

    #[test]
    fn favorite_flip_removes_under_filter_and_rolls_back() {
        let prefs = SearchPrefs { favorites: FavoriteFilter::Favorites, ..SearchPrefs::default() };
        let mut c = seeded(&prefs);
        let rb = c.optimistic_favorite("b", &prefs, 1);
        assert!(!c.item("b").unwrap().favorite);
        assert_eq!(c.page(&prefs, 1).unwrap(), ["a", "c"]);

        c.rollback(rb);
        assert!(c.item("b").unwrap().favorite);
        assert_eq!(c.page(&prefs, 1).unwrap(), ["a", "b", "c"]);
    }

    #[test]
    fn delete_then_append_fills_the_slot() {
        let prefs = SearchPrefs::default();
        let mut c = seeded(&prefs);
        c.optimistic_remove("a", &prefs, 1);
        c.append_to_page(&prefs, 1, item("d", false));
        assert_eq!(c.page(&prefs, 1).unwrap(), ["b", "c", "d"]);
        assert_eq!(c.page_items(&prefs, 1).unwrap().len(), 3);
        // uncached pages are left alone
        c.append_to_page(&prefs, 2, item("e", false));
        assert!(c.page(&prefs, 2).is_none());
    }

    #[test]
    fn invalidation_marks_pages_stale() {
        let prefs = SearchPrefs::default();
        let mut c = seeded(&prefs);
        c.set_total_pages(&prefs, 4);
        assert!(!c.needs_fetch(&prefs, 1));
        c.invalidate_pages();
        assert!(c.needs_fetch(&prefs, 1));
        assert!(c.page(&prefs, 1).is_some());
        assert_eq!(c.total_pages(&prefs), None);
        assert!(c.item("a").is_some());
    }

    #[test]
    fn pages_are_keyed_by_prefs() {
        let mut c = GalleryCache::new();
        let all = SearchPrefs::default();
        let videos = SearchPrefs { videos: true, ..SearchPrefs::default() };
        c.seed_page(&all, 1, vec![item("a", false)]);
        assert!(c.page(&videos, 1).is_none());
        assert!(c.needs_fetch(&videos, 1));
    }
}
