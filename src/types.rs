use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Gallery ordering. Unknown values parse to the default (`date_desc`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    DateDesc,
    DateAsc,
    IdDesc,
    IdAsc,
    SizeDesc,
    SizeAsc,
    Random,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::DateDesc => "date_desc",
            SortOrder::DateAsc => "date_asc",
            SortOrder::IdDesc => "id_desc",
            SortOrder::IdAsc => "id_asc",
            SortOrder::SizeDesc => "size_desc",
            SortOrder::SizeAsc => "size_asc",
            SortOrder::Random => "random",
        }
    }

    /// ORDER BY fragment; `m.id` breaks ties so pages are stable.
    pub(crate) fn order_by(&self) -> &'static str {
        match self {
            SortOrder::DateDesc => "m.created_at DESC, m.id",
            SortOrder::DateAsc => "m.created_at ASC, m.id",
            SortOrder::IdDesc => "tm.message_id DESC, m.id",
            SortOrder::IdAsc => "tm.message_id ASC, m.id",
            SortOrder::SizeDesc => "m.file_size DESC, m.id",
            SortOrder::SizeAsc => "m.file_size ASC, m.id",
            SortOrder::Random => "RANDOM()",
        }
    }
}

impl FromStr for SortOrder {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "date_asc" => SortOrder::DateAsc,
            "id_desc" => SortOrder::IdDesc,
            "id_asc" => SortOrder::IdAsc,
            "size_desc" => SortOrder::SizeDesc,
            "size_asc" => SortOrder::SizeAsc,
            "random" => SortOrder::Random,
            _ => SortOrder::DateDesc,
        })
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FavoriteFilter {
    #[default]
    All,
    Favorites,
    NonFavorites,
}

impl FavoriteFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            FavoriteFilter::All => "all",
            FavoriteFilter::Favorites => "favorites",
            FavoriteFilter::NonFavorites => "non-favorites",
        }
    }
}

impl FromStr for FavoriteFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "favorites" => FavoriteFilter::Favorites,
            "non-favorites" => FavoriteFilter::NonFavorites,
            _ => FavoriteFilter::All,
        })
    }
}

impl fmt::Display for FavoriteFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Filter and sort state chosen by the user. The current page travels next to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SearchPrefs {
    pub sort: SortOrder,
    pub videos: bool,
    pub favorites: FavoriteFilter,
    pub search: String,
}

/// Raw query parameters as sent by the web client (`?sort=..&videos=..&page=..`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PrefsQuery {
    pub sort: Option<String>,
    pub videos: Option<String>,
    pub favorites: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
}

impl PrefsQuery {
    pub fn prefs(&self) -> SearchPrefs {
        SearchPrefs {
            sort: self.sort.as_deref().map(parse_infallible).unwrap_or_default(),
            videos: self.videos.as_deref().map(|v| matches!(v.trim(), "true" | "1" | "on")).unwrap_or(false),
            favorites: self.favorites.as_deref().map(parse_infallible).unwrap_or_default(),
            search: self.search.as_deref().map(str::trim).unwrap_or_default().to_string(),
        }
    }

    /// 1-based page; missing, unparsable or < 1 becomes 1.
    pub fn page(&self) -> u32 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .map(|p| p.min(u32::MAX as i64) as u32)
            .unwrap_or(1)
    }
}

fn parse_infallible<T: FromStr<Err = std::convert::Infallible>>(s: &str) -> T {
    match s.parse() {
        Ok(v) => v,
        Err(never) => match never {},
    }
}

impl SearchPrefs {
    /// Query string in the same shape the server parses. Also used as a cache key.
    pub fn to_query(&self) -> String {
        let mut out = url::form_urlencoded::Serializer::new(String::new());
        out.append_pair("sort", self.sort.as_str());
        out.append_pair("videos", if self.videos { "true" } else { "false" });
        out.append_pair("favorites", self.favorites.as_str());
        out.append_pair("search", &self.search);
        out.finish()
    }

    pub fn to_query_with_page(&self, page: u32) -> String {
        format!("{}&page={}", self.to_query(), page)
    }
}

/// A gallery entry joined with its Telegram metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    pub file_name: String,
    pub file_size: i64,
    pub media_type: String,
    pub favorite: bool,
    pub seen: bool,
    pub channel_title: Option<String>,
    pub created_at: String,
    pub message_id: Option<i64>,
    pub telegram_date: Option<String>,
    pub telegram_text: Option<String>,
    pub telegram_url: Option<String>,
    pub thumbnail: Option<String>,
}

impl MediaItem {
    pub fn is_video(&self) -> bool { crate::mapping::is_video_type(&self.media_type) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaId {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePageResult {
    pub deleted_count: usize,
    pub skipped_count: usize,
    pub next_page: Vec<MediaItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagWeight {
    #[serde(rename = "tag")]
    pub name: String,
    #[serde(rename = "prob")]
    pub weight: f64,
}

/// Aesthetic score body; `null` when the item has not been scored.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageScore {
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryStats {
    pub total_items: usize,
    pub favorites: usize,
    pub videos: usize,
    pub deleted: usize,
    pub channels: usize,
    pub users: usize,
}

// --- HTTP bodies shared by the server and the client ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePageRequest {
    #[serde(default)]
    pub item_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// `/api/me` and login response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailFile {
    pub file_name: String,
}

/// Body of every error response, and of the 202 thumbnail reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_values_fall_back_to_defaults() {
        let q = PrefsQuery {
            sort: Some("sideways".into()),
            favorites: Some("maybe".into()),
            videos: Some("nope".into()),
            ..Default::default()
        };
        assert_eq!(q.prefs(), SearchPrefs::default());
    }

    #[test]
    fn page_clamps_to_one() {
        for raw in [None, Some("0"), Some("-3"), Some("abc")] {
            let q = PrefsQuery { page: raw.map(String::from), ..Default::default() };
            assert_eq!(q.page(), 1);
        }
        let q = PrefsQuery { page: Some("7".into()), ..Default::default() };
        assert_eq!(q.page(), 7);
    }

    #[test]
    fn query_string_parses_back() {
        let prefs = SearchPrefs {
            sort: SortOrder::SizeAsc,
            videos: true,
            favorites: FavoriteFilter::NonFavorites,
            search: "cat & dog".into(),
        };
        let encoded = prefs.to_query_with_page(3);
        let parsed: PrefsQuery = serde_urlencoded_like(&encoded);
        assert_eq!(parsed.prefs(), prefs);
        assert_eq!(parsed.page(), 3);
    }

    fn serde_urlencoded_like(q: &str) -> PrefsQuery {
        let mut out = PrefsQuery::default();
        for (k, v) in url::form_urlencoded::parse(q.as_bytes()) {
            let v = Some(v.into_owned());
            match k.as_ref() {
                "sort" => out.sort = v,
                "videos" => out.videos = v,
                "favorites" => out.favorites = v,
                "search" => out.search = v,
                "page" => out.page = v,
                _ => {}
            }
        }
        out
    }

    #[test]
    fn media_item_serializes_camel_case() {
        let item = MediaItem {
            id: "a".into(),
            file_name: "a.jpg".into(),
            file_size: 1,
            media_type: "photo".into(),
            favorite: true,
            seen: false,
            channel_title: Some("chan".into()),
            created_at: "2024-01-01T00:00:00Z".into(),
            message_id: None,
            telegram_date: None,
            telegram_text: Some("hello".into()),
            telegram_url: None,
            thumbnail: None,
        };
        let v = serde_json::to_value(&item).unwrap();
        assert_eq!(v["fileName"], "a.jpg");
        assert_eq!(v["channelTitle"], "chan");
        assert_eq!(v["telegramText"], "hello");
        assert_eq!(v["favorite"], true);
    }
}
