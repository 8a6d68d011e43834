use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::AnyPool;

use crate::mapping::{media_item_from_row, VIDEO_TYPES};
use crate::types::{FavoriteFilter, LibraryStats, MediaItem, SearchPrefs, TagWeight, User};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInsert {
    pub id: String,
    pub source_id: i64,
    pub media_type_id: i64,
    pub file_name: String,
    pub file_size: i64,
    pub created_at: String, // RFC 3339
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramInsert {
    pub media_item_id: String,
    pub channel_id: Option<i64>,
    pub message_id: Option<i64>,
    pub date: Option<String>,
    pub text: Option<String>,
    pub url: Option<String>,
}

/// One row of `MEDIA_SELECT`. Flags are stored as INTEGER.
///
/// The Any driver cannot decode NULL into `Option<T>`, so joined columns arrive
/// COALESCEd: `''` for missing text and `-1` for a missing message id.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MediaRow {
    pub id: String,
    pub file_name: String,
    pub file_size: i64,
    pub favorite: i64,
    pub seen: i64,
    pub created_at: String,
    pub media_type: String,
    pub channel_title: String,
    pub message_id: i64,
    pub telegram_date: String,
    pub telegram_text: String,
    pub telegram_url: String,
    pub thumbnail: String,
}

const MEDIA_SELECT: &str = "SELECT m.id, m.file_name, m.file_size, m.favorite, m.seen, m.created_at,\n\
    COALESCE(mt.type, '') AS media_type, COALESCE(c.title, '') AS channel_title,\n\
    COALESCE(tm.message_id, -1) AS message_id, COALESCE(tm.date, '') AS telegram_date,\n\
    COALESCE(tm.text, '') AS telegram_text, COALESCE(tm.url, '') AS telegram_url,\n\
    COALESCE(th.file_name, '') AS thumbnail\n\
    FROM media_items m\n\
    LEFT JOIN media_types mt ON m.media_type_id = mt.id\n\
    LEFT JOIN telegram_metadata tm ON tm.media_item_id = m.id\n\
    LEFT JOIN channels c ON tm.channel_id = c.id\n\
    LEFT JOIN thumbnails th ON th.media_item_id = m.id";

const MEDIA_FROM: &str = "FROM media_items m\n\
    LEFT JOIN media_types mt ON m.media_type_id = mt.id\n\
    LEFT JOIN telegram_metadata tm ON tm.media_item_id = m.id";

/// WHERE clause for the gallery filters plus its positional binds.
fn filter_clause(p: &SearchPrefs) -> (String, Vec<String>) {
    let mut clause = String::from("WHERE m.user_deleted = 0");
    let mut binds = Vec::new();
    if p.videos {
        clause.push_str(&format!(" AND mt.type IN ({})", video_types_sql()));
    }
    match p.favorites {
        FavoriteFilter::Favorites => clause.push_str(" AND m.favorite = 1"),
        FavoriteFilter::NonFavorites => clause.push_str(" AND m.favorite = 0"),
        FavoriteFilter::All => {}
    }
    if !p.search.is_empty() {
        clause.push_str(
            " AND (m.id IN (SELECT mit.media_item_id FROM media_item_tags mit JOIN tags t ON t.id = mit.tag_id WHERE t.name LIKE ? ESCAPE '\\')\n\
              OR tm.text LIKE ? ESCAPE '\\')",
        );
        let term = escape_like(&p.search);
        binds.push(format!("{term}%"));
        binds.push(format!("%{term}%"));
    }
    (clause, binds)
}

/// Make `%`, `_` and `\` match literally under `ESCAPE '\'`.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// `'video', 'gif', ...` for an SQL `IN` list.
fn video_types_sql() -> String {
    VIDEO_TYPES.iter().map(|t| format!("'{t}'")).collect::<Vec<_>>().join(", ")
}

pub async fn count_media(pool: &AnyPool, prefs: &SearchPrefs) -> Result<i64> {
    let (clause, binds) = filter_clause(prefs);
    let sql = format!("SELECT COUNT(*) {MEDIA_FROM} {clause}");
    let mut q = sqlx::query_scalar::<_, i64>(&sql);
    for b in &binds {
        q = q.bind(b.as_str());
    }
    Ok(q.fetch_one(pool).await?)
}

async fn query_media(pool: &AnyPool, prefs: &SearchPrefs, limit: i64, offset: i64) -> Result<Vec<MediaItem>> {
    let (clause, binds) = filter_clause(prefs);
    let sql = format!("{MEDIA_SELECT} {clause} ORDER BY {} LIMIT ? OFFSET ?", prefs.sort.order_by());
    let mut q = sqlx::query_as::<_, MediaRow>(&sql);
    for b in &binds {
        q = q.bind(b.as_str());
    }
    let rows = q.bind(limit).bind(offset).fetch_all(pool).await?;
    Ok(rows.into_iter().map(media_item_from_row).collect())
}

/// Page `page` (1-based) of the filtered gallery.
pub async fn list_media_page(pool: &AnyPool, prefs: &SearchPrefs, page: u32, page_size: u32) -> Result<Vec<MediaItem>> {
    let offset = (page.max(1) as i64 - 1) * page_size as i64;
    query_media(pool, prefs, page_size as i64, offset).await
}

pub async fn list_media_ids(pool: &AnyPool, prefs: &SearchPrefs, page: u32, page_size: u32) -> Result<Vec<String>> {
    Ok(list_media_page(pool, prefs, page, page_size).await?.into_iter().map(|m| m.id).collect())
}

/// Item at absolute position `offset` of the filtered gallery.
pub async fn media_at_offset(pool: &AnyPool, prefs: &SearchPrefs, offset: i64) -> Result<Option<MediaItem>> {
    if offset < 0 { return Ok(None); }
    Ok(query_media(pool, prefs, 1, offset).await?.into_iter().next())
}

/// Live (not deleted) item by id.
pub async fn get_media_item(pool: &AnyPool, id: &str) -> Result<Option<MediaItem>> {
    let sql = format!("{MEDIA_SELECT} WHERE m.id = ? AND m.user_deleted = 0 LIMIT 1");
    let row = sqlx::query_as::<_, MediaRow>(&sql).bind(id).fetch_optional(pool).await?;
    Ok(row.map(media_item_from_row))
}

pub async fn find_media_by_file_name(pool: &AnyPool, file_name: &str) -> Result<Option<String>> {
    let id = sqlx::query_scalar::<_, String>("SELECT id FROM media_items WHERE file_name = ? LIMIT 1")
        .bind(file_name)
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

/// Flip the favorite flag of a live item. `None` when the item is unknown or deleted.
pub async fn toggle_favorite(pool: &AnyPool, id: &str) -> Result<Option<MediaItem>> {
    let res = sqlx::query(
        "UPDATE media_items SET favorite = 1 - favorite, updated_at = CURRENT_TIMESTAMP WHERE id = ? AND user_deleted = 0",
    )
    .bind(id)
    .execute(pool)
    .await?;
    if res.rows_affected() == 0 { return Ok(None); }
    get_media_item(pool, id).await
}

/// Soft-delete a live, non-favorite item. Returns rows changed (0 or 1).
/// `deleted_at` is kept strictly increasing so undo order holds within one millisecond.
pub async fn mark_deleted(pool: &AnyPool, id: &str, deleted_at_ms: i64) -> Result<u64> {
    let res = sqlx::query(
        "UPDATE media_items SET user_deleted = 1,\n         deleted_at = MAX(?, COALESCE((SELECT MAX(deleted_at) FROM media_items), 0) + 1),\n         updated_at = CURRENT_TIMESTAMP\n         WHERE id = ? AND favorite = 0 AND user_deleted = 0",
    )
    .bind(deleted_at_ms)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(res.rows_affected())
}

pub async fn restore_deleted(pool: &AnyPool, id: &str) -> Result<u64> {
    let res = sqlx::query(
        "UPDATE media_items SET user_deleted = 0, deleted_at = NULL, updated_at = CURRENT_TIMESTAMP WHERE id = ? AND user_deleted = 1",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(res.rows_affected())
}

/// Most recently deleted item as (id, file_name).
pub async fn last_deleted(pool: &AnyPool) -> Result<Option<(String, String)>> {
    let row = sqlx::query_as::<_, (String, String)>(
        "SELECT id, file_name FROM media_items WHERE user_deleted = 1 AND deleted_at IS NOT NULL\n         ORDER BY deleted_at DESC, rowid DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

// --- ingestion ---

async fn upsert_named(pool: &AnyPool, table: &str, column: &str, value: &str) -> Result<i64> {
    sqlx::query(&format!("INSERT INTO {table}({column}) VALUES(?) ON CONFLICT({column}) DO NOTHING"))
        .bind(value)
        .execute(pool)
        .await?;
    let id = sqlx::query_scalar::<_, i64>(&format!("SELECT id FROM {table} WHERE {column} = ?"))
        .bind(value)
        .fetch_one(pool)
        .await?;
    Ok(id)
}

pub async fn upsert_source(pool: &AnyPool, name: &str) -> Result<i64> { upsert_named(pool, "sources", "name", name).await }

pub async fn upsert_media_type(pool: &AnyPool, media_type: &str) -> Result<i64> { upsert_named(pool, "media_types", "type", media_type).await }

pub async fn upsert_channel(pool: &AnyPool, title: &str) -> Result<i64> { upsert_named(pool, "channels", "title", title).await }

pub async fn insert_media_item(pool: &AnyPool, m: &MediaInsert) -> Result<()> {
    sqlx::query(
        "INSERT INTO media_items(id, source_id, media_type_id, file_name, file_size, created_at)\n         VALUES(?, ?, ?, ?, ?, ?)",
    )
    .bind(&m.id)
    .bind(m.source_id)
    .bind(m.media_type_id)
    .bind(&m.file_name)
    .bind(m.file_size)
    .bind(&m.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn upsert_telegram_metadata(pool: &AnyPool, t: &TelegramInsert) -> Result<()> {
    sqlx::query(
        "INSERT INTO telegram_metadata(media_item_id, channel_id, message_id, date, text, url)\n         VALUES(?, ?, ?, ?, ?, ?)\n         ON CONFLICT(media_item_id) DO UPDATE SET\n           channel_id=excluded.channel_id, message_id=excluded.message_id, date=excluded.date,\n           text=excluded.text, url=excluded.url",
    )
    .bind(&t.media_item_id)
    .bind(t.channel_id)
    .bind(t.message_id)
    .bind(&t.date)
    .bind(&t.text)
    .bind(&t.url)
    .execute(pool)
    .await?;
    Ok(())
}

// --- tags ---

/// Replace the tag set of an item.
pub async fn set_item_tags(pool: &AnyPool, media_item_id: &str, tags: &[TagWeight]) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM media_item_tags WHERE media_item_id = ?")
        .bind(media_item_id)
        .execute(&mut *tx)
        .await?;
    for t in tags {
        sqlx::query("INSERT INTO tags(name) VALUES(?) ON CONFLICT(name) DO NOTHING")
            .bind(&t.name)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO media_item_tags(media_item_id, tag_id, weight)\n             SELECT ?, id, ? FROM tags WHERE name = ?\n             ON CONFLICT(media_item_id, tag_id) DO UPDATE SET weight=excluded.weight",
        )
        .bind(media_item_id)
        .bind(t.weight)
        .bind(&t.name)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn get_item_tags(pool: &AnyPool, media_item_id: &str) -> Result<Vec<TagWeight>> {
    let rows = sqlx::query_as::<_, (String, f64)>(
        "SELECT t.name, mit.weight FROM media_item_tags mit JOIN tags t ON t.id = mit.tag_id\n         WHERE mit.media_item_id = ? ORDER BY mit.weight DESC, t.name",
    )
    .bind(media_item_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(name, weight)| TagWeight { name, weight }).collect())
}

// --- aesthetic scores ---

pub async fn get_image_score(pool: &AnyPool, media_item_id: &str) -> Result<Option<f64>> {
    let score = sqlx::query_scalar::<_, f64>("SELECT score FROM image_scores WHERE media_item_id = ?")
        .bind(media_item_id)
        .fetch_optional(pool)
        .await?;
    Ok(score)
}

pub async fn set_image_score(pool: &AnyPool, media_item_id: &str, score: f64) -> Result<()> {
    sqlx::query(
        "INSERT INTO image_scores(media_item_id, score) VALUES(?, ?)\n         ON CONFLICT(media_item_id) DO UPDATE SET score=excluded.score",
    )
    .bind(media_item_id)
    .bind(score)
    .execute(pool)
    .await?;
    Ok(())
}

// --- thumbnails ---

pub async fn get_thumbnail(pool: &AnyPool, media_item_id: &str) -> Result<Option<String>> {
    let name = sqlx::query_scalar::<_, String>("SELECT file_name FROM thumbnails WHERE media_item_id = ?")
        .bind(media_item_id)
        .fetch_optional(pool)
        .await?;
    Ok(name)
}

pub async fn set_thumbnail(pool: &AnyPool, media_item_id: &str, file_name: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO thumbnails(media_item_id, file_name) VALUES(?, ?)\n         ON CONFLICT(media_item_id) DO UPDATE SET file_name=excluded.file_name",
    )
    .bind(media_item_id)
    .bind(file_name)
    .execute(pool)
    .await?;
    Ok(())
}

// --- users & sessions ---

/// Insert a user; `None` when the email is already taken.
pub async fn create_user(pool: &AnyPool, email: &str, password_hash: &str) -> Result<Option<i64>> {
    let res = sqlx::query("INSERT INTO users(email, password) VALUES(?, ?) ON CONFLICT(email) DO NOTHING")
        .bind(email)
        .bind(password_hash)
        .execute(pool)
        .await?;
    if res.rows_affected() == 0 { return Ok(None); }
    let id = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(Some(id))
}

/// (id, email, password hash)
pub async fn find_user_by_email(pool: &AnyPool, email: &str) -> Result<Option<(i64, String, String)>> {
    let row = sqlx::query_as::<_, (i64, String, String)>("SELECT id, email, password FROM users WHERE email = ? LIMIT 1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create_session(pool: &AnyPool, session_id: &str, user_id: i64, created_at: i64) -> Result<()> {
    sqlx::query("INSERT INTO sessions(session_id, user_id, created_at) VALUES(?, ?, ?)")
        .bind(session_id)
        .bind(user_id)
        .bind(created_at)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn user_for_session(pool: &AnyPool, session_id: &str, user_id: i64) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, (i64, String)>(
        "SELECT u.id, u.email FROM sessions s JOIN users u ON u.id = s.user_id\n         WHERE s.session_id = ? AND s.user_id = ? LIMIT 1",
    )
    .bind(session_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(id, email)| User { id, email }))
}

pub async fn delete_session(pool: &AnyPool, session_id: &str) -> Result<u64> {
    let res = sqlx::query("DELETE FROM sessions WHERE session_id = ?")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

pub async fn library_stats(pool: &AnyPool) -> Result<LibraryStats> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media_items WHERE user_deleted = 0").fetch_one(pool).await?;
    let favorites: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media_items WHERE user_deleted = 0 AND favorite = 1").fetch_one(pool).await?;
    let videos_sql = format!(
        "SELECT COUNT(*) FROM media_items m JOIN media_types mt ON mt.id = m.media_type_id\n         WHERE m.user_deleted = 0 AND mt.type IN ({})",
        video_types_sql()
    );
    let videos: i64 = sqlx::query_scalar(&videos_sql).fetch_one(pool).await?;
    let deleted: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media_items WHERE user_deleted = 1").fetch_one(pool).await?;
    let channels: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM channels").fetch_one(pool).await?;
    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users").fetch_one(pool).await?;
    Ok(LibraryStats {
        total_items: total as usize,
        favorites: favorites as usize,
        videos: videos as usize,
        deleted: deleted as usize,
        channels: channels as usize,
        users: users as usize,
    })
}
