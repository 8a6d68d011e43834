use std::path::Path;

use crate::dao::{MediaInsert, MediaRow};
use crate::types::MediaItem;

/// Media types the video filter and thumbnailer treat as motion content.
pub const VIDEO_TYPES: &[&str] = &["video", "gif", "webm", "mp4", "document"];

pub fn is_video_type(t: &str) -> bool { VIDEO_TYPES.contains(&t) }

/// Classify a file by extension, falling back to its guessed mime type.
pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" | "png" | "webp" | "bmp" => return Some("photo"),
        "gif" => return Some("gif"),
        "webm" => return Some("webm"),
        "mp4" | "mov" | "mkv" | "m4v" | "avi" => return Some("video"),
        _ => {}
    }
    let mime = mime_guess::from_ext(&ext).first()?;
    match mime.type_() {
        mime_guess::mime::IMAGE => Some("photo"),
        mime_guess::mime::VIDEO => Some("video"),
        _ => None,
    }
}

fn non_empty(s: String) -> Option<String> { (!s.is_empty()).then_some(s) }

/// Turn a COALESCEd row back into an item; `''` and `-1` mean absent.
pub fn media_item_from_row(r: MediaRow) -> MediaItem {
    MediaItem {
        id: r.id,
        file_name: r.file_name,
        file_size: r.file_size,
        media_type: non_empty(r.media_type).unwrap_or_else(|| "unknown".to_string()),
        favorite: r.favorite != 0,
        seen: r.seen != 0,
        channel_title: non_empty(r.channel_title),
        created_at: r.created_at,
        message_id: (r.message_id >= 0).then_some(r.message_id),
        telegram_date: non_empty(r.telegram_date),
        telegram_text: non_empty(r.telegram_text),
        telegram_url: non_empty(r.telegram_url),
        thumbnail: non_empty(r.thumbnail),
    }
}

pub fn media_insert_from_file(id: String, file_name: String, file_size: i64, media_type_id: i64, source_id: i64, created_at: String) -> MediaInsert {
    MediaInsert { id, source_id, media_type_id, file_name, file_size, created_at }
}

/// Thumbnail file name for an item; one frame per item, always JPEG.
pub fn thumbnail_name(media_item_id: &str) -> String { format!("{media_item_id}.jpg") }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_extensions() {
        assert_eq!(media_type_for_path(Path::new("a/b.JPG")), Some("photo"));
        assert_eq!(media_type_for_path(Path::new("clip.mp4")), Some("video"));
        assert_eq!(media_type_for_path(Path::new("loop.gif")), Some("gif"));
        assert_eq!(media_type_for_path(Path::new("notes.txt")), None);
        assert_eq!(media_type_for_path(Path::new("no_extension")), None);
    }

    #[test]
    fn gif_counts_as_video_not_photo() {
        assert!(is_video_type("gif"));
        assert!(is_video_type("mp4"));
        assert!(!is_video_type("photo"));
    }

    #[test]
    fn placeholders_map_back_to_none() {
        let row = MediaRow {
            id: "a".into(),
            file_name: "a.jpg".into(),
            file_size: 3,
            favorite: 1,
            seen: 0,
            created_at: "2024-01-01T00:00:00Z".into(),
            media_type: "photo".into(),
            channel_title: String::new(),
            message_id: -1,
            telegram_date: String::new(),
            telegram_text: String::new(),
            telegram_url: String::new(),
            thumbnail: String::new(),
        };
        let item = media_item_from_row(row.clone());
        assert!(item.favorite);
        assert_eq!((item.channel_title, item.message_id, item.thumbnail), (None, None, None));

        let item = media_item_from_row(MediaRow { message_id: 0, channel_title: "chan".into(), ..row });
        assert_eq!(item.message_id, Some(0));
        assert_eq!(item.channel_title.as_deref(), Some("chan"));
    }
}
