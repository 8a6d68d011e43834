use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use super::{error::ApiError, AppState};
use crate::types::{
    DeletePageRequest, DeletePageResult, ImageScore, MediaId, MediaItem, MessageBody, PrefsQuery, TagWeight, ThumbnailFile,
};
use crate::ThumbnailStatus;

/// GET /api/gallery
pub async fn gallery(State(deck): State<AppState>, Query(q): Query<PrefsQuery>) -> Result<Json<Vec<MediaItem>>, ApiError> {
    Ok(Json(deck.gallery_page(&q.prefs(), q.page()).await?))
}

/// GET /api/gallery/ids
pub async fn gallery_ids(State(deck): State<AppState>, Query(q): Query<PrefsQuery>) -> Result<Json<Vec<MediaId>>, ApiError> {
    Ok(Json(deck.gallery_ids(&q.prefs(), q.page()).await?))
}

/// GET /api/gallery/totalPages
pub async fn total_pages(State(deck): State<AppState>, Query(q): Query<PrefsQuery>) -> Result<Json<u32>, ApiError> {
    let pages = deck.total_pages(&q.prefs()).await?;
    tracing::debug!(pages, "total pages");
    Ok(Json(pages))
}

pub async fn get_item(State(deck): State<AppState>, Path(id): Path<String>) -> Result<Json<MediaItem>, ApiError> {
    Ok(Json(deck.media_item(&id).await?))
}

/// DELETE /api/media/:id. Replies with the item that now fills the page, or 204.
pub async fn delete_item(
    State(deck): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<PrefsQuery>,
) -> Result<Response, ApiError> {
    match deck.recycle_and_get_next(&id, &q.prefs(), q.page()).await? {
        Some(next) => Ok(Json(next).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn toggle_favorite(State(deck): State<AppState>, Path(id): Path<String>) -> Result<Json<MediaItem>, ApiError> {
    Ok(Json(deck.toggle_favorite(&id).await?))
}

pub async fn get_tags(State(deck): State<AppState>, Path(id): Path<String>) -> Result<Json<Vec<TagWeight>>, ApiError> {
    Ok(Json(deck.item_tags(&id).await?))
}

pub async fn put_tags(
    State(deck): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Vec<TagWeight>>, JsonRejection>,
) -> Result<Json<Vec<TagWeight>>, ApiError> {
    let Json(tags) = body.map_err(|_| ApiError::bad_request("Invalid request body"))?;
    Ok(Json(deck.set_item_tags(&id, &tags).await?))
}

pub async fn get_score(State(deck): State<AppState>, Path(id): Path<String>) -> Result<Json<ImageScore>, ApiError> {
    Ok(Json(ImageScore { score: deck.image_score(&id).await? }))
}

pub async fn put_score(
    State(deck): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ImageScore>, JsonRejection>,
) -> Result<Json<ImageScore>, ApiError> {
    let Json(body) = body.map_err(|_| ApiError::bad_request("Invalid request body"))?;
    let score = body.score.ok_or_else(|| ApiError::bad_request("Missing score"))?;
    Ok(Json(ImageScore { score: Some(deck.set_image_score(&id, score).await?) }))
}

/// DELETE /api/page with `{itemIds}`; every id must be on the page the prefs select.
pub async fn delete_page(
    State(deck): State<AppState>,
    Query(q): Query<PrefsQuery>,
    body: Result<Json<DeletePageRequest>, JsonRejection>,
) -> Result<Json<DeletePageResult>, ApiError> {
    let Json(req) = body.map_err(|_| ApiError::bad_request("Invalid request body"))?;
    Ok(Json(deck.delete_page(&req.item_ids, &q.prefs(), q.page()).await?))
}

pub async fn undo(State(deck): State<AppState>) -> Result<Json<MediaItem>, ApiError> {
    match deck.undo_last_delete().await? {
        Some(item) => Ok(Json(item)),
        None => Err(ApiError::new(StatusCode::NOT_FOUND, "No deleted items to restore")),
    }
}

pub async fn thumbnail(State(deck): State<AppState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    Ok(match deck.thumbnail(&id).await? {
        ThumbnailStatus::Ready(file_name) => Json(ThumbnailFile { file_name }).into_response(),
        ThumbnailStatus::InProgress => (
            StatusCode::ACCEPTED,
            Json(MessageBody { message: "Thumbnail generation in progress".to_string() }),
        )
            .into_response(),
    })
}
