use thiserror::Error;

/// Gallery conditions callers are expected to branch on. Everything else travels as plain `anyhow`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GalleryError {
    #[error("Media item not found")]
    NotFound,
    #[error("Cannot delete a favorite item")]
    FavoriteProtected,
    #[error("Item ID {0} is not on the current page")]
    NotOnPage(String),
    #[error("No item IDs provided")]
    EmptySelection,
    #[error("Media item is not a video or gif")]
    NotAVideo,
    #[error("Thumbnail queue full")]
    QueueFull,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("User already exists")]
    UserExists,
    #[error("{0}")]
    InvalidInput(String),
    #[error("Path escapes the media directory: {0}")]
    UnsafePath(String),
}
