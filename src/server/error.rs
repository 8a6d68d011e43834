use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::error::GalleryError;
use crate::types::MessageBody;

/// Error reply rendered as `{"message": ...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self { Self::new(StatusCode::BAD_REQUEST, message) }

    pub fn status(&self) -> StatusCode { self.status }

    pub fn message(&self) -> &str { &self.message }
}

pub fn status_for(e: &GalleryError) -> StatusCode {
    match e {
        GalleryError::NotFound => StatusCode::NOT_FOUND,
        GalleryError::FavoriteProtected
        | GalleryError::NotOnPage(_)
        | GalleryError::EmptySelection
        | GalleryError::NotAVideo
        | GalleryError::UserExists
        | GalleryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        GalleryError::InvalidCredentials | GalleryError::Unauthenticated => StatusCode::UNAUTHORIZED,
        GalleryError::QueueFull => StatusCode::SERVICE_UNAVAILABLE,
        GalleryError::UnsafePath(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<GalleryError> for ApiError {
    fn from(e: GalleryError) -> Self {
        let status = status_for(&e);
        if status.is_server_error() {
            tracing::error!(error = %e, "request failed");
        }
        Self::new(status, e.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        if let Some(g) = e.downcast_ref::<GalleryError>() {
            return g.clone().into();
        }
        tracing::error!(error = format!("{e:#}"), "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(MessageBody { message: self.message })).into_response()
    }
}
