use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

use super::{error::ApiError, AppState};
use crate::auth::{cookie_value, session_clear_cookie, session_set_cookie};
use crate::error::GalleryError;
use crate::types::{Account, Credentials, User};

/// Session cookie value from the request headers, if present.
pub fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .find_map(|h| cookie_value(h, name))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

async fn current_user(deck: &AppState, headers: &HeaderMap) -> Result<Option<User>, ApiError> {
    match session_cookie(headers, &deck.config().session_cookie_name) {
        Some(v) => Ok(deck.user_from_cookie(&v).await?),
        None => Ok(None),
    }
}

/// Rejects requests without a valid session; the user is stored in the request extensions.
pub async fn require_session(State(deck): State<AppState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let user = current_user(&deck, req.headers()).await?.ok_or(GalleryError::Unauthenticated)?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

pub async fn me(State(deck): State<AppState>, headers: HeaderMap) -> Result<Json<Account>, ApiError> {
    let user = current_user(&deck, &headers).await?.ok_or(GalleryError::Unauthenticated)?;
    Ok(Json(Account { email: user.email }))
}

pub async fn login(State(deck): State<AppState>, body: Result<Json<Credentials>, JsonRejection>) -> Result<Response, ApiError> {
    let Json(creds) = body.map_err(|_| ApiError::bad_request("Invalid request body"))?;
    let session = deck.login(&creds.email, &creds.password).await?;
    let cfg = deck.config();
    let cookie = session_set_cookie(&cfg.session_cookie_name, &session.cookie_value, cfg.secure_cookies);
    Ok(([(header::SET_COOKIE, cookie)], Json(Account { email: session.user.email })).into_response())
}

pub async fn logout(State(deck): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let cfg = deck.config();
    if let Some(v) = session_cookie(&headers, &cfg.session_cookie_name) {
        deck.logout(&v).await?;
    }
    let cookie = session_clear_cookie(&cfg.session_cookie_name, cfg.secure_cookies);
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]).into_response())
}

pub async fn register(State(deck): State<AppState>, body: Result<Json<Credentials>, JsonRejection>) -> Result<Response, ApiError> {
    let Json(creds) = body.map_err(|_| ApiError::bad_request("Invalid request body"))?;
    match deck.register(&creds.email, &creds.password).await {
        Ok(_) => Ok((StatusCode::CREATED, Json(serde_json::json!({}))).into_response()),
        Err(e) if e.downcast_ref::<GalleryError>().is_some() => {
            tracing::info!(error = %e, "registration refused");
            Err(ApiError::bad_request("Error creating user"))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_cookie_from_any_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(header::COOKIE, HeaderValue::from_static("session=YWJjOjE="));
        assert_eq!(session_cookie(&headers, "session").as_deref(), Some("YWJjOjE="));
        assert_eq!(session_cookie(&headers, "sid"), None);
    }

    #[test]
    fn empty_cookie_counts_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session="));
        assert_eq!(session_cookie(&headers, "session"), None);
    }
}
