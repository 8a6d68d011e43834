//! HTTP API over a shared [`Teledeck`](crate::Teledeck).

pub mod auth;
pub mod error;
pub mod media;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::Teledeck;
pub use error::ApiError;

pub type AppState = Arc<Teledeck>;

/// Build the full application router: `/api`, static media, thumbnails and the web app.
pub fn router(deck: AppState) -> Router {
    let cfg = deck.config();

    let gallery = Router::new()
        .route("/gallery", get(media::gallery))
        .route("/gallery/ids", get(media::gallery_ids))
        .route("/gallery/totalPages", get(media::total_pages))
        .route("/media/:id", get(media::get_item).delete(media::delete_item))
        .route("/media/:id/favorite", post(media::toggle_favorite))
        .route("/media/:id/tags", get(media::get_tags).put(media::put_tags))
        .route("/media/:id/score", get(media::get_score).put(media::put_score))
        .route("/page", delete(media::delete_page))
        .route("/undo", post(media::undo))
        .route("/thumbnail/:id", get(media::thumbnail));
    let gallery = guarded(gallery, &deck);

    let api = Router::new()
        .route("/me", get(auth::me))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/register", post(auth::register))
        .route("/health", get(health))
        .merge(gallery)
        .fallback(api_not_found);

    let files = Router::new()
        .nest_service("/media", ServeDir::new(&cfg.media_dir))
        .nest_service("/thumbnails", ServeDir::new(&cfg.thumbnail_dir));

    let mut app = Router::new().nest("/api", api).merge(guarded(files, &deck));
    if let Some(web) = &cfg.web_dir {
        app = app.fallback_service(ServeDir::new(web).fallback(ServeFile::new(web.join("index.html"))));
    }

    app.layer(TraceLayer::new_for_http()).with_state(deck)
}

/// Put `routes` behind the session check when `require_auth` is set.
fn guarded(routes: Router<AppState>, deck: &AppState) -> Router<AppState> {
    if deck.config().require_auth {
        routes.route_layer(middleware::from_fn_with_state(deck.clone(), auth::require_session))
    } else {
        routes
    }
}

async fn health() -> impl IntoResponse { Json(serde_json::json!({"status": "ok"})) }

async fn api_not_found() -> ApiError { ApiError::new(StatusCode::NOT_FOUND, "Not found") }

/// Bind `config.bind` and serve until Ctrl-C.
pub async fn serve(deck: AppState) -> Result<()> {
    let addr = deck.config().bind.clone();
    let listener = tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("binding {addr}"))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router(deck))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
