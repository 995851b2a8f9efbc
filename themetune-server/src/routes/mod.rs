use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{AppState, handlers};

/// Routes served under `/ThemeSongs`.
pub fn create_theme_songs_router() -> Router<AppState> {
    Router::new()
        .route("/DownloadTVShows", post(handlers::download_tv_shows))
        .route(
            "/Configuration",
            get(handlers::get_configuration).post(handlers::update_configuration),
        )
        .route("/Items/{entity_id}", get(handlers::get_theme_song))
        .route("/Items/{entity_id}/Audio", get(handlers::stream_theme_song))
}

/// Create the full application router
pub fn create_api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/ThemeSongs", create_theme_songs_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
