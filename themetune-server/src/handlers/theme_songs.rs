use std::path::PathBuf;

use axum::{
    Json,
    body::Body,
    extract::{Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{info, warn};

use themetune_core::domain::{EntityId, ThemeSongSettings};

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

/// Start downloading missing TV theme songs in the background.
pub async fn download_tv_shows(State(state): State<AppState>) -> AppResult<StatusCode> {
    match state.downloads.try_start() {
        Some(_) => {
            info!("Theme song download requested");
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(AppError::conflict("A theme song download is already running")),
    }
}

pub async fn get_configuration(State(state): State<AppState>) -> Json<ThemeSongSettings> {
    Json(state.store.theme_song_settings())
}

pub async fn update_configuration(
    State(state): State<AppState>,
    Json(update): Json<ThemeSongSettings>,
) -> AppResult<StatusCode> {
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || store.update_settings(update))
        .await?
        .inspect_err(|err| warn!(error = %err, "Theme song settings could not be saved"))?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSongResponse {
    pub entity_id: EntityId,
    pub path: PathBuf,
}

pub async fn get_theme_song(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
) -> AppResult<Json<ThemeSongResponse>> {
    let (entity_id, path) = resolve(&state, &entity_id).await?;
    Ok(Json(ThemeSongResponse { entity_id, path }))
}

pub async fn stream_theme_song(
    State(state): State<AppState>,
    Path(entity_id): Path<String>,
    request: Request,
) -> AppResult<Response> {
    let (_, path) = resolve(&state, &entity_id).await?;
    let response = ServeFile::new(path)
        .oneshot(request)
        .await
        .map_err(|err| AppError::internal(err.to_string()))?;
    Ok(response.map(Body::new).into_response())
}

async fn resolve(state: &AppState, raw_id: &str) -> AppResult<(EntityId, PathBuf)> {
    let entity_id: EntityId = raw_id
        .parse()
        .map_err(|_| AppError::bad_request(format!("Invalid entity id: {raw_id}")))?;

    let entity = state
        .catalog
        .entity(entity_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Unknown entity: {entity_id}")))?;

    let resolver = state.resolver.clone();
    let path = tokio::task::spawn_blocking(move || resolver.resolve_theme_asset(&entity))
        .await?
        .ok_or_else(|| AppError::not_found(format!("No theme song for entity: {entity_id}")))?;

    Ok((entity_id, path))
}
