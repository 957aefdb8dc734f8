//! Song endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use alabanza_core::{NewSong, Song, SongRepo, SongSummary};

use crate::http::error::ApiError;
use crate::http::extractors::Privileged;
use crate::http::server::AppState;

/// Id of a newly created record
#[derive(Serialize)]
pub struct Created {
    pub id: i64,
}

/// GET /songs - every song, newest first
async fn list_songs(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Song>>, ApiError> {
    Ok(Json(SongRepo::new(&state.exec).list().await?))
}

/// GET /songs/summary - id, name, tones and best singer only
async fn list_summaries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SongSummary>>, ApiError> {
    Ok(Json(SongRepo::new(&state.exec).list_light().await?))
}

/// POST /songs - add a song
async fn create_song(
    State(state): State<Arc<AppState>>,
    _: Privileged,
    Json(song): Json<NewSong>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let id = SongRepo::new(&state.exec).add(&song).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

/// GET /songs/{id}
async fn get_song(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Song>, ApiError> {
    SongRepo::new(&state.exec)
        .get(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound {
            resource: "song",
            id,
        })
}

/// DELETE /songs/{id}
async fn delete_song(
    State(state): State<Arc<AppState>>,
    _: Privileged,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if SongRepo::new(&state.exec).delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound {
            resource: "song",
            id,
        })
    }
}

/// Song routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/songs", get(list_songs).post(create_song))
        .route("/songs/summary", get(list_summaries))
        .route("/songs/{id}", get(get_song).delete(delete_song))
}
