//! Mix endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use alabanza_core::{Mix, MixDetails, MixRepo, NewMix};

use super::songs::Created;
use crate::http::error::ApiError;
use crate::http::extractors::Privileged;
use crate::http::server::AppState;

/// GET /mixes - every mix, newest first
async fn list_mixes(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Mix>>, ApiError> {
    Ok(Json(MixRepo::new(&state.exec).list().await?))
}

/// POST /mixes - add a mix; song names are kept in the given order
async fn create_mix(
    State(state): State<Arc<AppState>>,
    _: Privileged,
    Json(mix): Json<NewMix>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let id = MixRepo::new(&state.exec).add(&mix).await?;
    Ok((StatusCode::CREATED, Json(Created { id })))
}

/// GET /mixes/{id} - the mix with its songs resolved
async fn get_mix(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MixDetails>, ApiError> {
    MixRepo::new(&state.exec)
        .details(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound { resource: "mix", id })
}

/// DELETE /mixes/{id}
async fn delete_mix(
    State(state): State<Arc<AppState>>,
    _: Privileged,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if MixRepo::new(&state.exec).delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound { resource: "mix", id })
    }
}

/// Mix routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/mixes", get(list_mixes).post(create_mix))
        .route("/mixes/{id}", get(get_mix).delete(delete_mix))
}
