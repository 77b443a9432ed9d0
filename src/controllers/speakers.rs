use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AdminUser;
use crate::models::{Speaker, SpeakerInput};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/speakers", get(list_speakers).post(create_speaker))
        .route("/speakers/{id}", get(get_speaker).put(update_speaker).delete(delete_speaker))
}

#[derive(Debug, Serialize)]
struct DeletedResponse {
    success: bool,
    message: String,
}

async fn list_speakers(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Speaker>>> {
    Ok(Json(state.cache.get_speakers().await?))
}

async fn get_speaker(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult<Json<Speaker>> {
    Speaker::find(id, &state.db.pool)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("speaker {}", id)))
}

async fn create_speaker(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(input): Json<SpeakerInput>,
) -> ApiResult<impl IntoResponse> {
    input.validate()?;

    let speaker = Speaker::create(&input, &state.db.pool).await?;
    state.cache.invalidate_speakers().await;
    tracing::info!(speaker_id = speaker.id, "Speaker created");

    Ok((StatusCode::CREATED, Json(speaker)))
}

async fn update_speaker(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(input): Json<SpeakerInput>,
) -> ApiResult<Json<Speaker>> {
    input.validate()?;

    let speaker = Speaker::update(id, &input, &state.db.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("speaker {}", id)))?;
    state.cache.invalidate_speakers().await;

    Ok(Json(speaker))
}

async fn delete_speaker(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeletedResponse>> {
    if !Speaker::delete(id, &state.db.pool).await? {
        return Err(ApiError::NotFound(format!("speaker {}", id)));
    }
    state.cache.invalidate_speakers().await;
    tracing::info!(speaker_id = id, "Speaker deleted");

    Ok(Json(DeletedResponse {
        success: true,
        message: "Speaker deleted".to_string(),
    }))
}
