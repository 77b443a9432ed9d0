use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AdminUser;
use crate::models::{group_by_day, Day, Program, ProgramInput, Speaker};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/programs", get(list_programs).post(create_program))
        .route("/programs/{id}", get(get_program).put(update_program).delete(delete_program))
        .route("/admin/programs", get(admin_list_programs))
}

#[derive(Debug, Serialize)]
struct DeletedResponse {
    success: bool,
    message: String,
}

// GET /api/programs: программа по дням
async fn list_programs(State(state): State<Arc<AppState>>) -> ApiResult<Json<BTreeMap<Day, Vec<Program>>>> {
    let programs = state.cache.get_programs().await?;
    Ok(Json(group_by_day(&programs)))
}

async fn get_program(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResult<Json<Program>> {
    Program::find(id, &state.db.pool)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("program {}", id)))
}

// Админке нужен плоский список прямо из БД
async fn admin_list_programs(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> ApiResult<Json<Vec<Program>>> {
    Ok(Json(Program::list(&state.db.pool).await?))
}

async fn check_input(state: &AppState, input: &ProgramInput) -> ApiResult<()> {
    input.validate()?;

    if let Some(speaker_id) = input.speaker_id {
        if Speaker::find(speaker_id, &state.db.pool).await?.is_none() {
            return Err(ApiError::Validation(format!("speaker {} does not exist", speaker_id)));
        }
    }
    Ok(())
}

async fn create_program(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(input): Json<ProgramInput>,
) -> ApiResult<impl IntoResponse> {
    check_input(&state, &input).await?;

    let program = Program::create(&input, &state.db.pool).await?;
    state.cache.invalidate_programs().await;
    tracing::info!(program_id = program.id, day = %program.day, "Program session created");

    Ok((StatusCode::CREATED, Json(program)))
}

async fn update_program(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(input): Json<ProgramInput>,
) -> ApiResult<Json<Program>> {
    check_input(&state, &input).await?;

    let program = Program::update(id, &input, &state.db.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("program {}", id)))?;
    state.cache.invalidate_programs().await;

    Ok(Json(program))
}

async fn delete_program(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeletedResponse>> {
    if !Program::delete(id, &state.db.pool).await? {
        return Err(ApiError::NotFound(format!("program {}", id)));
    }
    state.cache.invalidate_programs().await;

    Ok(Json(DeletedResponse {
        success: true,
        message: "Program session deleted".to_string(),
    }))
}
