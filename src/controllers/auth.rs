use axum::{extract::State, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::middleware::{issue_token, AdminUser};
use crate::models::Admin;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/login", post(login))
        .route("/admin/me", get(me))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    success: bool,
    token: String,
    admin: Admin,
}

// POST /api/admin/login
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let admin = Admin::find_by_email(req.email.trim(), &state.db.pool)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    // bcrypt блокирует поток
    let (admin, valid) = tokio::task::spawn_blocking(move || {
        let valid = admin.verify_password(&req.password);
        (admin, valid)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("password check: {}", e)))?;

    if !valid {
        tracing::warn!(email = %admin.email, "Admin login rejected");
        return Err(ApiError::Unauthorized);
    }

    let token = issue_token(&admin, &state.config.jwt)
        .map_err(|e| ApiError::Internal(format!("token: {}", e)))?;
    tracing::info!(admin_id = admin.id, "Admin logged in");

    Ok(Json(LoginResponse { success: true, token, admin }))
}

async fn me(admin: AdminUser) -> Json<AdminUser> {
    Json(admin)
}
