//! Operator endpoints for inspecting and revoking sessions.
//!
//! All handlers require [`RequireAdmin`]. Revocation deletes session rows;
//! already-issued tokens stay valid until they expire.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use ghostline_db::models::session::Session;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::json_body;
use crate::middleware::admin::RequireAdmin;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub anon_id: String,
    pub sessions: Vec<Session>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct RevokeAllRequest {
    #[serde(default)]
    pub anon_id: String,
}

#[derive(Debug, Serialize)]
pub struct RevokeResponse {
    pub message: &'static str,
    pub sessions_revoked: u64,
}

/// GET /api/v1/admin/sessions/{anon_id}
pub async fn list_sessions(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(anon_id): Path<String>,
) -> AppResult<Json<SessionListResponse>> {
    let sessions = state.sessions.list(&anon_id).await?;
    Ok(Json(SessionListResponse {
        total: sessions.len(),
        anon_id,
        sessions,
    }))
}

/// POST /api/v1/admin/sessions/revoke
pub async fn revoke(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    body: Result<Json<RevokeRequest>, JsonRejection>,
) -> AppResult<Json<RevokeResponse>> {
    let input = json_body(body)?;
    let token = input.token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("token required".into()));
    }

    let revoked = state.sessions.revoke(token).await?;
    tracing::info!(revoked, "Admin revoked session");
    Ok(Json(RevokeResponse {
        message: "session revoked",
        sessions_revoked: revoked,
    }))
}

/// POST /api/v1/admin/sessions/revoke-all
pub async fn revoke_all(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    body: Result<Json<RevokeAllRequest>, JsonRejection>,
) -> AppResult<Json<RevokeResponse>> {
    let input = json_body(body)?;
    let anon_id = input.anon_id.trim();
    if anon_id.is_empty() {
        return Err(AppError::BadRequest("anon_id required".into()));
    }

    let revoked = state.sessions.revoke_all(anon_id).await?;
    tracing::info!(anon_id, revoked, "Admin revoked all sessions");
    Ok(Json(RevokeResponse {
        message: "sessions revoked",
        sessions_revoked: revoked,
    }))
}
