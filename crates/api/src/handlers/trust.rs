//! Handlers for the `/trust` resource.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use ghostline_core::trust::TrustStatus;
use ghostline_db::models::trust_request::TrustRequest;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::handlers::json_body;
use crate::middleware::auth::AuthSession;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TrustRequestIn {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct TrustRespondIn {
    #[serde(default)]
    pub request_id: String,
    /// `accepted` or `declined`.
    #[serde(default)]
    pub decision: String,
}

#[derive(Debug, Serialize)]
pub struct TrustRequestOut {
    pub request_id: String,
    pub status: TrustStatus,
}

impl From<TrustRequest> for TrustRequestOut {
    fn from(request: TrustRequest) -> Self {
        Self {
            request_id: request.id,
            status: request.status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TrustItem {
    pub request_id: String,
    pub code: String,
    pub status: TrustStatus,
    pub from_anon: String,
    pub to_anon: String,
}

impl From<TrustRequest> for TrustItem {
    fn from(request: TrustRequest) -> Self {
        Self {
            request_id: request.id,
            code: request.code,
            status: request.status,
            from_anon: request.from_anon,
            to_anon: request.to_anon,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TrustStatusOut {
    pub incoming: Vec<TrustItem>,
    pub outgoing: Vec<TrustItem>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/trust/request
///
/// Redeem a link card, opening a pending request to its owner.
pub async fn request(
    auth: AuthSession,
    State(state): State<AppState>,
    body: Result<Json<TrustRequestIn>, JsonRejection>,
) -> AppResult<Json<TrustRequestOut>> {
    let input = json_body(body)?;
    let request = state.trust.request(auth.anon_id(), &input.code).await?;
    Ok(Json(request.into()))
}

/// POST /api/v1/trust/respond
///
/// Accept or decline a pending request addressed to the caller.
pub async fn respond(
    auth: AuthSession,
    State(state): State<AppState>,
    body: Result<Json<TrustRespondIn>, JsonRejection>,
) -> AppResult<Json<TrustRequestOut>> {
    let input = json_body(body)?;
    let request = state
        .trust
        .respond(auth.anon_id(), &input.request_id, &input.decision)
        .await?;
    Ok(Json(request.into()))
}

/// GET /api/v1/trust/status
pub async fn status(
    auth: AuthSession,
    State(state): State<AppState>,
) -> AppResult<Json<TrustStatusOut>> {
    let overview = state.trust.status(auth.anon_id()).await?;
    Ok(Json(TrustStatusOut {
        incoming: overview.incoming.into_iter().map(Into::into).collect(),
        outgoing: overview.outgoing.into_iter().map(Into::into).collect(),
    }))
}
