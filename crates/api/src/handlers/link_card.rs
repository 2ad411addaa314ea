//! Handlers for the `/link-cards` resource.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use ghostline_core::trust::CardStatus;
use ghostline_core::types::Timestamp;
use ghostline_db::models::link_card::LinkCard;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::handlers::json_body;
use crate::handlers::session::rfc3339;
use crate::middleware::auth::AuthSession;
use crate::state::AppState;

/// Request body for `POST /link-cards`. An empty body object is fine.
#[derive(Debug, Default, Deserialize)]
pub struct CreateLinkCardRequest {
    pub ttl_minutes: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LinkCardResponse {
    pub code: String,
    pub status: CardStatus,
    pub expires_at: String,
}

impl LinkCardResponse {
    /// Render `card` with the status clients should see at `now`.
    fn at(card: LinkCard, now: Timestamp) -> Self {
        Self {
            status: card.status_at(now),
            expires_at: rfc3339(card.expires_at),
            code: card.code,
        }
    }
}

/// POST /api/v1/link-cards
pub async fn create(
    auth: AuthSession,
    State(state): State<AppState>,
    body: Result<Json<CreateLinkCardRequest>, JsonRejection>,
) -> AppResult<Json<LinkCardResponse>> {
    let input = json_body(body)?;
    let card = state.trust.create_card(auth.anon_id(), input.ttl_minutes).await?;
    Ok(Json(LinkCardResponse::at(card, Utc::now())))
}

/// GET /api/v1/link-cards/mine
///
/// The caller's cards, newest first. Active cards past their expiry are
/// reported as `expired`.
pub async fn mine(
    auth: AuthSession,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<LinkCardResponse>>> {
    let now = Utc::now();
    let cards = state.trust.cards(auth.anon_id()).await?;
    Ok(Json(
        cards
            .into_iter()
            .map(|card| LinkCardResponse::at(card, now))
            .collect(),
    ))
}

#[derive(Debug, Serialize)]
pub struct RevokeLinkCardResponse {
    pub code: String,
    pub status: CardStatus,
}

/// POST /api/v1/link-cards/{code}/revoke
pub async fn revoke(
    auth: AuthSession,
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<Json<RevokeLinkCardResponse>> {
    state.trust.revoke_card(auth.anon_id(), &code).await?;
    Ok(Json(RevokeLinkCardResponse {
        code,
        status: CardStatus::Revoked,
    }))
}
