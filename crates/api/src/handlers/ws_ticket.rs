//! Handler trading a bearer session for a single-use chat ticket.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::handlers::json_body;
use crate::middleware::auth::AuthSession;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TicketRequest {
    /// Identity the caller wants to chat with.
    #[serde(default)]
    pub peer: String,
}

#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub ticket: String,
    /// Seconds until the ticket lapses.
    pub expires_in: u64,
}

/// POST /api/v1/ws/ticket
///
/// Requires an accepted trust link between the caller and `peer`.
pub async fn create(
    auth: AuthSession,
    State(state): State<AppState>,
    body: Result<Json<TicketRequest>, JsonRejection>,
) -> AppResult<Json<TicketResponse>> {
    let input = json_body(body)?;
    let issued = state
        .tickets
        .issue(&state.trust, auth.anon_id(), &input.peer)
        .await?;

    tracing::debug!(anon_id = %auth.anon_id(), "Issued chat ticket");
    Ok(Json(TicketResponse {
        ticket: issued.token,
        expires_in: issued.expires_in_secs,
    }))
}
