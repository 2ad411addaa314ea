//! Handlers for the `/session` resource: device challenge, bootstrap,
//! refresh and self-inspection.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::{DateTime, SecondsFormat, Utc};
use ghostline_core::error::CoreError;
use serde::{Deserialize, Serialize};

use crate::auth::device::BootstrapInput;
use crate::auth::session::IssuedSession;
use crate::error::{AppError, AppResult};
use crate::handlers::json_body;
use crate::middleware::auth::AuthSession;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /session/challenge`.
#[derive(Debug, Deserialize)]
pub struct ChallengeRequest {
    #[serde(default)]
    pub device_public_id: String,
}

#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    pub nonce: String,
    pub expires_in_sec: i64,
}

/// Request body for `POST /session/bootstrap`.
#[derive(Debug, Deserialize)]
pub struct BootstrapRequest {
    #[serde(default)]
    pub device_public_id: String,
    #[serde(default)]
    pub nonce: String,
    /// Device clock, Unix seconds.
    #[serde(default)]
    pub ts: i64,
    /// Base64 HMAC-SHA256 over `device_public_id|nonce|ts`.
    #[serde(default)]
    pub proof: String,
    /// Base64 verifier; required on first contact only.
    pub device_secret_hash: Option<String>,
    pub region: Option<String>,
}

impl From<BootstrapRequest> for BootstrapInput {
    fn from(req: BootstrapRequest) -> Self {
        BootstrapInput {
            device_public_id: req.device_public_id,
            nonce: req.nonce,
            ts: req.ts,
            proof: req.proof,
            device_secret_hash: req.device_secret_hash,
            region: req.region,
        }
    }
}

/// Returned by bootstrap and refresh.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub anon_id: String,
    pub username: String,
    /// RFC 3339, UTC.
    pub expires_at: String,
}

impl SessionResponse {
    fn new(session: IssuedSession, username: String) -> Self {
        Self {
            expires_at: rfc3339(session.expires_at),
            token: session.token,
            anon_id: session.anon_id,
            username,
        }
    }
}

/// Returned by `GET /session/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub anon_id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub expires_at: String,
}

pub(crate) fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/session/challenge
///
/// Issue a single-use nonce for the device to sign.
pub async fn challenge(
    State(state): State<AppState>,
    body: Result<Json<ChallengeRequest>, JsonRejection>,
) -> AppResult<Json<ChallengeResponse>> {
    let input = json_body(body)?;
    let challenge = state.devices.challenge(&input.device_public_id).await?;

    Ok(Json(ChallengeResponse {
        nonce: challenge.nonce,
        expires_in_sec: challenge.expires_in_secs,
    }))
}

/// POST /api/v1/session/bootstrap
///
/// Verify the device proof over a fresh nonce and issue a session token.
/// Registers the device on first contact.
pub async fn bootstrap(
    State(state): State<AppState>,
    body: Result<Json<BootstrapRequest>, JsonRejection>,
) -> AppResult<Json<SessionResponse>> {
    let input: BootstrapInput = json_body(body)?.into();
    let done = state.devices.bootstrap(&input).await?;

    Ok(Json(SessionResponse::new(done.session, done.username)))
}

/// POST /api/v1/session/refresh
///
/// Issue a successor token for the same identity and region. The presented
/// token remains valid until its own expiry.
pub async fn refresh(
    auth: AuthSession,
    State(state): State<AppState>,
) -> AppResult<Json<SessionResponse>> {
    let session = state.sessions.refresh(&auth.claims).await?;
    let username = display_name(&state, auth.anon_id()).await?;

    Ok(Json(SessionResponse::new(session, username)))
}

/// GET /api/v1/session/me
pub async fn me(auth: AuthSession, State(state): State<AppState>) -> AppResult<Json<MeResponse>> {
    let username = display_name(&state, auth.anon_id()).await?;
    let expires_at = DateTime::<Utc>::from_timestamp(auth.claims.exp, 0).ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized("invalid or expired token".into()))
    })?;

    Ok(Json(MeResponse {
        anon_id: auth.claims.aid,
        username,
        region: auth.claims.region,
        expires_at: rfc3339(expires_at),
    }))
}

/// Display name of the device behind `anon_id`, or empty when the device
/// row is gone.
async fn display_name(state: &AppState, anon_id: &str) -> AppResult<String> {
    Ok(state
        .stores
        .devices
        .get_device_by_anon_id(anon_id)
        .await?
        .map(|d| d.username)
        .unwrap_or_default())
}
