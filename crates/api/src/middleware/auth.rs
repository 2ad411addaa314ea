//! Bearer-token authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use ghostline_core::error::CoreError;

use crate::auth::jwt::SessionClaims;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated session extracted from a Bearer token in the
/// `Authorization` header.
///
/// Validity is decided by the token's signature and `exp` claim. A
/// successful extraction also queues a best-effort activity touch for the
/// session row.
///
/// ```ignore
/// async fn my_handler(session: AuthSession) -> AppResult<Json<()>> {
///     tracing::info!(anon_id = %session.anon_id(), "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub claims: SessionClaims,
}

impl AuthSession {
    pub fn anon_id(&self) -> &str {
        &self.claims.aid
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
pub(crate) fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth_header = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("missing bearer token".into())))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.sessions.verify(token)?;
        state.sessions.touch(token);
        Ok(AuthSession { claims })
    }
}
