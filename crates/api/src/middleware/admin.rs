//! Operator access to administrative routes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use ghostline_core::error::CoreError;
use ghostline_core::hashing::secrets_match;

use super::auth::bearer_token;
use crate::error::AppError;
use crate::state::AppState;

/// Requires `Authorization: Bearer <ADMIN_TOKEN>`. Rejects with 403
/// Forbidden on a mismatch, and always when no admin token is configured.
///
/// ```ignore
/// async fn admin_only(_admin: RequireAdmin) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let forbidden = || AppError::Core(CoreError::Forbidden("forbidden".into()));

        let Some(expected) = state.config.admin_token.as_deref() else {
            return Err(forbidden());
        };
        let presented = bearer_token(parts).map_err(|_| forbidden())?;
        if !secrets_match(presented, expected) {
            tracing::warn!("Rejected admin request with wrong token");
            return Err(forbidden());
        }
        Ok(RequireAdmin)
    }
}
