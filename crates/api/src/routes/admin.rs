//! Route definitions for `/admin`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`. Every handler checks `ADMIN_TOKEN`.
///
/// ```text
/// GET  /sessions/{anon_id}     -> list_sessions
/// POST /sessions/revoke        -> revoke
/// POST /sessions/revoke-all    -> revoke_all
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions/revoke", post(admin::revoke))
        .route("/sessions/revoke-all", post(admin::revoke_all))
        .route("/sessions/{anon_id}", get(admin::list_sessions))
}
