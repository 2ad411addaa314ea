//! Route definitions for the `/session` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::session;
use crate::state::AppState;

/// Routes mounted at `/session`.
///
/// ```text
/// POST /challenge  -> challenge
/// POST /bootstrap  -> bootstrap
/// POST /refresh    -> refresh (requires auth)
/// GET  /me         -> me (requires auth)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/challenge", post(session::challenge))
        .route("/bootstrap", post(session::bootstrap))
        .route("/refresh", post(session::refresh))
        .route("/me", get(session::me))
}
