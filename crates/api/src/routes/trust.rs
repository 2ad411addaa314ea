use axum::routing::{get, post};
use axum::Router;

use crate::handlers::trust;
use crate::state::AppState;

/// Routes mounted at `/trust`. All require auth.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/request", post(trust::request))
        .route("/respond", post(trust::respond))
        .route("/status", get(trust::status))
}
