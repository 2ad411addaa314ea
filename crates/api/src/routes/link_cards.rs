use axum::routing::{get, post};
use axum::Router;

use crate::handlers::link_card;
use crate::state::AppState;

/// Routes mounted at `/link-cards`. All require auth.
///
/// ```text
/// POST /                -> create
/// POST /create          -> create (older clients)
/// GET  /mine            -> mine
/// POST /{code}/revoke   -> revoke
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(link_card::create))
        .route("/create", post(link_card::create))
        .route("/mine", get(link_card::mine))
        .route("/{code}/revoke", post(link_card::revoke))
}
