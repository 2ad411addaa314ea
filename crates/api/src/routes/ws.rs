use axum::routing::{get, post};
use axum::Router;

use crate::handlers::ws_ticket;
use crate::state::AppState;
use crate::ws;

/// Routes mounted at `/ws`.
///
/// ```text
/// POST /ticket          -> issue a chat ticket (requires auth)
/// GET  /chat?ticket=    -> WebSocket upgrade (ticket only)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ticket", post(ws_ticket::create))
        .route("/chat", get(ws::chat_handler))
}
