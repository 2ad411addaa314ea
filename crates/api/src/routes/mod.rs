pub mod admin;
pub mod health;
pub mod link_cards;
pub mod session;
pub mod trust;
pub mod ws;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /session/challenge                      nonce for a device (public)
/// /session/bootstrap                      proof -> session token (public)
/// /session/refresh                        successor token (auth)
/// /session/me                             caller identity (auth)
///
/// /link-cards                             create (auth)
/// /link-cards/mine                        caller's cards (auth)
/// /link-cards/{code}/revoke               revoke own card (auth)
///
/// /trust/request                          redeem a code (auth)
/// /trust/respond                          accept / decline (auth)
/// /trust/status                           incoming + outgoing (auth)
///
/// /ws/ticket                              single-use chat ticket (auth)
/// /ws/chat?ticket=                        WebSocket upgrade
///
/// /admin/sessions/{anon_id}               list sessions (admin)
/// /admin/sessions/revoke                  revoke one token (admin)
/// /admin/sessions/revoke-all              revoke an identity (admin)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/session", session::router())
        .nest("/link-cards", link_cards::router())
        .nest("/trust", trust::router())
        .nest("/ws", ws::router())
        .nest("/admin", admin::router())
}
