//! Ghostline API server library.
//!
//! Exposes the building blocks (config, state, protocol services, error
//! handling, routes, WebSocket delivery) so integration tests and the binary
//! entrypoint share them.

pub mod auth;
pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod state;
pub mod trust;
pub mod ws;
