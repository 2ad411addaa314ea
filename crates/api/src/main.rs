use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ghostline_api::background::{session_cleanup, ticket_sweep};
use ghostline_api::config::ServerConfig;
use ghostline_api::router::build_app_router;
use ghostline_api::state::AppState;
use ghostline_api::ws;
use ghostline_db::{PgStore, Stores};

/// Grace period for background tasks once shutdown starts.
const TASK_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ghostline_api=debug,tower_http=debug".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Storage ---
    let stores = match config.database_url.as_deref() {
        Some(database_url) => {
            let pool = ghostline_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            ghostline_db::health_check(&pool)
                .await
                .expect("Database health check failed");

            ghostline_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Stores::from_backend(Arc::new(PgStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            Stores::in_memory()
        }
    };

    // --- App state ---
    let (state, touch_worker) = AppState::new(config.clone(), stores);

    // --- Background tasks ---
    let cancel = CancellationToken::new();
    let touch_handle = tokio::spawn(touch_worker.run(cancel.clone()));
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&state.hub), cancel.clone());
    let cleanup_handle = tokio::spawn(session_cleanup::run(
        Arc::clone(&state.sessions),
        Arc::clone(&state.stores.nonces),
        Duration::from_secs(config.sessions.cleanup_interval_secs),
        cancel.clone(),
    ));
    let sweep_handle = tokio::spawn(ticket_sweep::run(
        Arc::clone(&state.tickets),
        ticket_sweep::SWEEP_INTERVAL,
        cancel.clone(),
    ));
    tracing::info!("Background tasks started");

    let hub = Arc::clone(&state.hub);
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    let shutdown_cancel = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_cancel.cancel();
            // Chat sockets are long-lived; close them so the server can drain.
            let ws_count = hub.connection_count().await;
            tracing::info!(ws_count, "Closing remaining WebSocket connections");
            hub.shutdown_all().await;
        })
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    cancel.cancel();

    for (name, handle) in [
        ("touch worker", touch_handle),
        ("heartbeat", heartbeat_handle),
        ("session cleanup", cleanup_handle),
        ("ticket sweeper", sweep_handle),
    ] {
        if tokio::time::timeout(TASK_SHUTDOWN_TIMEOUT, handle).await.is_err() {
            tracing::warn!(task = name, "Background task did not stop in time");
        }
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
