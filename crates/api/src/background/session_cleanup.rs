//! Periodic purge of expired session rows and spent challenge nonces.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ghostline_db::NonceStore;
use tokio_util::sync::CancellationToken;

use crate::auth::session::SessionManager;

/// Rows removed by one cleanup pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub sessions: u64,
    pub nonces: u64,
}

/// Run a single cleanup pass. Failures are logged and counted as zero.
pub async fn cleanup_once(sessions: &SessionManager, nonces: &dyn NonceStore) -> CleanupReport {
    let mut report = CleanupReport::default();

    match sessions.cleanup_expired().await {
        Ok(n) => report.sessions = n,
        Err(e) => tracing::error!(error = %e, "Session cleanup failed"),
    }
    match nonces.purge_nonces(Utc::now()).await {
        Ok(n) => report.nonces = n,
        Err(e) => tracing::error!(error = %e, "Nonce purge failed"),
    }

    if report.sessions > 0 || report.nonces > 0 {
        tracing::info!(
            sessions = report.sessions,
            nonces = report.nonces,
            "Purged expired session state"
        );
    } else {
        tracing::debug!("Session cleanup: nothing to purge");
    }
    report
}

/// Run the cleanup loop every `every` until `cancel` is triggered.
pub async fn run(
    sessions: Arc<SessionManager>,
    nonces: Arc<dyn NonceStore>,
    every: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(interval_secs = every.as_secs(), "Session cleanup job started");

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session cleanup job stopping");
                break;
            }
            _ = interval.tick() => {
                cleanup_once(&sessions, nonces.as_ref()).await;
            }
        }
    }
}
