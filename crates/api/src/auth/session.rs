//! Session issuance, activity tracking, eviction and revocation.
//!
//! Bearer tokens are validated by signature and `exp` alone. Session rows
//! are bookkeeping: they drive the per-identity cap, the activity timestamp
//! and administrative revocation, but a token whose row was removed keeps
//! working until it expires.

use std::sync::Arc;

use chrono::Utc;
use ghostline_core::hashing::sha256_hex;
use ghostline_core::types::Timestamp;
use ghostline_db::models::session::{CreateSession, Session};
use ghostline_db::{SessionStore, StoreError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::auth::jwt::{sign_session_token, validate_token, JwtConfig, SessionClaims};

/// Pending activity updates allowed before new ones are dropped.
pub const TOUCH_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid or expired token")]
    InvalidToken,

    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A freshly issued bearer credential.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub anon_id: String,
    pub region: Option<String>,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
}

#[derive(Debug)]
struct Touch {
    token_hash: String,
    at: Timestamp,
}

/// Issues and tracks session tokens for derived identities.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    jwt: JwtConfig,
    max_per_user: usize,
    touches: mpsc::Sender<Touch>,
}

/// Drains queued activity updates into the session store.
///
/// Returned by [`SessionManager::new`]; spawn [`TouchWorker::run`] once.
pub struct TouchWorker {
    store: Arc<dyn SessionStore>,
    queue: mpsc::Receiver<Touch>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        jwt: JwtConfig,
        max_per_user: usize,
    ) -> (Self, TouchWorker) {
        let (tx, rx) = mpsc::channel(TOUCH_QUEUE_CAPACITY);
        let manager = Self {
            store: Arc::clone(&store),
            jwt,
            max_per_user,
            touches: tx,
        };
        (manager, TouchWorker { store, queue: rx })
    }

    pub fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }

    /// Sign a new token for `anon_id`, record its row, then apply the
    /// per-identity cap.
    pub async fn issue(
        &self,
        anon_id: &str,
        region: Option<&str>,
    ) -> Result<IssuedSession, SessionError> {
        let issued_at = Utc::now();
        let expires_at = issued_at + self.jwt.ttl();
        let token = sign_session_token(
            anon_id,
            region,
            issued_at.timestamp(),
            expires_at.timestamp(),
            &self.jwt,
        )?;

        self.store
            .create_session(&CreateSession {
                anon_id: anon_id.to_string(),
                token_hash: sha256_hex(token.as_bytes()),
                region: region.map(str::to_string),
                issued_at,
                expires_at,
            })
            .await?;

        if self.max_per_user > 0 {
            self.enforce_limit(anon_id, self.max_per_user).await;
        }

        Ok(IssuedSession {
            token,
            anon_id: anon_id.to_string(),
            region: region.map(str::to_string),
            issued_at,
            expires_at,
        })
    }

    /// Issue a successor token for an authenticated caller. The presented
    /// token stays valid until its own expiry.
    pub async fn refresh(&self, claims: &SessionClaims) -> Result<IssuedSession, SessionError> {
        self.issue(&claims.aid, claims.region.as_deref()).await
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        validate_token(token, &self.jwt).map_err(|_| SessionError::InvalidToken)
    }

    /// Queue an activity update without waiting. Dropped if the queue is full.
    pub fn touch(&self, token: &str) {
        let touch = Touch {
            token_hash: sha256_hex(token.as_bytes()),
            at: Utc::now(),
        };
        if let Err(e) = self.touches.try_send(touch) {
            match e {
                mpsc::error::TrySendError::Full(_) => {
                    tracing::debug!("Session touch queue full, dropping update");
                }
                mpsc::error::TrySendError::Closed(_) => {
                    tracing::debug!("Session touch worker stopped, dropping update");
                }
            }
        }
    }

    /// Evict least recently active sessions beyond `max`. Failures are
    /// logged and reported as zero evictions.
    pub async fn enforce_limit(&self, anon_id: &str, max: usize) -> u64 {
        match self.store.enforce_session_limit(anon_id, max).await {
            Ok(evicted) => {
                if evicted > 0 {
                    tracing::info!(anon_id, evicted, max, "Evicted sessions over the limit");
                }
                evicted
            }
            Err(e) => {
                tracing::warn!(anon_id, error = %e, "Session limit enforcement failed");
                0
            }
        }
    }

    pub async fn revoke(&self, token: &str) -> Result<u64, SessionError> {
        Ok(self
            .store
            .revoke_session(&sha256_hex(token.as_bytes()))
            .await?)
    }

    pub async fn revoke_all(&self, anon_id: &str) -> Result<u64, SessionError> {
        Ok(self.store.revoke_all_sessions(anon_id).await?)
    }

    /// Recorded sessions of `anon_id`, most recently active first.
    pub async fn list(&self, anon_id: &str) -> Result<Vec<Session>, SessionError> {
        Ok(self.store.sessions_for(anon_id).await?)
    }

    pub async fn cleanup_expired(&self) -> Result<u64, SessionError> {
        Ok(self.store.cleanup_expired_sessions(Utc::now()).await?)
    }
}

impl TouchWorker {
    /// Apply queued touches until `cancel` fires or every sender is gone.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::debug!("Session touch worker started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                next = self.queue.recv() => {
                    let Some(touch) = next else { break };
                    if let Err(e) = self.store.touch_session(&touch.token_hash, touch.at).await {
                        tracing::debug!(error = %e, "Session touch failed");
                    }
                }
            }
        }
        tracing::debug!("Session touch worker stopped");
    }
}
