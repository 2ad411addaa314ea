//! Device challenge/proof protocol.
//!
//! 1. `challenge` hands the device a single-use nonce.
//! 2. `bootstrap` checks the timestamp window, burns the nonce, verifies
//!    `HMAC(verifier, "device|nonce|ts")`, registers the device on first
//!    contact and issues a session.
//!
//! Every rejection happens before the device registry or session store is
//! written.

use std::sync::Arc;

use chrono::{Duration, Utc};
use ghostline_core::codes::username_candidate;
use ghostline_core::identity::derive_anon_id;
use ghostline_core::proof::{decode_verifier, new_nonce, proof_message, verify_proof, ProofError};
use ghostline_core::types::Timestamp;
use ghostline_db::models::device::{CreateDeviceOutcome, Device};
use ghostline_db::{DeviceStore, NonceStore, StoreError};

use crate::auth::session::{IssuedSession, SessionError, SessionManager};

/// Lifetime of a challenge nonce.
pub const NONCE_TTL_SECS: i64 = 60;

/// Maximum distance between the device timestamp and server time.
pub const TIMESTAMP_SKEW_SECS: i64 = 60;

/// Display-name candidates tried before giving up on a registration.
pub const USERNAME_ATTEMPTS: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum DeviceAuthError {
    /// A required field is missing or empty.
    #[error("{0}")]
    Malformed(&'static str),

    #[error("timestamp out of range")]
    StaleTimestamp,

    #[error("invalid or expired nonce")]
    InvalidNonce,

    #[error("device_secret_hash required for new device")]
    MissingVerifier,

    #[error("device secret mismatch")]
    VerifierMismatch,

    #[error("invalid device_secret_hash")]
    MalformedVerifier,

    #[error("invalid proof encoding")]
    MalformedProof,

    #[error("invalid proof")]
    InvalidProof,

    #[error("failed to allocate username")]
    UsernameExhausted,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<ProofError> for DeviceAuthError {
    fn from(e: ProofError) -> Self {
        match e {
            ProofError::MalformedVerifier => Self::MalformedVerifier,
            ProofError::MalformedProof => Self::MalformedProof,
        }
    }
}

/// An issued challenge.
#[derive(Debug, Clone)]
pub struct Challenge {
    pub nonce: String,
    pub expires_in_secs: i64,
    pub expires_at: Timestamp,
}

/// Everything a device submits to prove possession of its secret.
#[derive(Debug, Clone, Default)]
pub struct BootstrapInput {
    pub device_public_id: String,
    pub nonce: String,
    /// Unix seconds on the device clock.
    pub ts: i64,
    /// Base64 HMAC over `device|nonce|ts`.
    pub proof: String,
    /// Base64 verifier; mandatory on first contact.
    pub device_secret_hash: Option<String>,
    pub region: Option<String>,
}

/// A successful bootstrap: the device entry plus its new session.
#[derive(Debug, Clone)]
pub struct Bootstrapped {
    pub session: IssuedSession,
    pub username: String,
    pub created: bool,
}

pub struct DeviceAuthenticator {
    devices: Arc<dyn DeviceStore>,
    nonces: Arc<dyn NonceStore>,
    sessions: Arc<SessionManager>,
    anon_hmac_key: String,
}

impl DeviceAuthenticator {
    pub fn new(
        devices: Arc<dyn DeviceStore>,
        nonces: Arc<dyn NonceStore>,
        sessions: Arc<SessionManager>,
        anon_hmac_key: String,
    ) -> Self {
        Self {
            devices,
            nonces,
            sessions,
            anon_hmac_key,
        }
    }

    /// Issue a nonce for `device_public_id`.
    pub async fn challenge(&self, device_public_id: &str) -> Result<Challenge, DeviceAuthError> {
        let device_public_id = required(device_public_id, "device_public_id required")?;

        let now = Utc::now();
        let expires_at = now + Duration::seconds(NONCE_TTL_SECS);
        let nonce = new_nonce();
        self.nonces
            .create_nonce(device_public_id, &nonce, expires_at, now)
            .await?;

        tracing::debug!(device_public_id, "Issued device challenge");
        Ok(Challenge {
            nonce,
            expires_in_secs: NONCE_TTL_SECS,
            expires_at,
        })
    }

    /// Verify a proof and turn it into a session.
    pub async fn bootstrap(&self, input: &BootstrapInput) -> Result<Bootstrapped, DeviceAuthError> {
        let device_public_id = required(&input.device_public_id, "device_public_id required")?;
        // The nonce is consumed and signed exactly as sent.
        required(&input.nonce, "nonce required")?;
        let nonce = input.nonce.as_str();
        if input.ts == 0 {
            return Err(DeviceAuthError::Malformed("ts required"));
        }
        let proof = required(&input.proof, "proof required")?;

        let now = Utc::now();
        if !within_skew(now.timestamp(), input.ts) {
            return Err(DeviceAuthError::StaleTimestamp);
        }

        if !self.nonces.consume_nonce(device_public_id, nonce, now).await? {
            return Err(DeviceAuthError::InvalidNonce);
        }

        let existing = self.devices.get_device(device_public_id).await?;
        let supplied = input
            .device_secret_hash
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let verifier = match (&existing, supplied) {
            (None, None) => return Err(DeviceAuthError::MissingVerifier),
            (None, Some(v)) => v.to_string(),
            (Some(device), Some(v)) if v != device.device_secret_hash => {
                return Err(DeviceAuthError::VerifierMismatch)
            }
            (Some(device), _) => device.device_secret_hash.clone(),
        };

        let key = decode_verifier(&verifier)?;
        let message = proof_message(device_public_id, nonce, input.ts);
        if !verify_proof(&key, &message, proof)? {
            return Err(DeviceAuthError::InvalidProof);
        }

        let (device, created) = match existing {
            Some(device) => {
                if let Err(e) = self.devices.touch_device(device_public_id, now).await {
                    tracing::warn!(error = %e, "Failed to update device timestamp");
                }
                (device, false)
            }
            None => self.register(device_public_id, &verifier, now).await?,
        };

        let region = input
            .region
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let session = self.sessions.issue(&device.anon_id, region).await?;

        tracing::info!(anon_id = %device.anon_id, created, "Device bootstrapped");
        Ok(Bootstrapped {
            session,
            username: device.username,
            created,
        })
    }

    /// Create the registry entry, retrying display names on collision.
    ///
    /// Losing a registration race to a concurrent bootstrap of the same
    /// device is not an error as long as both used the same verifier.
    async fn register(
        &self,
        device_public_id: &str,
        verifier: &str,
        now: Timestamp,
    ) -> Result<(Device, bool), DeviceAuthError> {
        let anon_id = derive_anon_id(device_public_id, &self.anon_hmac_key);

        for attempt in 1..=USERNAME_ATTEMPTS {
            let device = Device {
                device_public_id: device_public_id.to_string(),
                device_secret_hash: verifier.to_string(),
                anon_id: anon_id.clone(),
                username: username_candidate(),
                created_at: now,
                updated_at: now,
            };
            match self.devices.create_device(&device).await? {
                CreateDeviceOutcome::Created => return Ok((device, true)),
                CreateDeviceOutcome::UsernameTaken => {
                    tracing::debug!(attempt, "Display name taken, retrying");
                }
                CreateDeviceOutcome::DeviceExists => {
                    let winner = self
                        .devices
                        .get_device(device_public_id)
                        .await?
                        .ok_or_else(|| {
                            StoreError::Conflict("device vanished during registration".into())
                        })?;
                    if winner.device_secret_hash != verifier {
                        return Err(DeviceAuthError::VerifierMismatch);
                    }
                    return Ok((winner, false));
                }
            }
        }

        tracing::error!(attempts = USERNAME_ATTEMPTS, "Display name allocation exhausted");
        Err(DeviceAuthError::UsernameExhausted)
    }
}

fn within_skew(server_ts: i64, device_ts: i64) -> bool {
    server_ts
        .checked_sub(device_ts)
        .is_some_and(|d| d.unsigned_abs() <= TIMESTAMP_SKEW_SECS.unsigned_abs())
}

fn required<'a>(value: &'a str, message: &'static str) -> Result<&'a str, DeviceAuthError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(DeviceAuthError::Malformed(message))
    } else {
        Ok(trimmed)
    }
}
