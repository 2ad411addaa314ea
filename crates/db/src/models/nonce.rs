//! Device challenge nonce model.

use ghostline_core::types::Timestamp;
use sqlx::FromRow;

/// A row from the `device_nonces` table, keyed by `(device_public_id, nonce)`.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceNonce {
    pub device_public_id: String,
    pub nonce: String,
    pub expires_at: Timestamp,
    pub used_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl DeviceNonce {
    /// Unused and not yet expired.
    pub fn is_consumable(&self, now: Timestamp) -> bool {
        self.used_at.is_none() && now < self.expires_at
    }
}
