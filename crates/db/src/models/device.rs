//! Device registry model.

use ghostline_core::types::{AnonId, Timestamp};
use sqlx::FromRow;

/// A registered device from the `devices` table.
///
/// Holds the secret verifier -- NEVER serialize this to API responses.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Device {
    pub device_public_id: String,
    /// Base64 HMAC key registered on first contact.
    pub device_secret_hash: String,
    pub anon_id: AnonId,
    /// Display name, unique across all devices.
    pub username: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Result of attempting to register a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateDeviceOutcome {
    Created,
    /// Another device already holds this display name.
    UsernameTaken,
    /// A concurrent registration for the same device identifier won.
    DeviceExists,
}
