//! Pseudonymous identity derivation.
//!
//! An identity is `HMAC-SHA256(server_secret, device_public_id)`, hex encoded.
//! Without the server secret the mapping cannot be inverted or recomputed,
//! so the device identifier never has to be exposed to other users.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::types::AnonId;

type HmacSha256 = Hmac<Sha256>;

/// Derive the stable identity for a device.
///
/// An empty `server_secret` is a configuration error; the config loader
/// refuses to start without one.
pub fn derive_anon_id(device_public_id: &str, server_secret: &str) -> AnonId {
    let mut mac =
        HmacSha256::new_from_slice(server_secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(device_public_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "anon-secret-for-tests";

    #[test]
    fn derivation_is_deterministic() {
        let a = derive_anon_id("dev-1", SECRET);
        let b = derive_anon_id("dev-1", SECRET);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn different_devices_get_different_ids() {
        assert_ne!(derive_anon_id("dev-1", SECRET), derive_anon_id("dev-2", SECRET));
    }

    #[test]
    fn secret_changes_the_mapping() {
        assert_ne!(
            derive_anon_id("dev-1", SECRET),
            derive_anon_id("dev-1", "another-secret")
        );
    }

    #[test]
    fn id_does_not_contain_device_identifier() {
        let id = derive_anon_id("deadbeef", SECRET);
        assert!(!id.contains("deadbeef"));
    }
}
