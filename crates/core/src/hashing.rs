//! Plain digests used for storing bearer tokens at rest, and a constant-time
//! comparison for shared secrets presented by operators.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

/// Compute the lowercase hex SHA-256 digest of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Compare a presented secret against the configured one in constant time.
///
/// Both sides are MACed under a fixed key first so that the comparison does
/// not leak the expected length either.
pub fn secrets_match(presented: &str, expected: &str) -> bool {
    const KEY: &[u8] = b"ghostline-secret-compare";
    let tag = |value: &str| {
        let mut mac = Hmac::<Sha256>::new_from_slice(KEY).expect("HMAC accepts any key length");
        mac.update(value.as_bytes());
        mac
    };
    let expected_tag = tag(expected).finalize().into_bytes();
    tag(presented).verify_slice(&expected_tag).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_and_hex() {
        let a = sha256_hex(b"token");
        assert_eq!(a, sha256_hex(b"token"));
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn empty_input_matches_known_vector() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn secrets_match_only_on_equality() {
        assert!(secrets_match("admin-token", "admin-token"));
        assert!(!secrets_match("admin-token", "admin-tokem"));
        assert!(!secrets_match("", "admin-token"));
        assert!(!secrets_match("admin-token-longer", "admin-token"));
    }
}
