//! Device challenge nonces and proof-of-possession checks.
//!
//! A device proves it holds its secret by returning
//! `base64(HMAC-SHA256(verifier, "<device>|<nonce>|<ts>"))`. The verifier is
//! the base64 value the device registered on first contact; the server only
//! ever sees the verifier, never the raw device secret.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Random bytes behind every challenge nonce.
pub const NONCE_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProofError {
    #[error("secret verifier is not valid base64")]
    MalformedVerifier,
    #[error("proof is not valid base64")]
    MalformedProof,
}

/// Generate a fresh challenge nonce (standard base64 of [`NONCE_BYTES`]).
pub fn new_nonce() -> String {
    let mut buf = [0u8; NONCE_BYTES];
    rand::rng().fill_bytes(&mut buf);
    STANDARD.encode(buf)
}

/// The exact message a device signs: `device|nonce|timestamp`.
pub fn proof_message(device_public_id: &str, nonce: &str, ts: i64) -> String {
    format!("{device_public_id}|{nonce}|{ts}")
}

/// Decode a stored or submitted secret verifier into HMAC key bytes.
pub fn decode_verifier(verifier: &str) -> Result<Vec<u8>, ProofError> {
    STANDARD
        .decode(verifier)
        .map_err(|_| ProofError::MalformedVerifier)
}

/// Compute the base64 proof for `message` under `key`.
pub fn compute_proof(key: &[u8], message: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(message.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Check a submitted base64 proof against the expected MAC.
///
/// Comparison goes through [`Mac::verify_slice`], which is constant time.
pub fn verify_proof(key: &[u8], message: &str, proof: &str) -> Result<bool, ProofError> {
    let submitted = STANDARD
        .decode(proof)
        .map_err(|_| ProofError::MalformedProof)?;
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(message.as_bytes());
    Ok(mac.verify_slice(&submitted).is_ok())
}
