//! Random identifiers handed out to clients: invite codes, display names,
//! real-time tickets and trust request ids.

use rand::Rng;
use uuid::Uuid;

/// RFC 4648 base32 alphabet (uppercase, no padding).
const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Length of a link-card invite code (60 bits of entropy).
pub const INVITE_CODE_LEN: usize = 12;

/// Prefix of every generated display name.
pub const USERNAME_PREFIX: &str = "ghost_";

/// Inclusive numeric range of the display-name suffix (always five digits).
pub const USERNAME_SUFFIX_MIN: u32 = 10_000;
pub const USERNAME_SUFFIX_MAX: u32 = 99_999;

/// Prefix that marks a real-time connection ticket.
pub const TICKET_PREFIX: &str = "wst_";

/// Generate a short uppercase base32 invite code.
pub fn new_invite_code() -> String {
    let mut rng = rand::rng();
    (0..INVITE_CODE_LEN)
        .map(|_| BASE32_ALPHABET[rng.random_range(0..BASE32_ALPHABET.len())] as char)
        .collect()
}

/// Produce one display-name candidate, e.g. `ghost_48213`.
///
/// Uniqueness is the caller's problem: candidates are retried against the
/// device registry until one is accepted.
pub fn username_candidate() -> String {
    let n = rand::rng().random_range(USERNAME_SUFFIX_MIN..=USERNAME_SUFFIX_MAX);
    format!("{USERNAME_PREFIX}{n:05}")
}

/// Generate a single-use real-time ticket token (`wst_` + 32 hex chars).
pub fn new_ticket_token() -> String {
    let mut buf = [0u8; 16];
    rand::rng().fill(&mut buf);
    format!("{TICKET_PREFIX}{}", hex::encode(buf))
}

/// Generate a trust request id.
pub fn new_trust_request_id() -> String {
    format!("tr_{}", Uuid::new_v4().simple())
}
