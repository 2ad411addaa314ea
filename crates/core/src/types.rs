/// Pseudonymous identity: 64 lowercase hex characters (HMAC-SHA256 output).
pub type AnonId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
