//! Session metadata model.
//!
//! Rows exist for auditing and for the per-identity session cap. They are
//! not consulted when authenticating a request: a bearer token is valid while
//! its signature and `exp` claim check out.

use ghostline_core::types::{AnonId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `sessions` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Session {
    pub id: String,
    pub anon_id: AnonId,
    /// SHA-256 hex of the bearer token; the token itself is never stored.
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub region: Option<String>,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
    pub last_activity_at: Option<Timestamp>,
}

impl Session {
    /// Last activity, falling back to issue time for never-touched sessions.
    pub fn activity_at(&self) -> Timestamp {
        self.last_activity_at.unwrap_or(self.issued_at)
    }
}

/// DTO for recording a newly issued session.
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub anon_id: AnonId,
    pub token_hash: String,
    pub region: Option<String>,
    pub issued_at: Timestamp,
    pub expires_at: Timestamp,
}

/// Pick the sessions to drop so that at most `max` remain, keeping the most
/// recently active ones. Returns token hashes.
pub fn sessions_to_evict(sessions: &[Session], max: usize) -> Vec<String> {
    if sessions.len() <= max {
        return Vec::new();
    }
    let mut ordered: Vec<&Session> = sessions.iter().collect();
    // Newest activity first; ties broken by issue time, then id for determinism.
    ordered.sort_by(|a, b| {
        b.activity_at()
            .cmp(&a.activity_at())
            .then_with(|| b.issued_at.cmp(&a.issued_at))
            .then_with(|| a.id.cmp(&b.id))
    });
    ordered[max..]
        .iter()
        .map(|s| s.token_hash.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn session(id: &str, issued_mins_ago: i64, active_mins_ago: Option<i64>) -> Session {
        let now = Utc::now();
        Session {
            id: id.to_string(),
            anon_id: "anon".to_string(),
            token_hash: format!("hash-{id}"),
            region: None,
            issued_at: now - Duration::minutes(issued_mins_ago),
            expires_at: now + Duration::minutes(30),
            last_activity_at: active_mins_ago.map(|m| now - Duration::minutes(m)),
        }
    }

    #[test]
    fn nothing_to_evict_under_the_cap() {
        let s = vec![session("a", 5, None), session("b", 4, None)];
        assert!(sessions_to_evict(&s, 2).is_empty());
        assert!(sessions_to_evict(&s, 3).is_empty());
    }

    #[test]
    fn evicts_least_recently_active() {
        let s = vec![
            session("old-but-active", 50, Some(1)),
            session("fresh-idle", 2, None),
            session("stale", 40, Some(30)),
            session("never-used", 45, None),
        ];
        let evicted = sessions_to_evict(&s, 2);
        assert_eq!(evicted.len(), 2);
        assert!(evicted.contains(&"hash-stale".to_string()));
        assert!(evicted.contains(&"hash-never-used".to_string()));
    }

    #[test]
    fn activity_falls_back_to_issue_time() {
        let s = session("x", 10, None);
        assert_eq!(s.activity_at(), s.issued_at);
    }
}
