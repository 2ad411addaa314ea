//! Single-use tickets that authorize one upcoming chat connection.
//!
//! Browsers cannot set an `Authorization` header on a WebSocket handshake, so
//! an authenticated caller first trades its bearer token for a ticket naming
//! the peer, then presents the ticket in the upgrade URL.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use ghostline_core::codes::new_ticket_token;
use ghostline_core::types::{AnonId, Timestamp};
use tokio::sync::Mutex;

use crate::trust::{TrustError, TrustService};

/// Ticket lifetime.
pub const TICKET_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("peer required")]
    PeerRequired,

    #[error("peer cannot be self")]
    SelfPeer,

    #[error("not trusted")]
    NotTrusted,

    #[error("missing ticket")]
    MissingTicket,

    #[error("invalid or expired ticket")]
    InvalidTicket,

    #[error("bad ticket")]
    BadTicket,

    #[error(transparent)]
    Trust(#[from] TrustError),
}

#[derive(Debug, Clone)]
struct Ticket {
    me: AnonId,
    peer: AnonId,
    expires_at: Timestamp,
    used: bool,
}

impl Ticket {
    fn is_live(&self, now: Timestamp) -> bool {
        !self.used && now < self.expires_at
    }
}

/// A ticket handed to the client.
#[derive(Debug, Clone)]
pub struct IssuedTicket {
    pub token: String,
    pub expires_in_secs: u64,
}

/// The two identities bound by a consumed ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketPair {
    /// The identity that requested the ticket and will own the connection.
    pub me: AnonId,
    pub peer: AnonId,
}

/// In-memory ticket registry. Tickets never outlive the process.
pub struct TicketStore {
    ttl: Duration,
    tickets: Mutex<HashMap<String, Ticket>>,
}

impl TicketStore {
    pub fn new() -> Self {
        Self::with_ttl(TICKET_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            tickets: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a ticket for `me` to talk to `peer`, provided they trust each
    /// other right now.
    pub async fn issue(
        &self,
        trust: &TrustService,
        me: &str,
        peer: &str,
    ) -> Result<IssuedTicket, TicketError> {
        let peer = peer.trim();
        if peer.is_empty() {
            return Err(TicketError::PeerRequired);
        }
        if peer == me {
            return Err(TicketError::SelfPeer);
        }
        if !trust.is_accepted(me, peer).await? {
            return Err(TicketError::NotTrusted);
        }
        Ok(self.create(me, peer).await)
    }

    /// Store a ticket without any authorization check.
    pub async fn create(&self, me: &str, peer: &str) -> IssuedTicket {
        let token = new_ticket_token();
        let ticket = Ticket {
            me: me.to_string(),
            peer: peer.to_string(),
            expires_at: Utc::now() + chrono::Duration::milliseconds(self.ttl.as_millis() as i64),
            used: false,
        };
        self.tickets.lock().await.insert(token.clone(), ticket);
        IssuedTicket {
            token,
            expires_in_secs: self.ttl.as_secs(),
        }
    }

    /// Mark the ticket used and return its identities, exactly once.
    pub async fn consume(&self, token: &str) -> Result<TicketPair, TicketError> {
        let now = Utc::now();
        let mut tickets = self.tickets.lock().await;
        let ticket = tickets
            .get_mut(token)
            .filter(|t| t.is_live(now))
            .ok_or(TicketError::InvalidTicket)?;
        ticket.used = true;
        if ticket.me.is_empty() || ticket.peer.is_empty() {
            return Err(TicketError::BadTicket);
        }
        Ok(TicketPair {
            me: ticket.me.clone(),
            peer: ticket.peer.clone(),
        })
    }

    /// Drop used and expired tickets. Returns the number removed.
    pub async fn sweep(&self) -> usize {
        let now = Utc::now();
        let mut tickets = self.tickets.lock().await;
        let before = tickets.len();
        tickets.retain(|_, t| t.is_live(now));
        before - tickets.len()
    }

    /// Tickets currently tracked, spent or not.
    pub async fn count(&self) -> usize {
        self.tickets.lock().await.len()
    }
}

impl Default for TicketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use ghostline_db::MemStore;

    use super::*;

    async fn trusted_pair() -> TrustService {
        let trust = TrustService::new(Arc::new(MemStore::new()));
        let card = trust.create_card("alice", None).await.unwrap();
        let req = trust.request("bob", &card.code).await.unwrap();
        trust.respond("alice", &req.id, "accepted").await.unwrap();
        trust
    }

    #[tokio::test]
    async fn ticket_is_single_use() {
        let store = TicketStore::new();
        let issued = store.create("alice", "bob").await;
        assert!(issued.token.starts_with("wst_"));
        assert_eq!(issued.expires_in_secs, 30);

        let pair = store.consume(&issued.token).await.unwrap();
        assert_eq!(pair.me, "alice");
        assert_eq!(pair.peer, "bob");
        assert_matches!(store.consume(&issued.token).await, Err(TicketError::InvalidTicket));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_consumers_only_one_wins() {
        let store = Arc::new(TicketStore::new());
        let issued = store.create("alice", "bob").await;

        let attempts = (0..16).map(|_| {
            let store = Arc::clone(&store);
            let token = issued.token.clone();
            tokio::spawn(async move { store.consume(&token).await })
        });
        let results = futures::future::join_all(attempts).await;

        let winners = results
            .into_iter()
            .map(|joined| joined.unwrap())
            .filter(Result::is_ok)
            .count();
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn unknown_ticket_is_invalid() {
        let store = TicketStore::new();
        assert_matches!(store.consume("wst_nope").await, Err(TicketError::InvalidTicket));
    }

    #[tokio::test]
    async fn expired_ticket_is_invalid() {
        let store = TicketStore::with_ttl(Duration::from_millis(10));
        let issued = store.create("alice", "bob").await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_matches!(store.consume(&issued.token).await, Err(TicketError::InvalidTicket));
    }

    #[tokio::test]
    async fn empty_identity_is_a_bad_ticket() {
        let store = TicketStore::new();
        let issued = store.create("alice", "").await;
        assert_matches!(store.consume(&issued.token).await, Err(TicketError::BadTicket));
    }

    #[tokio::test]
    async fn sweep_drops_spent_tickets() {
        let store = TicketStore::new();
        let used = store.create("alice", "bob").await;
        store.create("alice", "bob").await;
        store.consume(&used.token).await.unwrap();

        assert_eq!(store.sweep().await, 1);
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn issue_requires_accepted_trust() {
        let trust = trusted_pair().await;
        let store = TicketStore::new();

        assert!(store.issue(&trust, "alice", "bob").await.is_ok());
        assert!(store.issue(&trust, "bob", "alice").await.is_ok());
        assert_matches!(
            store.issue(&trust, "alice", "carol").await,
            Err(TicketError::NotTrusted)
        );
        assert_matches!(
            store.issue(&trust, "alice", "alice").await,
            Err(TicketError::SelfPeer)
        );
        assert_matches!(
            store.issue(&trust, "alice", " ").await,
            Err(TicketError::PeerRequired)
        );
    }
}
