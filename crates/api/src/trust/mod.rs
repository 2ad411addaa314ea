//! Link cards and the trust handshake.
//!
//! A card owner hands out a short code; whoever redeems it opens a pending
//! request towards the owner, who accepts or declines exactly once. An
//! accepted request in either direction is what gates real-time chat.

use std::sync::Arc;

use chrono::{Duration, Utc};
use ghostline_core::codes::{new_invite_code, new_trust_request_id};
use ghostline_core::trust::{
    card_ttl_minutes, CardStatus, Decision, RedeemRejection, ResolveRejection,
};
use ghostline_db::models::link_card::{LinkCard, RevokeCardOutcome};
use ghostline_db::models::trust_request::{RedeemOutcome, ResolveOutcome, TrustRequest};
use ghostline_db::{StoreError, TrustStore};

/// Fresh codes tried when a generated one collides with an existing card.
const CODE_ATTEMPTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum TrustError {
    #[error("{0}")]
    Malformed(&'static str),

    #[error("code not found")]
    CodeNotFound,

    #[error("code not active")]
    CodeNotActive,

    #[error("cannot trust yourself")]
    OwnCard,

    #[error("link card not found")]
    CardNotFound,

    #[error("link card not active")]
    CardNotActive,

    #[error("trust request not found")]
    RequestNotFound,

    /// Only the addressee may resolve a request.
    #[error("forbidden")]
    NotRecipient,

    #[error("already resolved")]
    AlreadyResolved,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Trust requests of one identity split by direction.
#[derive(Debug, Clone, Default)]
pub struct TrustOverview {
    /// Addressed to the identity (it may resolve these).
    pub incoming: Vec<TrustRequest>,
    /// Opened by the identity.
    pub outgoing: Vec<TrustRequest>,
}

pub struct TrustService {
    store: Arc<dyn TrustStore>,
}

impl TrustService {
    pub fn new(store: Arc<dyn TrustStore>) -> Self {
        Self { store }
    }

    /// Create an active card for `owner`. Non-positive or missing TTLs fall
    /// back to the default; oversized ones are capped.
    pub async fn create_card(
        &self,
        owner: &str,
        ttl_minutes: Option<i64>,
    ) -> Result<LinkCard, TrustError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(Duration::minutes(card_ttl_minutes(ttl_minutes)))
            .ok_or(TrustError::Malformed("ttl_minutes out of range"))?;

        let mut last_conflict = None;
        for _ in 0..CODE_ATTEMPTS {
            let card = LinkCard {
                code: new_invite_code(),
                owner_anon: owner.to_string(),
                status: CardStatus::Active,
                created_at: now,
                expires_at,
                used_by: None,
            };
            match self.store.create_card(&card).await {
                Ok(()) => {
                    tracing::info!(owner_anon = owner, "Link card created");
                    return Ok(card);
                }
                Err(StoreError::Conflict(msg)) => {
                    tracing::debug!("Invite code collision, regenerating");
                    last_conflict = Some(msg);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(StoreError::Conflict(last_conflict.unwrap_or_default()).into())
    }

    /// Cards owned by `owner`, newest first, as stored.
    pub async fn cards(&self, owner: &str) -> Result<Vec<LinkCard>, TrustError> {
        Ok(self.store.cards_by_owner(owner).await?)
    }

    pub async fn revoke_card(&self, owner: &str, code: &str) -> Result<(), TrustError> {
        let code = code.trim();
        match self.store.revoke_card(code, owner, Utc::now()).await? {
            RevokeCardOutcome::Revoked => {
                tracing::info!(owner_anon = owner, "Link card revoked");
                Ok(())
            }
            RevokeCardOutcome::NotFound => Err(TrustError::CardNotFound),
            RevokeCardOutcome::NotActive => Err(TrustError::CardNotActive),
        }
    }

    /// Redeem `code` on behalf of `redeemer`, opening a pending request to
    /// the card owner.
    pub async fn request(&self, redeemer: &str, code: &str) -> Result<TrustRequest, TrustError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(TrustError::Malformed("code required"));
        }

        let request_id = new_trust_request_id();
        match self
            .store
            .redeem_card(code, redeemer, &request_id, Utc::now())
            .await?
        {
            RedeemOutcome::Redeemed(request) => {
                tracing::info!(
                    request_id = %request.id,
                    from_anon = %request.from_anon,
                    to_anon = %request.to_anon,
                    "Trust request opened"
                );
                Ok(request)
            }
            RedeemOutcome::NotFound => Err(TrustError::CodeNotFound),
            RedeemOutcome::Rejected(RedeemRejection::NotActive) => Err(TrustError::CodeNotActive),
            RedeemOutcome::Rejected(RedeemRejection::OwnCard) => Err(TrustError::OwnCard),
        }
    }

    /// Resolve `request_id` as `actor` with a textual decision
    /// (`accepted` / `declined`).
    pub async fn respond(
        &self,
        actor: &str,
        request_id: &str,
        decision: &str,
    ) -> Result<TrustRequest, TrustError> {
        let request_id = request_id.trim();
        let decision = match Decision::parse(decision) {
            Some(d) if !request_id.is_empty() => d,
            _ => {
                return Err(TrustError::Malformed(
                    "request_id and valid decision required",
                ))
            }
        };

        match self
            .store
            .resolve_trust_request(request_id, actor, decision, Utc::now())
            .await?
        {
            ResolveOutcome::Resolved(request) => {
                tracing::info!(
                    request_id = %request.id,
                    status = %request.status,
                    "Trust request resolved"
                );
                Ok(request)
            }
            ResolveOutcome::NotFound => Err(TrustError::RequestNotFound),
            ResolveOutcome::Rejected(ResolveRejection::NotRecipient) => {
                Err(TrustError::NotRecipient)
            }
            ResolveOutcome::Rejected(ResolveRejection::AlreadyResolved) => {
                Err(TrustError::AlreadyResolved)
            }
        }
    }

    pub async fn status(&self, anon_id: &str) -> Result<TrustOverview, TrustError> {
        let (incoming, outgoing) = self
            .store
            .trust_for(anon_id)
            .await?
            .into_iter()
            .partition(|t| t.to_anon == anon_id);
        Ok(TrustOverview { incoming, outgoing })
    }

    /// Whether `a` and `b` currently trust each other.
    pub async fn is_accepted(&self, a: &str, b: &str) -> Result<bool, TrustError> {
        Ok(self.store.trust_accepted(a, b).await?)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use ghostline_core::trust::{TrustStatus, DEFAULT_CARD_TTL_MINUTES, MAX_CARD_TTL_MINUTES};
    use ghostline_db::MemStore;

    use super::*;

    fn service() -> TrustService {
        TrustService::new(Arc::new(MemStore::new()))
    }

    #[tokio::test]
    async fn card_ttl_defaults() {
        let svc = service();
        for ttl in [None, Some(0), Some(-5)] {
            let card = svc.create_card("owner", ttl).await.unwrap();
            let minutes = (card.expires_at - card.created_at).num_minutes();
            assert_eq!(minutes, DEFAULT_CARD_TTL_MINUTES);
        }
        let card = svc.create_card("owner", Some(10)).await.unwrap();
        assert_eq!((card.expires_at - card.created_at).num_minutes(), 10);
    }

    #[tokio::test]
    async fn oversized_card_ttl_is_capped() {
        let svc = service();
        for ttl in [MAX_CARD_TTL_MINUTES + 1, 1_000_000_000_000, i64::MAX] {
            let card = svc.create_card("owner", Some(ttl)).await.unwrap();
            let minutes = (card.expires_at - card.created_at).num_minutes();
            assert_eq!(minutes, MAX_CARD_TTL_MINUTES);
        }
    }

    #[tokio::test]
    async fn full_handshake() {
        let svc = service();
        let card = svc.create_card("owner", None).await.unwrap();

        let request = svc.request("redeemer", &card.code).await.unwrap();
        assert!(request.id.starts_with("tr_"));
        assert_eq!(request.status, TrustStatus::Pending);
        assert!(!svc.is_accepted("owner", "redeemer").await.unwrap());

        let resolved = svc.respond("owner", &request.id, " Accepted ").await.unwrap();
        assert_eq!(resolved.status, TrustStatus::Accepted);
        assert!(svc.is_accepted("owner", "redeemer").await.unwrap());
        assert!(svc.is_accepted("redeemer", "owner").await.unwrap());

        assert_matches!(
            svc.request("third", &card.code).await,
            Err(TrustError::CodeNotActive)
        );
    }

    #[tokio::test]
    async fn request_errors() {
        let svc = service();
        let card = svc.create_card("owner", None).await.unwrap();

        assert_matches!(svc.request("r", "  ").await, Err(TrustError::Malformed(_)));
        assert_matches!(svc.request("r", "NOPE").await, Err(TrustError::CodeNotFound));
        assert_matches!(svc.request("owner", &card.code).await, Err(TrustError::OwnCard));
    }

    #[tokio::test]
    async fn respond_errors() {
        let svc = service();
        let card = svc.create_card("owner", None).await.unwrap();
        let request = svc.request("redeemer", &card.code).await.unwrap();

        assert_matches!(
            svc.respond("owner", &request.id, "maybe").await,
            Err(TrustError::Malformed(_))
        );
        assert_matches!(
            svc.respond("owner", "", "accepted").await,
            Err(TrustError::Malformed(_))
        );
        assert_matches!(
            svc.respond("owner", "tr_missing", "accepted").await,
            Err(TrustError::RequestNotFound)
        );
        assert_matches!(
            svc.respond("redeemer", &request.id, "accepted").await,
            Err(TrustError::NotRecipient)
        );

        svc.respond("owner", &request.id, "declined").await.unwrap();
        assert_matches!(
            svc.respond("owner", &request.id, "accepted").await,
            Err(TrustError::AlreadyResolved)
        );
        assert!(!svc.is_accepted("owner", "redeemer").await.unwrap());
    }

    #[tokio::test]
    async fn status_partitions_by_direction() {
        let svc = service();
        let mine = svc.create_card("me", None).await.unwrap();
        let theirs = svc.create_card("them", None).await.unwrap();
        svc.request("them", &mine.code).await.unwrap();
        svc.request("me", &theirs.code).await.unwrap();

        let overview = svc.status("me").await.unwrap();
        assert_eq!(overview.incoming.len(), 1);
        assert_eq!(overview.incoming[0].from_anon, "them");
        assert_eq!(overview.outgoing.len(), 1);
        assert_eq!(overview.outgoing[0].to_anon, "them");
    }

    #[tokio::test]
    async fn only_owner_revokes() {
        let svc = service();
        let card = svc.create_card("owner", None).await.unwrap();

        assert_matches!(
            svc.revoke_card("intruder", &card.code).await,
            Err(TrustError::CardNotFound)
        );
        svc.revoke_card("owner", &card.code).await.unwrap();
        assert_matches!(
            svc.revoke_card("owner", &card.code).await,
            Err(TrustError::CardNotActive)
        );
        assert_matches!(
            svc.request("redeemer", &card.code).await,
            Err(TrustError::CodeNotActive)
        );
    }
}
