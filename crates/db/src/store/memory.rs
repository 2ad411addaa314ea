//! In-memory storage backend.
//!
//! Every store has its own lock so that unrelated operations never contend,
//! and no method holds one lock while acquiring another. Check-and-act
//! operations (nonce consumption, card redemption, trust resolution, session
//! eviction) run entirely under a single write lock.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use ghostline_core::trust::{
    check_redeemable, check_resolvable, links_pair, CardStatus, Decision, TrustStatus,
};
use ghostline_core::types::Timestamp;
use tokio::sync::{Mutex, RwLock};

use super::{DeviceStore, NonceStore, SessionStore, StoreHealth, TrustStore};
use crate::error::{StoreError, StoreResult};
use crate::models::device::{CreateDeviceOutcome, Device};
use crate::models::link_card::{LinkCard, RevokeCardOutcome};
use crate::models::nonce::DeviceNonce;
use crate::models::session::{sessions_to_evict, CreateSession, Session};
use crate::models::trust_request::{RedeemOutcome, ResolveOutcome, TrustRequest};

#[derive(Default)]
struct DeviceTables {
    by_device: HashMap<String, Device>,
    usernames: HashSet<String>,
}

#[derive(Default)]
struct TrustTables {
    cards: HashMap<String, LinkCard>,
    requests: HashMap<String, TrustRequest>,
}

/// Process-local backend; all data is lost on restart.
#[derive(Default)]
pub struct MemStore {
    devices: RwLock<DeviceTables>,
    nonces: Mutex<HashMap<(String, String), DeviceNonce>>,
    sessions: RwLock<HashMap<String, Session>>,
    trust: RwLock<TrustTables>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceStore for MemStore {
    async fn get_device(&self, device_public_id: &str) -> StoreResult<Option<Device>> {
        Ok(self
            .devices
            .read()
            .await
            .by_device
            .get(device_public_id)
            .cloned())
    }

    async fn get_device_by_anon_id(&self, anon_id: &str) -> StoreResult<Option<Device>> {
        Ok(self
            .devices
            .read()
            .await
            .by_device
            .values()
            .find(|d| d.anon_id == anon_id)
            .cloned())
    }

    async fn create_device(&self, device: &Device) -> StoreResult<CreateDeviceOutcome> {
        let mut tables = self.devices.write().await;
        if tables.by_device.contains_key(&device.device_public_id) {
            return Ok(CreateDeviceOutcome::DeviceExists);
        }
        if !tables.usernames.insert(device.username.clone()) {
            return Ok(CreateDeviceOutcome::UsernameTaken);
        }
        tables
            .by_device
            .insert(device.device_public_id.clone(), device.clone());
        Ok(CreateDeviceOutcome::Created)
    }

    async fn touch_device(&self, device_public_id: &str, at: Timestamp) -> StoreResult<bool> {
        let mut tables = self.devices.write().await;
        match tables.by_device.get_mut(device_public_id) {
            Some(device) => {
                device.updated_at = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl NonceStore for MemStore {
    async fn create_nonce(
        &self,
        device_public_id: &str,
        nonce: &str,
        expires_at: Timestamp,
        now: Timestamp,
    ) -> StoreResult<()> {
        let key = (device_public_id.to_string(), nonce.to_string());
        let mut nonces = self.nonces.lock().await;
        if nonces.contains_key(&key) {
            return Err(StoreError::Conflict("nonce already issued".into()));
        }
        nonces.insert(
            key,
            DeviceNonce {
                device_public_id: device_public_id.to_string(),
                nonce: nonce.to_string(),
                expires_at,
                used_at: None,
                created_at: now,
            },
        );
        Ok(())
    }

    async fn consume_nonce(
        &self,
        device_public_id: &str,
        nonce: &str,
        now: Timestamp,
    ) -> StoreResult<bool> {
        let key = (device_public_id.to_string(), nonce.to_string());
        let mut nonces = self.nonces.lock().await;
        match nonces.get_mut(&key) {
            Some(entry) if entry.is_consumable(now) => {
                entry.used_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn purge_nonces(&self, now: Timestamp) -> StoreResult<u64> {
        let mut nonces = self.nonces.lock().await;
        let before = nonces.len();
        nonces.retain(|_, n| n.is_consumable(now));
        Ok((before - nonces.len()) as u64)
    }
}

#[async_trait]
impl SessionStore for MemStore {
    async fn create_session(&self, input: &CreateSession) -> StoreResult<Session> {
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            anon_id: input.anon_id.clone(),
            token_hash: input.token_hash.clone(),
            region: input.region.clone(),
            issued_at: input.issued_at,
            expires_at: input.expires_at,
            last_activity_at: Some(input.issued_at),
        };
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.token_hash) {
            return Err(StoreError::Conflict("session token already recorded".into()));
        }
        sessions.insert(session.token_hash.clone(), session.clone());
        Ok(session)
    }

    async fn touch_session(&self, token_hash: &str, at: Timestamp) -> StoreResult<bool> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(token_hash) {
            Some(s) => {
                s.last_activity_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_session(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        Ok(self.sessions.read().await.get(token_hash).cloned())
    }

    async fn sessions_for(&self, anon_id: &str) -> StoreResult<Vec<Session>> {
        let mut out: Vec<Session> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.anon_id == anon_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.activity_at().cmp(&a.activity_at()));
        Ok(out)
    }

    async fn revoke_session(&self, token_hash: &str) -> StoreResult<u64> {
        Ok(u64::from(self.sessions.write().await.remove(token_hash).is_some()))
    }

    async fn revoke_all_sessions(&self, anon_id: &str) -> StoreResult<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.anon_id != anon_id);
        Ok((before - sessions.len()) as u64)
    }

    async fn enforce_session_limit(&self, anon_id: &str, max: usize) -> StoreResult<u64> {
        let mut sessions = self.sessions.write().await;
        let owned: Vec<Session> = sessions
            .values()
            .filter(|s| s.anon_id == anon_id)
            .cloned()
            .collect();
        let evict = sessions_to_evict(&owned, max);
        for hash in &evict {
            sessions.remove(hash);
        }
        Ok(evict.len() as u64)
    }

    async fn cleanup_expired_sessions(&self, now: Timestamp) -> StoreResult<u64> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        Ok((before - sessions.len()) as u64)
    }
}

#[async_trait]
impl TrustStore for MemStore {
    async fn create_card(&self, card: &LinkCard) -> StoreResult<()> {
        let mut tables = self.trust.write().await;
        if tables.cards.contains_key(&card.code) {
            return Err(StoreError::Conflict(format!("link card code {}", card.code)));
        }
        tables.cards.insert(card.code.clone(), card.clone());
        Ok(())
    }

    async fn get_card(&self, code: &str) -> StoreResult<Option<LinkCard>> {
        Ok(self.trust.read().await.cards.get(code).cloned())
    }

    async fn cards_by_owner(&self, owner: &str) -> StoreResult<Vec<LinkCard>> {
        let mut out: Vec<LinkCard> = self
            .trust
            .read()
            .await
            .cards
            .values()
            .filter(|c| c.owner_anon == owner)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn revoke_card(
        &self,
        code: &str,
        owner: &str,
        now: Timestamp,
    ) -> StoreResult<RevokeCardOutcome> {
        let mut tables = self.trust.write().await;
        let Some(card) = tables.cards.get_mut(code).filter(|c| c.owner_anon == owner) else {
            return Ok(RevokeCardOutcome::NotFound);
        };
        if card.status_at(now) != CardStatus::Active {
            return Ok(RevokeCardOutcome::NotActive);
        }
        card.status = CardStatus::Revoked;
        Ok(RevokeCardOutcome::Revoked)
    }

    async fn redeem_card(
        &self,
        code: &str,
        redeemer: &str,
        request_id: &str,
        now: Timestamp,
    ) -> StoreResult<RedeemOutcome> {
        let mut tables = self.trust.write().await;
        let Some(card) = tables.cards.get_mut(code) else {
            return Ok(RedeemOutcome::NotFound);
        };
        if let Err(rejection) =
            check_redeemable(card.status, card.expires_at, &card.owner_anon, redeemer, now)
        {
            return Ok(RedeemOutcome::Rejected(rejection));
        }

        card.status = CardStatus::Used;
        card.used_by = Some(redeemer.to_string());
        let request = TrustRequest {
            id: request_id.to_string(),
            code: code.to_string(),
            from_anon: redeemer.to_string(),
            to_anon: card.owner_anon.clone(),
            status: TrustStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tables
            .requests
            .insert(request.id.clone(), request.clone());
        Ok(RedeemOutcome::Redeemed(request))
    }

    async fn get_trust_request(&self, id: &str) -> StoreResult<Option<TrustRequest>> {
        Ok(self.trust.read().await.requests.get(id).cloned())
    }

    async fn resolve_trust_request(
        &self,
        id: &str,
        actor: &str,
        decision: Decision,
        now: Timestamp,
    ) -> StoreResult<ResolveOutcome> {
        let mut tables = self.trust.write().await;
        let Some(request) = tables.requests.get_mut(id) else {
            return Ok(ResolveOutcome::NotFound);
        };
        if let Err(rejection) = check_resolvable(request.status, &request.to_anon, actor) {
            return Ok(ResolveOutcome::Rejected(rejection));
        }
        request.status = decision.into_status();
        request.updated_at = now;
        Ok(ResolveOutcome::Resolved(request.clone()))
    }

    async fn trust_for(&self, anon_id: &str) -> StoreResult<Vec<TrustRequest>> {
        let mut out: Vec<TrustRequest> = self
            .trust
            .read()
            .await
            .requests
            .values()
            .filter(|t| t.from_anon == anon_id || t.to_anon == anon_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn trust_accepted(&self, a: &str, b: &str) -> StoreResult<bool> {
        Ok(self
            .trust
            .read()
            .await
            .requests
            .values()
            .any(|t| links_pair(&t.from_anon, &t.to_anon, t.status, a, b)))
    }
}

#[async_trait]
impl StoreHealth for MemStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
