//! PostgreSQL storage backend, delegating to the repository layer.

use async_trait::async_trait;
use ghostline_core::trust::Decision;
use ghostline_core::types::Timestamp;

use super::{DeviceStore, NonceStore, SessionStore, StoreHealth, TrustStore};
use crate::error::{unique_violation, StoreError, StoreResult};
use crate::models::device::{CreateDeviceOutcome, Device};
use crate::models::link_card::{LinkCard, RevokeCardOutcome};
use crate::models::session::{CreateSession, Session};
use crate::models::trust_request::{RedeemOutcome, ResolveOutcome, TrustRequest};
use crate::repositories::{DeviceRepo, LinkCardRepo, NonceRepo, SessionRepo, TrustRequestRepo};
use crate::DbPool;

/// Durable backend over a shared connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl DeviceStore for PgStore {
    async fn get_device(&self, device_public_id: &str) -> StoreResult<Option<Device>> {
        Ok(DeviceRepo::find_by_device_id(&self.pool, device_public_id).await?)
    }

    async fn get_device_by_anon_id(&self, anon_id: &str) -> StoreResult<Option<Device>> {
        Ok(DeviceRepo::find_by_anon_id(&self.pool, anon_id).await?)
    }

    async fn create_device(&self, device: &Device) -> StoreResult<CreateDeviceOutcome> {
        match DeviceRepo::create(&self.pool, device).await {
            Ok(()) => Ok(CreateDeviceOutcome::Created),
            Err(e) => match unique_violation(&e).as_deref() {
                Some("uq_devices_username") => Ok(CreateDeviceOutcome::UsernameTaken),
                Some("devices_pkey") => Ok(CreateDeviceOutcome::DeviceExists),
                Some(other) => {
                    tracing::warn!(constraint = other, "Unexpected unique violation on devices");
                    Err(StoreError::Conflict(other.to_string()))
                }
                None => Err(e.into()),
            },
        }
    }

    async fn touch_device(&self, device_public_id: &str, at: Timestamp) -> StoreResult<bool> {
        Ok(DeviceRepo::touch(&self.pool, device_public_id, at).await?)
    }
}

#[async_trait]
impl NonceStore for PgStore {
    async fn create_nonce(
        &self,
        device_public_id: &str,
        nonce: &str,
        expires_at: Timestamp,
        now: Timestamp,
    ) -> StoreResult<()> {
        NonceRepo::create(&self.pool, device_public_id, nonce, expires_at, now)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some(_) => StoreError::Conflict("nonce already issued".into()),
                None => e.into(),
            })
    }

    async fn consume_nonce(
        &self,
        device_public_id: &str,
        nonce: &str,
        now: Timestamp,
    ) -> StoreResult<bool> {
        Ok(NonceRepo::consume(&self.pool, device_public_id, nonce, now).await?)
    }

    async fn purge_nonces(&self, now: Timestamp) -> StoreResult<u64> {
        Ok(NonceRepo::purge(&self.pool, now).await?)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(&self, input: &CreateSession) -> StoreResult<Session> {
        SessionRepo::create(&self.pool, input)
            .await
            .map_err(|e| match unique_violation(&e) {
                Some(_) => StoreError::Conflict("session token already recorded".into()),
                None => e.into(),
            })
    }

    async fn touch_session(&self, token_hash: &str, at: Timestamp) -> StoreResult<bool> {
        Ok(SessionRepo::touch(&self.pool, token_hash, at).await?)
    }

    async fn find_session(&self, token_hash: &str) -> StoreResult<Option<Session>> {
        Ok(SessionRepo::find_by_token_hash(&self.pool, token_hash).await?)
    }

    async fn sessions_for(&self, anon_id: &str) -> StoreResult<Vec<Session>> {
        Ok(SessionRepo::list_for_anon(&self.pool, anon_id).await?)
    }

    async fn revoke_session(&self, token_hash: &str) -> StoreResult<u64> {
        Ok(SessionRepo::revoke(&self.pool, token_hash).await?)
    }

    async fn revoke_all_sessions(&self, anon_id: &str) -> StoreResult<u64> {
        Ok(SessionRepo::revoke_all_for_anon(&self.pool, anon_id).await?)
    }

    async fn enforce_session_limit(&self, anon_id: &str, max: usize) -> StoreResult<u64> {
        Ok(SessionRepo::enforce_limit(&self.pool, anon_id, max).await?)
    }

    async fn cleanup_expired_sessions(&self, now: Timestamp) -> StoreResult<u64> {
        Ok(SessionRepo::cleanup_expired(&self.pool, now).await?)
    }
}

#[async_trait]
impl TrustStore for PgStore {
    async fn create_card(&self, card: &LinkCard) -> StoreResult<()> {
        LinkCardRepo::create(&self.pool, card).await
    }

    async fn get_card(&self, code: &str) -> StoreResult<Option<LinkCard>> {
        LinkCardRepo::find_by_code(&self.pool, code).await
    }

    async fn cards_by_owner(&self, owner: &str) -> StoreResult<Vec<LinkCard>> {
        LinkCardRepo::list_by_owner(&self.pool, owner).await
    }

    async fn revoke_card(
        &self,
        code: &str,
        owner: &str,
        now: Timestamp,
    ) -> StoreResult<RevokeCardOutcome> {
        LinkCardRepo::revoke(&self.pool, code, owner, now).await
    }

    async fn redeem_card(
        &self,
        code: &str,
        redeemer: &str,
        request_id: &str,
        now: Timestamp,
    ) -> StoreResult<RedeemOutcome> {
        LinkCardRepo::redeem(&self.pool, code, redeemer, request_id, now).await
    }

    async fn get_trust_request(&self, id: &str) -> StoreResult<Option<TrustRequest>> {
        TrustRequestRepo::find_by_id(&self.pool, id).await
    }

    async fn resolve_trust_request(
        &self,
        id: &str,
        actor: &str,
        decision: Decision,
        now: Timestamp,
    ) -> StoreResult<ResolveOutcome> {
        TrustRequestRepo::resolve(&self.pool, id, actor, decision, now).await
    }

    async fn trust_for(&self, anon_id: &str) -> StoreResult<Vec<TrustRequest>> {
        TrustRequestRepo::list_for_anon(&self.pool, anon_id).await
    }

    async fn trust_accepted(&self, a: &str, b: &str) -> StoreResult<bool> {
        Ok(TrustRequestRepo::accepted_between(&self.pool, a, b).await?)
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(crate::health_check(&self.pool).await?)
    }
}
