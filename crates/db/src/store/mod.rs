//! Storage capability traits.
//!
//! Each trait covers one independently synchronized store. Protocol services
//! depend on the narrowest trait they need, which keeps them testable against
//! [`MemStore`] and lets the binary swap in [`PgStore`] without touching
//! protocol code.

mod memory;
mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use ghostline_core::trust::Decision;
use ghostline_core::types::Timestamp;

use crate::error::StoreResult;
use crate::models::device::{CreateDeviceOutcome, Device};
use crate::models::link_card::{LinkCard, RevokeCardOutcome};
use crate::models::session::{CreateSession, Session};
use crate::models::trust_request::{RedeemOutcome, ResolveOutcome, TrustRequest};

pub use memory::MemStore;
pub use postgres::PgStore;

/// Device registry.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn get_device(&self, device_public_id: &str) -> StoreResult<Option<Device>>;

    async fn get_device_by_anon_id(&self, anon_id: &str) -> StoreResult<Option<Device>>;

    /// Insert a device unless its identifier or display name is taken.
    async fn create_device(&self, device: &Device) -> StoreResult<CreateDeviceOutcome>;

    /// Bump `updated_at`. Returns `false` for an unknown device.
    async fn touch_device(&self, device_public_id: &str, at: Timestamp) -> StoreResult<bool>;
}

/// Single-use challenge nonces.
#[async_trait]
pub trait NonceStore: Send + Sync {
    async fn create_nonce(
        &self,
        device_public_id: &str,
        nonce: &str,
        expires_at: Timestamp,
        now: Timestamp,
    ) -> StoreResult<()>;

    /// Atomically mark the nonce used if it exists, is unused and unexpired.
    ///
    /// Of any number of concurrent callers for the same nonce at most one
    /// receives `true`.
    async fn consume_nonce(
        &self,
        device_public_id: &str,
        nonce: &str,
        now: Timestamp,
    ) -> StoreResult<bool>;

    /// Drop used and expired nonces. Returns the number removed.
    async fn purge_nonces(&self, now: Timestamp) -> StoreResult<u64>;
}

/// Session metadata rows, keyed by token hash.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, input: &CreateSession) -> StoreResult<Session>;

    /// Set `last_activity_at`. Returns `false` if no row matches.
    async fn touch_session(&self, token_hash: &str, at: Timestamp) -> StoreResult<bool>;

    async fn find_session(&self, token_hash: &str) -> StoreResult<Option<Session>>;

    /// All sessions of an identity, most recently active first.
    async fn sessions_for(&self, anon_id: &str) -> StoreResult<Vec<Session>>;

    async fn revoke_session(&self, token_hash: &str) -> StoreResult<u64>;

    async fn revoke_all_sessions(&self, anon_id: &str) -> StoreResult<u64>;

    /// Delete least recently active sessions until at most `max` remain.
    /// Returns the number evicted.
    async fn enforce_session_limit(&self, anon_id: &str, max: usize) -> StoreResult<u64>;

    async fn cleanup_expired_sessions(&self, now: Timestamp) -> StoreResult<u64>;
}

/// Link cards and trust requests. Kept in one store because redemption
/// writes both atomically.
#[async_trait]
pub trait TrustStore: Send + Sync {
    /// Insert a new card. A duplicate code yields [`crate::StoreError::Conflict`].
    async fn create_card(&self, card: &LinkCard) -> StoreResult<()>;

    async fn get_card(&self, code: &str) -> StoreResult<Option<LinkCard>>;

    /// Cards owned by `owner`, newest first.
    async fn cards_by_owner(&self, owner: &str) -> StoreResult<Vec<LinkCard>>;

    async fn revoke_card(
        &self,
        code: &str,
        owner: &str,
        now: Timestamp,
    ) -> StoreResult<RevokeCardOutcome>;

    /// Mark the card used by `redeemer` and create the pending request
    /// `redeemer -> owner` with id `request_id`, all or nothing.
    async fn redeem_card(
        &self,
        code: &str,
        redeemer: &str,
        request_id: &str,
        now: Timestamp,
    ) -> StoreResult<RedeemOutcome>;

    async fn get_trust_request(&self, id: &str) -> StoreResult<Option<TrustRequest>>;

    /// Resolve a pending request on behalf of `actor`, exactly once.
    async fn resolve_trust_request(
        &self,
        id: &str,
        actor: &str,
        decision: Decision,
        now: Timestamp,
    ) -> StoreResult<ResolveOutcome>;

    /// Requests where `anon_id` is either party, newest first.
    async fn trust_for(&self, anon_id: &str) -> StoreResult<Vec<TrustRequest>>;

    /// True iff an accepted request links `a` and `b` in either direction.
    async fn trust_accepted(&self, a: &str, b: &str) -> StoreResult<bool>;
}

/// Backend liveness, reported by `/health`.
#[async_trait]
pub trait StoreHealth: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn health_check(&self) -> StoreResult<()>;
}

/// The storage handles injected into the protocol services.
#[derive(Clone)]
pub struct Stores {
    pub devices: Arc<dyn DeviceStore>,
    pub nonces: Arc<dyn NonceStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub trust: Arc<dyn TrustStore>,
    pub health: Arc<dyn StoreHealth>,
}

impl Stores {
    /// Hand out one backend through every capability it implements.
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: DeviceStore + NonceStore + SessionStore + TrustStore + StoreHealth + 'static,
    {
        Self {
            devices: backend.clone(),
            nonces: backend.clone(),
            sessions: backend.clone(),
            trust: backend.clone(),
            health: backend,
        }
    }

    /// Fresh in-memory backend.
    pub fn in_memory() -> Self {
        Self::from_backend(Arc::new(MemStore::new()))
    }
}
