//! Trust request model and atomic-operation outcomes.

use ghostline_core::trust::{RedeemRejection, ResolveRejection, TrustStatus};
use ghostline_core::types::{AnonId, Timestamp};
use serde::Serialize;

/// A handshake from the redeemer of a card (`from_anon`) to its owner (`to_anon`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrustRequest {
    pub id: String,
    /// The link card that seeded this request.
    pub code: String,
    pub from_anon: AnonId,
    pub to_anon: AnonId,
    pub status: TrustStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Result of redeeming a link card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedeemOutcome {
    /// Card marked used and the pending request created, together.
    Redeemed(TrustRequest),
    NotFound,
    Rejected(RedeemRejection),
}

/// Result of resolving a trust request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    Resolved(TrustRequest),
    NotFound,
    Rejected(ResolveRejection),
}
