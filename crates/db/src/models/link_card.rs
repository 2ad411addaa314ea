//! Link card (invite) model.

use ghostline_core::trust::{effective_card_status, CardStatus};
use ghostline_core::types::{AnonId, Timestamp};

/// A single-use invite code owned by one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCard {
    pub code: String,
    pub owner_anon: AnonId,
    pub status: CardStatus,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub used_by: Option<AnonId>,
}

impl LinkCard {
    /// Status as seen by clients at `now`.
    pub fn status_at(&self, now: Timestamp) -> CardStatus {
        effective_card_status(self.status, self.expires_at, now)
    }
}

/// Result of an owner revoking a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeCardOutcome {
    Revoked,
    /// Unknown code, or a card owned by someone else.
    NotFound,
    /// Already used, revoked or expired.
    NotActive,
}
