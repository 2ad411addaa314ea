//! Trust handshake state rules.
//!
//! A link card moves `active -> used` exactly once, and only for a redeemer
//! other than its owner; a trust request moves `pending -> accepted|declined`
//! exactly once, and only at the hands of its addressee. Both storage
//! backends call these checks inside their atomic section so the rules live
//! in one place.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Default link-card lifetime in minutes (one day).
pub const DEFAULT_CARD_TTL_MINUTES: i64 = 1440;

/// Longest card lifetime a client may request (30 days).
pub const MAX_CARD_TTL_MINUTES: i64 = 30 * 1440;

// ---------------------------------------------------------------------------
// Link cards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Active,
    Used,
    Revoked,
    Expired,
}

impl CardStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Used => "used",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for CardStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CardStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "used" => Ok(Self::Used),
            "revoked" => Ok(Self::Revoked),
            "expired" => Ok(Self::Expired),
            other => Err(format!("unknown card status '{other}'")),
        }
    }
}

/// Why a card cannot be redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemRejection {
    /// Used, revoked, expired by status, or past its expiry.
    NotActive,
    /// The owner tried to redeem their own card.
    OwnCard,
}

/// Status reported to clients: an `active` card past its expiry is `expired`.
pub fn effective_card_status(
    status: CardStatus,
    expires_at: Timestamp,
    now: Timestamp,
) -> CardStatus {
    if status == CardStatus::Active && now >= expires_at {
        CardStatus::Expired
    } else {
        status
    }
}

/// Check whether `redeemer` may consume a card right now.
pub fn check_redeemable(
    status: CardStatus,
    expires_at: Timestamp,
    owner: &str,
    redeemer: &str,
    now: Timestamp,
) -> Result<(), RedeemRejection> {
    if effective_card_status(status, expires_at, now) != CardStatus::Active {
        return Err(RedeemRejection::NotActive);
    }
    if owner == redeemer {
        return Err(RedeemRejection::OwnCard);
    }
    Ok(())
}

/// Normalize a requested card TTL. Non-positive or absent values use the
/// default; larger ones are capped at [`MAX_CARD_TTL_MINUTES`].
pub fn card_ttl_minutes(requested: Option<i64>) -> i64 {
    match requested {
        Some(m) if m > 0 => m.min(MAX_CARD_TTL_MINUTES),
        _ => DEFAULT_CARD_TTL_MINUTES,
    }
}

// ---------------------------------------------------------------------------
// Trust requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustStatus {
    Pending,
    Accepted,
    Declined,
}

impl TrustStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }
}

impl fmt::Display for TrustStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrustStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            other => Err(format!("unknown trust status '{other}'")),
        }
    }
}

/// A recipient's answer to a pending trust request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accepted,
    Declined,
}

impl Decision {
    /// Parse a client-supplied decision, case- and whitespace-insensitive.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "accepted" => Some(Self::Accepted),
            "declined" => Some(Self::Declined),
            _ => None,
        }
    }

    pub fn into_status(self) -> TrustStatus {
        match self {
            Self::Accepted => TrustStatus::Accepted,
            Self::Declined => TrustStatus::Declined,
        }
    }
}

/// Why a trust request cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveRejection {
    /// The actor is not the addressee.
    NotRecipient,
    /// The request is no longer pending.
    AlreadyResolved,
}

/// Check whether `actor` may resolve a request addressed to `to_anon`.
///
/// The recipient check comes first so that outsiders cannot learn whether a
/// request they do not own has been resolved.
pub fn check_resolvable(
    status: TrustStatus,
    to_anon: &str,
    actor: &str,
) -> Result<(), ResolveRejection> {
    if to_anon != actor {
        return Err(ResolveRejection::NotRecipient);
    }
    if status != TrustStatus::Pending {
        return Err(ResolveRejection::AlreadyResolved);
    }
    Ok(())
}

/// True when an accepted request links `a` and `b` in either direction.
pub fn links_pair(from: &str, to: &str, status: TrustStatus, a: &str, b: &str) -> bool {
    status == TrustStatus::Accepted && ((from == a && to == b) || (from == b && to == a))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};

    use super::*;

    #[test]
    fn active_card_redeemable_by_other() {
        let now = Utc::now();
        let r = check_redeemable(CardStatus::Active, now + Duration::hours(1), "o", "r", now);
        assert_eq!(r, Ok(()));
    }

    #[test]
    fn owner_cannot_redeem() {
        let now = Utc::now();
        let r = check_redeemable(CardStatus::Active, now + Duration::hours(1), "o", "o", now);
        assert_matches!(r, Err(RedeemRejection::OwnCard));
    }

    #[test]
    fn expired_card_rejected_even_if_status_active() {
        let now = Utc::now();
        let r = check_redeemable(CardStatus::Active, now - Duration::seconds(1), "o", "r", now);
        assert_matches!(r, Err(RedeemRejection::NotActive));
    }

    #[test]
    fn used_and_revoked_cards_rejected() {
        let now = Utc::now();
        let later = now + Duration::hours(1);
        for status in [CardStatus::Used, CardStatus::Revoked, CardStatus::Expired] {
            assert_matches!(
                check_redeemable(status, later, "o", "r", now),
                Err(RedeemRejection::NotActive)
            );
        }
    }

    #[test]
    fn effective_status_only_rewrites_active() {
        let now = Utc::now();
        let past = now - Duration::minutes(5);
        assert_eq!(effective_card_status(CardStatus::Active, past, now), CardStatus::Expired);
        assert_eq!(effective_card_status(CardStatus::Used, past, now), CardStatus::Used);
    }

    #[test]
    fn ttl_defaults() {
        assert_eq!(card_ttl_minutes(None), DEFAULT_CARD_TTL_MINUTES);
        assert_eq!(card_ttl_minutes(Some(0)), DEFAULT_CARD_TTL_MINUTES);
        assert_eq!(card_ttl_minutes(Some(-3)), DEFAULT_CARD_TTL_MINUTES);
        assert_eq!(card_ttl_minutes(Some(10)), 10);
    }

    #[test]
    fn card_ttl_is_capped() {
        assert_eq!(card_ttl_minutes(Some(MAX_CARD_TTL_MINUTES)), MAX_CARD_TTL_MINUTES);
        assert_eq!(card_ttl_minutes(Some(MAX_CARD_TTL_MINUTES + 1)), MAX_CARD_TTL_MINUTES);
        assert_eq!(card_ttl_minutes(Some(i64::MAX)), MAX_CARD_TTL_MINUTES);
    }

    #[test]
    fn only_recipient_resolves_once() {
        assert_eq!(check_resolvable(TrustStatus::Pending, "o", "o"), Ok(()));
        assert_matches!(
            check_resolvable(TrustStatus::Pending, "o", "x"),
            Err(ResolveRejection::NotRecipient)
        );
        assert_matches!(
            check_resolvable(TrustStatus::Accepted, "o", "o"),
            Err(ResolveRejection::AlreadyResolved)
        );
        assert_matches!(
            check_resolvable(TrustStatus::Declined, "o", "x"),
            Err(ResolveRejection::NotRecipient)
        );
    }

    #[test]
    fn decision_parsing() {
        assert_eq!(Decision::parse(" Accepted "), Some(Decision::Accepted));
        assert_eq!(Decision::parse("declined"), Some(Decision::Declined));
        assert_eq!(Decision::parse("pending"), None);
    }

    #[test]
    fn links_pair_is_symmetric() {
        assert!(links_pair("a", "b", TrustStatus::Accepted, "a", "b"));
        assert!(links_pair("a", "b", TrustStatus::Accepted, "b", "a"));
        assert!(!links_pair("a", "b", TrustStatus::Pending, "a", "b"));
        assert!(!links_pair("a", "b", TrustStatus::Accepted, "a", "c"));
    }

    #[test]
    fn status_strings_round_trip() {
        for s in [CardStatus::Active, CardStatus::Used, CardStatus::Revoked, CardStatus::Expired] {
            assert_eq!(s.as_str().parse::<CardStatus>(), Ok(s));
        }
        assert!("bogus".parse::<TrustStatus>().is_err());
    }
}
