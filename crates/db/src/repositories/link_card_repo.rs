//! Repository for the `link_cards` table.

use std::str::FromStr;

use ghostline_core::trust::{check_redeemable, CardStatus, TrustStatus};
use ghostline_core::types::Timestamp;
use sqlx::{FromRow, PgPool};

use crate::error::{unique_violation, StoreError, StoreResult};
use crate::models::link_card::{LinkCard, RevokeCardOutcome};
use crate::models::trust_request::{RedeemOutcome, TrustRequest};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "code, owner_anon, status, created_at, expires_at, used_by";

#[derive(Debug, FromRow)]
struct LinkCardRow {
    code: String,
    owner_anon: String,
    status: String,
    created_at: Timestamp,
    expires_at: Timestamp,
    used_by: Option<String>,
}

impl TryFrom<LinkCardRow> for LinkCard {
    type Error = StoreError;

    fn try_from(row: LinkCardRow) -> Result<Self, Self::Error> {
        let status = CardStatus::from_str(&row.status)
            .map_err(|e| StoreError::Corrupt(format!("link card {}: {e}", row.code)))?;
        Ok(Self {
            code: row.code,
            owner_anon: row.owner_anon,
            status,
            created_at: row.created_at,
            expires_at: row.expires_at,
            used_by: row.used_by,
        })
    }
}

/// Provides CRUD and redemption for link cards.
pub struct LinkCardRepo;

impl LinkCardRepo {
    /// Insert a card. A duplicate code maps to [`StoreError::Conflict`].
    pub async fn create(pool: &PgPool, card: &LinkCard) -> StoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO link_cards (code, owner_anon, status, created_at, expires_at, used_by)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&card.code)
        .bind(&card.owner_anon)
        .bind(card.status.as_str())
        .bind(card.created_at)
        .bind(card.expires_at)
        .bind(&card.used_by)
        .execute(pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => match unique_violation(&e) {
                Some(constraint) => Err(StoreError::Conflict(format!(
                    "link card code {} ({constraint})",
                    card.code
                ))),
                None => Err(e.into()),
            },
        }
    }

    pub async fn find_by_code(pool: &PgPool, code: &str) -> StoreResult<Option<LinkCard>> {
        let query = format!("SELECT {COLUMNS} FROM link_cards WHERE code = $1");
        sqlx::query_as::<_, LinkCardRow>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await?
            .map(LinkCard::try_from)
            .transpose()
    }

    /// Cards owned by `owner`, newest first.
    pub async fn list_by_owner(pool: &PgPool, owner: &str) -> StoreResult<Vec<LinkCard>> {
        let query = format!(
            "SELECT {COLUMNS} FROM link_cards WHERE owner_anon = $1 ORDER BY created_at DESC, code"
        );
        sqlx::query_as::<_, LinkCardRow>(&query)
            .bind(owner)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(LinkCard::try_from)
            .collect()
    }

    /// Revoke an active card belonging to `owner`.
    pub async fn revoke(
        pool: &PgPool,
        code: &str,
        owner: &str,
        now: Timestamp,
    ) -> StoreResult<RevokeCardOutcome> {
        let result = sqlx::query(
            "UPDATE link_cards SET status = 'revoked'
             WHERE code = $1 AND owner_anon = $2 AND status = 'active' AND expires_at > $3",
        )
        .bind(code)
        .bind(owner)
        .bind(now)
        .execute(pool)
        .await?;
        if result.rows_affected() == 1 {
            return Ok(RevokeCardOutcome::Revoked);
        }

        // Distinguish "not yours / unknown" from "no longer active".
        match Self::find_by_code(pool, code).await? {
            Some(card) if card.owner_anon == owner => Ok(RevokeCardOutcome::NotActive),
            _ => Ok(RevokeCardOutcome::NotFound),
        }
    }

    /// Mark the card used and insert the pending request in one transaction.
    ///
    /// The card row is locked with `FOR UPDATE`, so of two concurrent
    /// redeemers the second sees `status = 'used'` and is rejected.
    pub async fn redeem(
        pool: &PgPool,
        code: &str,
        redeemer: &str,
        request_id: &str,
        now: Timestamp,
    ) -> StoreResult<RedeemOutcome> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM link_cards WHERE code = $1 FOR UPDATE");
        let Some(row) = sqlx::query_as::<_, LinkCardRow>(&query)
            .bind(code)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(RedeemOutcome::NotFound);
        };
        let card = LinkCard::try_from(row)?;

        if let Err(rejection) =
            check_redeemable(card.status, card.expires_at, &card.owner_anon, redeemer, now)
        {
            return Ok(RedeemOutcome::Rejected(rejection));
        }

        sqlx::query("UPDATE link_cards SET status = 'used', used_by = $2 WHERE code = $1")
            .bind(code)
            .bind(redeemer)
            .execute(&mut *tx)
            .await?;

        let request = TrustRequest {
            id: request_id.to_string(),
            code: code.to_string(),
            from_anon: redeemer.to_string(),
            to_anon: card.owner_anon,
            status: TrustStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        sqlx::query(
            "INSERT INTO trust_requests (id, code, from_anon, to_anon, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&request.id)
        .bind(&request.code)
        .bind(&request.from_anon)
        .bind(&request.to_anon)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(RedeemOutcome::Redeemed(request))
    }
}
