//! Repository for the `trust_requests` table.

use std::str::FromStr;

use ghostline_core::trust::{check_resolvable, Decision, TrustStatus};
use ghostline_core::types::Timestamp;
use sqlx::{FromRow, PgPool};

use crate::error::{StoreError, StoreResult};
use crate::models::trust_request::{ResolveOutcome, TrustRequest};

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str = "id, code, from_anon, to_anon, status, created_at, updated_at";

/// Raw row; `status` is stored as text and validated on the way out.
#[derive(Debug, FromRow)]
pub(crate) struct TrustRequestRow {
    id: String,
    code: String,
    from_anon: String,
    to_anon: String,
    status: String,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl TryFrom<TrustRequestRow> for TrustRequest {
    type Error = StoreError;

    fn try_from(row: TrustRequestRow) -> Result<Self, Self::Error> {
        let status = TrustStatus::from_str(&row.status)
            .map_err(|e| StoreError::Corrupt(format!("trust request {}: {e}", row.id)))?;
        Ok(Self {
            id: row.id,
            code: row.code,
            from_anon: row.from_anon,
            to_anon: row.to_anon,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Provides lookup and resolution of trust requests.
pub struct TrustRequestRepo;

impl TrustRequestRepo {
    pub async fn find_by_id(pool: &PgPool, id: &str) -> StoreResult<Option<TrustRequest>> {
        let query = format!("SELECT {COLUMNS} FROM trust_requests WHERE id = $1");
        sqlx::query_as::<_, TrustRequestRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(TrustRequest::try_from)
            .transpose()
    }

    /// Requests where `anon_id` is either party, newest first.
    pub async fn list_for_anon(pool: &PgPool, anon_id: &str) -> StoreResult<Vec<TrustRequest>> {
        let query = format!(
            "SELECT {COLUMNS} FROM trust_requests
             WHERE from_anon = $1 OR to_anon = $1
             ORDER BY created_at DESC, id"
        );
        sqlx::query_as::<_, TrustRequestRow>(&query)
            .bind(anon_id)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(TrustRequest::try_from)
            .collect()
    }

    /// Lock the request row, check it is still pending and addressed to
    /// `actor`, then write the decision. Runs in one transaction.
    pub async fn resolve(
        pool: &PgPool,
        id: &str,
        actor: &str,
        decision: Decision,
        now: Timestamp,
    ) -> StoreResult<ResolveOutcome> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM trust_requests WHERE id = $1 FOR UPDATE");
        let Some(row) = sqlx::query_as::<_, TrustRequestRow>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(ResolveOutcome::NotFound);
        };
        let mut request = TrustRequest::try_from(row)?;

        if let Err(rejection) = check_resolvable(request.status, &request.to_anon, actor) {
            return Ok(ResolveOutcome::Rejected(rejection));
        }

        request.status = decision.into_status();
        request.updated_at = now;
        sqlx::query("UPDATE trust_requests SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(request.status.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(ResolveOutcome::Resolved(request))
    }

    /// True iff an accepted request links `a` and `b` in either direction.
    pub async fn accepted_between(pool: &PgPool, a: &str, b: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                 SELECT 1 FROM trust_requests
                 WHERE status = 'accepted'
                   AND ((from_anon = $1 AND to_anon = $2) OR (from_anon = $2 AND to_anon = $1))
             )",
        )
        .bind(a)
        .bind(b)
        .fetch_one(pool)
        .await
    }
}
