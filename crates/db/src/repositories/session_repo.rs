//! Repository for the `sessions` table.

use ghostline_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::session::{CreateSession, Session};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id::text AS id, anon_id, token_hash, region, issued_at, expires_at, \
                       last_activity_at";

/// Provides CRUD operations for session metadata.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new session, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateSession) -> Result<Session, sqlx::Error> {
        let query = format!(
            "INSERT INTO sessions (anon_id, token_hash, region, issued_at, expires_at, last_activity_at)
             VALUES ($1, $2, $3, $4, $5, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(&input.anon_id)
            .bind(&input.token_hash)
            .bind(&input.region)
            .bind(input.issued_at)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    pub async fn touch(pool: &PgPool, token_hash: &str, at: Timestamp) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE sessions SET last_activity_at = $2 WHERE token_hash = $1")
            .bind(token_hash)
            .bind(at)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_token_hash(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<Session>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM sessions WHERE token_hash = $1");
        sqlx::query_as::<_, Session>(&query)
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    /// Sessions of one identity, most recently active first.
    pub async fn list_for_anon(pool: &PgPool, anon_id: &str) -> Result<Vec<Session>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM sessions
             WHERE anon_id = $1
             ORDER BY COALESCE(last_activity_at, issued_at) DESC, issued_at DESC"
        );
        sqlx::query_as::<_, Session>(&query)
            .bind(anon_id)
            .fetch_all(pool)
            .await
    }

    pub async fn revoke(pool: &PgPool, token_hash: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn revoke_all_for_anon(pool: &PgPool, anon_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE anon_id = $1")
            .bind(anon_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Keep the `max` most recently active sessions of `anon_id`, delete the rest.
    pub async fn enforce_limit(pool: &PgPool, anon_id: &str, max: usize) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM sessions WHERE id IN (
                 SELECT id FROM sessions
                 WHERE anon_id = $1
                 ORDER BY COALESCE(last_activity_at, issued_at) DESC, issued_at DESC, id
                 OFFSET $2
             )",
        )
        .bind(anon_id)
        .bind(i64::try_from(max).unwrap_or(i64::MAX))
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete sessions whose expiry has passed. Returns the count of deleted rows.
    pub async fn cleanup_expired(pool: &PgPool, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
