//! Repository for the `device_nonces` table.

use ghostline_core::types::Timestamp;
use sqlx::PgPool;

/// Provides issue/consume operations for challenge nonces.
pub struct NonceRepo;

impl NonceRepo {
    pub async fn create(
        pool: &PgPool,
        device_public_id: &str,
        nonce: &str,
        expires_at: Timestamp,
        now: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO device_nonces (device_public_id, nonce, expires_at, created_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(device_public_id)
        .bind(nonce)
        .bind(expires_at)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Mark the nonce used in a single conditional UPDATE.
    ///
    /// Row locking makes concurrent consumers serialize on the row; only the
    /// first one still sees `used_at IS NULL`.
    pub async fn consume(
        pool: &PgPool,
        device_public_id: &str,
        nonce: &str,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE device_nonces SET used_at = $3
             WHERE device_public_id = $1
               AND nonce = $2
               AND used_at IS NULL
               AND expires_at > $3",
        )
        .bind(device_public_id)
        .bind(nonce)
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Delete used or expired nonces. Returns the count of deleted rows.
    pub async fn purge(pool: &PgPool, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM device_nonces WHERE used_at IS NOT NULL OR expires_at <= $1")
                .bind(now)
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }
}
