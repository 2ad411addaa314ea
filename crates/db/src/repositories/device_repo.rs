//! Repository for the `devices` table.

use ghostline_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::device::Device;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "device_public_id, device_secret_hash, anon_id, username, created_at, updated_at";

/// Provides CRUD operations for registered devices.
pub struct DeviceRepo;

impl DeviceRepo {
    pub async fn find_by_device_id(
        pool: &PgPool,
        device_public_id: &str,
    ) -> Result<Option<Device>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM devices WHERE device_public_id = $1");
        sqlx::query_as::<_, Device>(&query)
            .bind(device_public_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_anon_id(
        pool: &PgPool,
        anon_id: &str,
    ) -> Result<Option<Device>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM devices WHERE anon_id = $1 LIMIT 1");
        sqlx::query_as::<_, Device>(&query)
            .bind(anon_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a device. Unique violations (`devices_pkey`,
    /// `uq_devices_username`) surface as database errors for the caller to
    /// classify.
    pub async fn create(pool: &PgPool, device: &Device) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO devices
                (device_public_id, device_secret_hash, anon_id, username, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&device.device_public_id)
        .bind(&device.device_secret_hash)
        .bind(&device.anon_id)
        .bind(&device.username)
        .bind(device.created_at)
        .bind(device.updated_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Bump `updated_at`. Returns `true` if the row exists.
    pub async fn touch(
        pool: &PgPool,
        device_public_id: &str,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE devices SET updated_at = $2 WHERE device_public_id = $1")
            .bind(device_public_id)
            .bind(at)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
