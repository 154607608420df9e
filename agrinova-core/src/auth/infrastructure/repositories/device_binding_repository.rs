use std::fmt;

use agrinova_model::{DeviceInfo, Platform};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::auth::domain::aggregates::DeviceBinding;
use crate::auth::domain::repositories::DeviceBindingRepository;
use crate::auth::domain::value_objects::{DeviceFingerprint, DeviceId};

pub struct PostgresDeviceBindingRepository {
    pool: PgPool,
}

impl fmt::Debug for PostgresDeviceBindingRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresDeviceBindingRepository").finish()
    }
}

impl PostgresDeviceBindingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct BindingRow {
    id: Uuid,
    user_id: Uuid,
    device_id: String,
    device_fingerprint: String,
    platform: String,
    device_info: serde_json::Value,
    biometric_hash: Option<String>,
    is_trusted: bool,
    is_authorized: bool,
    last_seen_at: Option<DateTime<Utc>>,
    authorized_by: Option<Uuid>,
    authorized_at: Option<DateTime<Utc>>,
    revoked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BindingRow> for DeviceBinding {
    type Error = anyhow::Error;

    fn try_from(row: BindingRow) -> Result<Self> {
        let device_id = DeviceId::parse(&row.device_id)
            .ok_or_else(|| anyhow!("binding {} has an empty device id", row.id))?;
        let fingerprint = DeviceFingerprint::new(row.device_fingerprint)
            .with_context(|| format!("binding {} has a bad fingerprint", row.id))?;
        let platform: Platform = row.platform.parse()?;

        Ok(DeviceBinding::hydrate(
            row.id,
            row.user_id,
            device_id,
            fingerprint,
            platform,
            DeviceInfo::from_json(&row.device_info),
            row.biometric_hash,
            row.is_trusted,
            row.is_authorized,
            row.last_seen_at,
            row.authorized_by,
            row.authorized_at,
            row.revoked_at,
            row.created_at,
            row.updated_at,
        ))
    }
}

#[async_trait]
impl DeviceBindingRepository for PostgresDeviceBindingRepository {
    async fn find_live_by_device(
        &self,
        device_id: &DeviceId,
    ) -> Result<Option<DeviceBinding>> {
        let row = sqlx::query_as::<_, BindingRow>(
            r#"
            SELECT
                id, user_id, device_id, device_fingerprint, platform,
                device_info, biometric_hash, is_trusted, is_authorized,
                last_seen_at, authorized_by, authorized_at, revoked_at,
                created_at, updated_at
            FROM device_bindings
            WHERE device_id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(device_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("failed to load device binding")?;

        row.map(DeviceBinding::try_from).transpose()
    }

    async fn count_for_user(&self, user_id: Uuid) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM device_bindings WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .context("failed to count device bindings")?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn insert(&self, binding: &DeviceBinding) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO device_bindings (
                id, user_id, device_id, device_fingerprint, platform,
                device_info, biometric_hash, is_trusted, is_authorized,
                last_seen_at, authorized_by, authorized_at, revoked_at,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (device_id) WHERE revoked_at IS NULL DO NOTHING
            "#,
        )
        .bind(binding.id())
        .bind(binding.user_id())
        .bind(binding.device_id().as_str())
        .bind(binding.fingerprint().as_str())
        .bind(binding.platform().as_str())
        .bind(binding.device_info().to_json())
        .bind(binding.biometric_hash())
        .bind(binding.is_trusted())
        .bind(binding.is_authorized())
        .bind(binding.last_seen_at())
        .bind(binding.authorized_by())
        .bind(binding.authorized_at())
        .bind(binding.revoked_at())
        .bind(binding.created_at())
        .bind(binding.updated_at())
        .execute(&self.pool)
        .await
        .context("failed to insert device binding")?;

        Ok(result.rows_affected() == 1)
    }

    async fn save(&self, binding: &DeviceBinding) -> Result<()> {
        // Fingerprint, device id, and owner are immutable once bound.
        sqlx::query(
            r#"
            UPDATE device_bindings
            SET is_trusted = $2,
                is_authorized = $3,
                last_seen_at = $4,
                authorized_by = $5,
                authorized_at = $6,
                revoked_at = COALESCE(revoked_at, $7),
                biometric_hash = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(binding.id())
        .bind(binding.is_trusted())
        .bind(binding.is_authorized())
        .bind(binding.last_seen_at())
        .bind(binding.authorized_by())
        .bind(binding.authorized_at())
        .bind(binding.revoked_at())
        .bind(binding.biometric_hash())
        .bind(binding.updated_at())
        .execute(&self.pool)
        .await
        .context("failed to update device binding")?;

        Ok(())
    }

    async fn touch(&self, binding_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE device_bindings
            SET last_seen_at = $2, updated_at = $2
            WHERE id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(binding_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .context("failed to touch device binding")?;

        Ok(())
    }
}
