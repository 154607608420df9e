use std::fmt;

use agrinova_model::{Platform, TokenRecordType};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::auth::domain::repositories::{
    DeviceRevocationScope, TokenRecord, TokenRecordRepository,
};
use crate::auth::domain::value_objects::RevocationReason;

pub struct PostgresTokenRecordRepository {
    pool: PgPool,
}

impl fmt::Debug for PostgresTokenRecordRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresTokenRecordRepository").finish()
    }
}

impl PostgresTokenRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct TokenRow {
    id: Uuid,
    user_id: Uuid,
    device_id: String,
    platform: String,
    token_type: String,
    token_hash: String,
    refresh_hash: Option<String>,
    offline_hash: Option<String>,
    expires_at: DateTime<Utc>,
    refresh_expires_at: Option<DateTime<Utc>>,
    offline_expires_at: Option<DateTime<Utc>>,
    is_revoked: bool,
    revoked_at: Option<DateTime<Utc>>,
    revoked_reason: Option<String>,
    last_used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TokenRow> for TokenRecord {
    type Error = anyhow::Error;

    fn try_from(row: TokenRow) -> Result<Self> {
        let token_type: TokenRecordType = row
            .token_type
            .parse()
            .with_context(|| format!("token record {} has a bad type", row.id))?;
        let platform: Platform = row.platform.parse()?;
        Ok(TokenRecord {
            id: row.id,
            user_id: row.user_id,
            device_id: row.device_id,
            platform,
            token_type,
            token_hash: row.token_hash,
            refresh_hash: row.refresh_hash,
            offline_hash: row.offline_hash,
            expires_at: row.expires_at,
            refresh_expires_at: row.refresh_expires_at,
            offline_expires_at: row.offline_expires_at,
            is_revoked: row.is_revoked,
            revoked_at: row.revoked_at,
            revoked_reason: row.revoked_reason,
            last_used_at: row.last_used_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const TOKEN_COLUMNS: &str = r#"
    id, user_id, device_id, platform, token_type, token_hash,
    refresh_hash, offline_hash, expires_at, refresh_expires_at,
    offline_expires_at, is_revoked, revoked_at, revoked_reason,
    last_used_at, created_at, updated_at
"#;

impl PostgresTokenRecordRepository {
    /// Live JWT family by id; `hash_column` must be a trusted column name.
    async fn find_live_family(
        &self,
        hash_column: &str,
        expiry: &str,
        token_id: Uuid,
        hashes: &[String],
        now: DateTime<Utc>,
    ) -> Result<Option<TokenRecord>> {
        let sql = format!(
            r#"
            SELECT {TOKEN_COLUMNS}
            FROM jwt_tokens
            WHERE id = $1
              AND token_type = 'JWT'
              AND is_revoked = FALSE
              AND {hash_column} = ANY($2)
              AND {expiry} > $3
            "#
        );
        let row = sqlx::query_as::<_, TokenRow>(&sql)
            .bind(token_id)
            .bind(hashes)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .context("failed to look up token record")?;

        row.map(TokenRecord::try_from).transpose()
    }
}

#[async_trait]
impl TokenRecordRepository for PostgresTokenRecordRepository {
    async fn insert(&self, record: &TokenRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO jwt_tokens (
                id, user_id, device_id, platform, token_type, token_hash,
                refresh_hash, offline_hash, expires_at, refresh_expires_at,
                offline_expires_at, is_revoked, revoked_at, revoked_reason,
                last_used_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.device_id)
        .bind(record.platform.as_str())
        .bind(record.token_type.as_str())
        .bind(&record.token_hash)
        .bind(&record.refresh_hash)
        .bind(&record.offline_hash)
        .bind(record.expires_at)
        .bind(record.refresh_expires_at)
        .bind(record.offline_expires_at)
        .bind(record.is_revoked)
        .bind(record.revoked_at)
        .bind(&record.revoked_reason)
        .bind(record.last_used_at)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .context("failed to insert token record")?;

        Ok(())
    }

    async fn find_by_id(&self, token_id: Uuid) -> Result<Option<TokenRecord>> {
        let sql = format!("SELECT {TOKEN_COLUMNS} FROM jwt_tokens WHERE id = $1");
        let row = sqlx::query_as::<_, TokenRow>(&sql)
            .bind(token_id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load token record")?;

        row.map(TokenRecord::try_from).transpose()
    }

    async fn find_live_access(
        &self,
        token_id: Uuid,
        hashes: &[String],
        now: DateTime<Utc>,
    ) -> Result<Option<TokenRecord>> {
        self.find_live_family("token_hash", "expires_at", token_id, hashes, now)
            .await
    }

    async fn find_live_refresh(
        &self,
        token_id: Uuid,
        hashes: &[String],
        now: DateTime<Utc>,
    ) -> Result<Option<TokenRecord>> {
        self.find_live_family(
            "refresh_hash",
            "COALESCE(refresh_expires_at, expires_at)",
            token_id,
            hashes,
            now,
        )
        .await
    }

    async fn find_live_offline(
        &self,
        hashes: &[String],
        now: DateTime<Utc>,
    ) -> Result<Option<TokenRecord>> {
        let sql = format!(
            r#"
            SELECT {TOKEN_COLUMNS}
            FROM jwt_tokens
            WHERE token_type = 'OFFLINE'
              AND is_revoked = FALSE
              AND (offline_hash = ANY($1) OR token_hash = ANY($1))
              AND COALESCE(offline_expires_at, expires_at) > $2
            LIMIT 1
            "#
        );
        let row = sqlx::query_as::<_, TokenRow>(&sql)
            .bind(hashes)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .context("failed to look up offline token record")?;

        row.map(TokenRecord::try_from).transpose()
    }

    async fn touch_last_used(
        &self,
        token_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE jwt_tokens SET last_used_at = $2 WHERE id = $1")
            .bind(token_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .context("failed to touch token record")?;
        Ok(())
    }

    async fn revoke(
        &self,
        token_id: Uuid,
        reason: RevocationReason,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE jwt_tokens
            SET is_revoked = TRUE,
                revoked_at = NOW(),
                revoked_reason = COALESCE(revoked_reason, $2),
                updated_at = NOW()
            WHERE id = $1 AND is_revoked = FALSE
            "#,
        )
        .bind(token_id)
        .bind(reason.as_str())
        .execute(&self.pool)
        .await
        .context("failed to revoke token")?;

        Ok(result.rows_affected())
    }

    async fn revoke_for_user(
        &self,
        user_id: Uuid,
        reason: RevocationReason,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE jwt_tokens
            SET is_revoked = TRUE,
                revoked_at = NOW(),
                revoked_reason = COALESCE(revoked_reason, $2),
                updated_at = NOW()
            WHERE user_id = $1 AND is_revoked = FALSE
            "#,
        )
        .bind(user_id)
        .bind(reason.as_str())
        .execute(&self.pool)
        .await
        .context("failed to revoke user tokens")?;

        Ok(result.rows_affected())
    }

    async fn revoke_for_device(
        &self,
        user_id: Uuid,
        device_id: &str,
        scope: DeviceRevocationScope,
        reason: RevocationReason,
    ) -> Result<u64> {
        let only_type = match scope {
            DeviceRevocationScope::All => None,
            DeviceRevocationScope::Only(kind) => Some(kind.as_str()),
        };
        let result = sqlx::query(
            r#"
            UPDATE jwt_tokens
            SET is_revoked = TRUE,
                revoked_at = NOW(),
                revoked_reason = COALESCE(revoked_reason, $4),
                updated_at = NOW()
            WHERE user_id = $1
              AND device_id = $2
              AND ($3::varchar IS NULL OR token_type = $3)
              AND is_revoked = FALSE
            "#,
        )
        .bind(user_id)
        .bind(device_id)
        .bind(only_type)
        .bind(reason.as_str())
        .execute(&self.pool)
        .await
        .context("failed to revoke device tokens")?;

        Ok(result.rows_affected())
    }
}
