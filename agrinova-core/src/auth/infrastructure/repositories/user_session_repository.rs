use std::fmt;

use agrinova_model::{DeviceInfo, LoginMethod, Platform};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::auth::domain::aggregates::{SessionSecurityFlags, UserSession};
use crate::auth::domain::repositories::UserSessionRepository;
use crate::auth::domain::value_objects::RevocationReason;

pub struct PostgresUserSessionRepository {
    pool: PgPool,
}

impl fmt::Debug for PostgresUserSessionRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresUserSessionRepository").finish()
    }
}

impl PostgresUserSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct SessionRow {
    id: Uuid,
    user_id: Uuid,
    device_id: Option<String>,
    session_token_hash: String,
    refresh_token_hash: Option<String>,
    platform: String,
    device_info: serde_json::Value,
    ip_address: Option<String>,
    user_agent: Option<String>,
    login_method: String,
    require_reauth: bool,
    suspicious_activity: bool,
    new_device: bool,
    location_change: bool,
    last_activity: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    is_active: bool,
    revoked_at: Option<DateTime<Utc>>,
    revoked_reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for UserSession {
    type Error = anyhow::Error;

    fn try_from(row: SessionRow) -> Result<Self> {
        let platform: Platform = row.platform.parse()?;
        let login_method: LoginMethod = row.login_method.parse()?;
        Ok(UserSession {
            id: row.id,
            user_id: row.user_id,
            device_id: row.device_id,
            session_token_hash: row.session_token_hash,
            refresh_token_hash: row.refresh_token_hash,
            platform,
            device_info: DeviceInfo::from_json(&row.device_info),
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            login_method,
            flags: SessionSecurityFlags {
                require_reauth: row.require_reauth,
                suspicious_activity: row.suspicious_activity,
                new_device: row.new_device,
                location_change: row.location_change,
            },
            last_activity: row.last_activity,
            expires_at: row.expires_at,
            is_active: row.is_active,
            revoked_at: row.revoked_at,
            revoked_reason: row.revoked_reason,
            created_at: row.created_at,
        })
    }
}

const SESSION_COLUMNS: &str = r#"
    id, user_id, device_id, session_token_hash, refresh_token_hash, platform,
    device_info, ip_address, user_agent, login_method, require_reauth,
    suspicious_activity, new_device, location_change, last_activity,
    expires_at, is_active, revoked_at, revoked_reason, created_at
"#;

#[async_trait]
impl UserSessionRepository for PostgresUserSessionRepository {
    async fn insert(&self, session: &UserSession) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_sessions (
                id, user_id, device_id, session_token_hash, refresh_token_hash,
                platform, device_info, ip_address, user_agent, login_method,
                require_reauth, suspicious_activity, new_device,
                location_change, last_activity, expires_at, is_active,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $18)
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.device_id)
        .bind(&session.session_token_hash)
        .bind(&session.refresh_token_hash)
        .bind(session.platform.as_str())
        .bind(session.device_info.to_json())
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(session.login_method.as_str())
        .bind(session.flags.require_reauth)
        .bind(session.flags.suspicious_activity)
        .bind(session.flags.new_device)
        .bind(session.flags.location_change)
        .bind(session.last_activity)
        .bind(session.expires_at)
        .bind(session.is_active)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .context("failed to insert user session")?;

        Ok(())
    }

    async fn find_by_id(&self, session_id: Uuid) -> Result<Option<UserSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM user_sessions WHERE id = $1");
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load user session")?;

        row.map(UserSession::try_from).transpose()
    }

    async fn find_active_by_token_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserSession>> {
        let sql = format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM user_sessions
            WHERE session_token_hash = $1 AND is_active AND expires_at > $2
            "#
        );
        let row = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .context("failed to look up user session")?;

        row.map(UserSession::try_from).transpose()
    }

    async fn touch(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE user_sessions
            SET last_activity = $2, updated_at = $2
            WHERE id = $1 AND is_active
            "#,
        )
        .bind(session_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .context("failed to touch user session")?;

        Ok(())
    }

    async fn rotate_refresh_hash(
        &self,
        old_hash: &str,
        new_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE user_sessions
            SET refresh_token_hash = $2, last_activity = $3, updated_at = $3
            WHERE refresh_token_hash = $1 AND is_active
            "#,
        )
        .bind(old_hash)
        .bind(new_hash)
        .bind(at)
        .execute(&self.pool)
        .await
        .context("failed to rotate session refresh hash")?;

        Ok(result.rows_affected())
    }

    async fn deactivate_for_device(
        &self,
        user_id: Uuid,
        device_id: &str,
        reason: RevocationReason,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE user_sessions
            SET is_active = FALSE,
                revoked_at = NOW(),
                revoked_reason = COALESCE(revoked_reason, $3),
                updated_at = NOW()
            WHERE user_id = $1
              AND (device_id = $2 OR id::text = $2)
              AND is_active
            "#,
        )
        .bind(user_id)
        .bind(device_id)
        .bind(reason.as_str())
        .execute(&self.pool)
        .await
        .context("failed to deactivate user sessions")?;

        Ok(result.rows_affected())
    }
}
