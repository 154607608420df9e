use agrinova_model::{Platform, TokenRecordType};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::domain::aggregates::{
    AssignmentSnapshot, DeviceBinding, UserAccount, UserSession,
};
use crate::auth::domain::value_objects::{DeviceId, RevocationReason};

/// Read access to user accounts and their assignment chain.
#[async_trait]
pub trait UserAccountRepository: Send + Sync {
    /// Case-insensitive on username and email, exact on phone.
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<UserAccount>>;

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserAccount>>;

    async fn load_assignments(
        &self,
        user_id: Uuid,
    ) -> Result<AssignmentSnapshot>;
}

#[async_trait]
pub trait DeviceBindingRepository: Send + Sync {
    /// The non-revoked binding for a device id, whoever owns it.
    async fn find_live_by_device(
        &self,
        device_id: &DeviceId,
    ) -> Result<Option<DeviceBinding>>;

    /// Bindings the user has ever had, revoked ones included.
    async fn count_for_user(&self, user_id: Uuid) -> Result<u64>;

    /// Insert a new live binding. Returns `false` when another live binding
    /// for the same device id already exists.
    async fn insert(&self, binding: &DeviceBinding) -> Result<bool>;

    /// Persist flag, last-seen, and revocation changes.
    async fn save(&self, binding: &DeviceBinding) -> Result<()>;

    async fn touch(&self, binding_id: Uuid, at: DateTime<Utc>) -> Result<()>;
}

/// Persisted, hash-only view of an issued token family or offline token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub device_id: String,
    /// Platform the family was issued to; mobile families require a live
    /// device binding.
    pub platform: Platform,
    pub token_type: TokenRecordType,
    pub token_hash: String,
    pub refresh_hash: Option<String>,
    pub offline_hash: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub refresh_expires_at: Option<DateTime<Utc>>,
    pub offline_expires_at: Option<DateTime<Utc>>,
    pub is_revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<String>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Offline records carry their own expiry; the general expiry is the
    /// fallback.
    pub fn offline_live_at(&self, now: DateTime<Utc>) -> bool {
        if self.is_revoked || self.token_type != TokenRecordType::Offline {
            return false;
        }
        match self.offline_expires_at {
            Some(offline_expiry) => offline_expiry > now,
            None => self.expires_at > now,
        }
    }
}

/// Which records a device-wide revocation touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRevocationScope {
    All,
    Only(TokenRecordType),
}

#[async_trait]
pub trait TokenRecordRepository: Send + Sync {
    async fn insert(&self, record: &TokenRecord) -> Result<()>;

    async fn find_by_id(&self, token_id: Uuid) -> Result<Option<TokenRecord>>;

    /// Live JWT family whose access hash is one of `hashes`.
    async fn find_live_access(
        &self,
        token_id: Uuid,
        hashes: &[String],
        now: DateTime<Utc>,
    ) -> Result<Option<TokenRecord>>;

    /// Live JWT family whose refresh hash is one of `hashes`.
    async fn find_live_refresh(
        &self,
        token_id: Uuid,
        hashes: &[String],
        now: DateTime<Utc>,
    ) -> Result<Option<TokenRecord>>;

    /// Live offline record whose offline (or token) hash is one of `hashes`.
    async fn find_live_offline(
        &self,
        hashes: &[String],
        now: DateTime<Utc>,
    ) -> Result<Option<TokenRecord>>;

    async fn touch_last_used(
        &self,
        token_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Each revoke returns the number of records newly revoked; already
    /// revoked records are left untouched.
    async fn revoke(
        &self,
        token_id: Uuid,
        reason: RevocationReason,
    ) -> Result<u64>;

    async fn revoke_for_user(
        &self,
        user_id: Uuid,
        reason: RevocationReason,
    ) -> Result<u64>;

    async fn revoke_for_device(
        &self,
        user_id: Uuid,
        device_id: &str,
        scope: DeviceRevocationScope,
        reason: RevocationReason,
    ) -> Result<u64>;
}

#[async_trait]
pub trait UserSessionRepository: Send + Sync {
    async fn insert(&self, session: &UserSession) -> Result<()>;

    async fn find_by_id(&self, session_id: Uuid) -> Result<Option<UserSession>>;

    async fn find_active_by_token_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserSession>>;

    async fn touch(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<()>;

    /// Point active sessions holding `old_hash` at the refreshed family.
    /// Returns the number of sessions updated.
    async fn rotate_refresh_hash(
        &self,
        old_hash: &str,
        new_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<u64>;

    /// Deactivate the user's sessions bound to `device_id`, matching either
    /// the stored device id or the session id itself.
    async fn deactivate_for_device(
        &self,
        user_id: Uuid,
        device_id: &str,
        reason: RevocationReason,
    ) -> Result<u64>;
}
