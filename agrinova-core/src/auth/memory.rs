//! In-memory repository adapters for unit tests and the server test suite.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::AuthRepositories;
use super::crypto::AuthCrypto;
use super::domain::aggregates::{
    AssignmentSnapshot, CompanyAssignment, DeviceBinding, DivisionAssignment,
    EstateAssignment, UserAccount, UserSession,
};
use super::domain::repositories::{
    DeviceBindingRepository, DeviceRevocationScope, TokenRecord,
    TokenRecordRepository, UserAccountRepository, UserSessionRepository,
};
use super::domain::value_objects::{DeviceId, RevocationReason};
use agrinova_model::{Role, ScopeGrants, TokenRecordType};

#[derive(Clone, Debug, Default)]
pub struct InMemoryUserAccountRepository {
    accounts: Arc<Mutex<HashMap<Uuid, UserAccount>>>,
    assignments: Arc<Mutex<HashMap<Uuid, AssignmentSnapshot>>>,
}

impl InMemoryUserAccountRepository {
    pub async fn insert(&self, account: UserAccount, assignments: AssignmentSnapshot) {
        self.assignments.lock().await.insert(account.id, assignments);
        self.accounts.lock().await.insert(account.id, account);
    }

    pub async fn set_active(&self, user_id: Uuid, active: bool) -> Result<()> {
        let mut guard = self.accounts.lock().await;
        let account = guard
            .get_mut(&user_id)
            .ok_or_else(|| anyhow!("unknown user {user_id}"))?;
        account.is_active = active;
        account.updated_at = Utc::now();
        Ok(())
    }

    pub async fn set_assignments(&self, user_id: Uuid, assignments: AssignmentSnapshot) {
        self.assignments.lock().await.insert(user_id, assignments);
    }
}

#[async_trait]
impl UserAccountRepository for InMemoryUserAccountRepository {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<UserAccount>> {
        let guard = self.accounts.lock().await;
        Ok(guard
            .values()
            .find(|account| {
                account.username.eq_ignore_ascii_case(identifier)
                    || account
                        .email
                        .as_deref()
                        .is_some_and(|email| email.eq_ignore_ascii_case(identifier))
                    || account.phone.as_deref() == Some(identifier)
            })
            .cloned())
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserAccount>> {
        Ok(self.accounts.lock().await.get(&user_id).cloned())
    }

    async fn load_assignments(&self, user_id: Uuid) -> Result<AssignmentSnapshot> {
        Ok(self
            .assignments
            .lock()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryDeviceBindingRepository {
    bindings: Arc<Mutex<Vec<DeviceBinding>>>,
}

impl InMemoryDeviceBindingRepository {
    /// Every row ever written, revoked ones included.
    pub async fn all(&self) -> Vec<DeviceBinding> {
        self.bindings.lock().await.clone()
    }
}

#[async_trait]
impl DeviceBindingRepository for InMemoryDeviceBindingRepository {
    async fn find_live_by_device(&self, device_id: &DeviceId) -> Result<Option<DeviceBinding>> {
        let guard = self.bindings.lock().await;
        Ok(guard
            .iter()
            .find(|b| b.is_live() && b.device_id() == device_id)
            .cloned())
    }

    async fn count_for_user(&self, user_id: Uuid) -> Result<u64> {
        let guard = self.bindings.lock().await;
        Ok(guard.iter().filter(|b| b.user_id() == user_id).count() as u64)
    }

    async fn insert(&self, binding: &DeviceBinding) -> Result<bool> {
        let mut guard = self.bindings.lock().await;
        if guard
            .iter()
            .any(|b| b.is_live() && b.device_id() == binding.device_id())
        {
            return Ok(false);
        }
        guard.push(binding.clone());
        Ok(true)
    }

    async fn save(&self, binding: &DeviceBinding) -> Result<()> {
        let mut guard = self.bindings.lock().await;
        let slot = guard
            .iter_mut()
            .find(|b| b.id() == binding.id())
            .ok_or_else(|| anyhow!("unknown device binding {}", binding.id()))?;
        *slot = binding.clone();
        Ok(())
    }

    async fn touch(&self, binding_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut guard = self.bindings.lock().await;
        if let Some(binding) = guard.iter_mut().find(|b| b.id() == binding_id) {
            binding.touch(at);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryTokenRecordRepository {
    records: Arc<Mutex<HashMap<Uuid, TokenRecord>>>,
}

impl InMemoryTokenRecordRepository {
    pub async fn all(&self) -> Vec<TokenRecord> {
        self.records.lock().await.values().cloned().collect()
    }

    /// Rewrite a stored record; lets tests age or re-hash tokens.
    pub async fn update<F>(&self, token_id: Uuid, f: F) -> Result<()>
    where
        F: FnOnce(&mut TokenRecord) + Send,
    {
        let mut guard = self.records.lock().await;
        let record = guard
            .get_mut(&token_id)
            .ok_or_else(|| anyhow!("unknown token record {token_id}"))?;
        f(record);
        Ok(())
    }

    fn revoke_where<P>(
        records: &mut HashMap<Uuid, TokenRecord>,
        reason: RevocationReason,
        predicate: P,
    ) -> u64
    where
        P: Fn(&TokenRecord) -> bool,
    {
        let now = Utc::now();
        let mut revoked = 0;
        for record in records.values_mut() {
            if record.is_revoked || !predicate(record) {
                continue;
            }
            record.is_revoked = true;
            record.revoked_at = Some(now);
            record
                .revoked_reason
                .get_or_insert_with(|| reason.as_str().to_string());
            record.updated_at = now;
            revoked += 1;
        }
        revoked
    }
}

#[async_trait]
impl TokenRecordRepository for InMemoryTokenRecordRepository {
    async fn insert(&self, record: &TokenRecord) -> Result<()> {
        let mut guard = self.records.lock().await;
        if guard.contains_key(&record.id) {
            return Err(anyhow!("duplicate token record {}", record.id));
        }
        guard.insert(record.id, record.clone());
        Ok(())
    }

    async fn find_by_id(&self, token_id: Uuid) -> Result<Option<TokenRecord>> {
        Ok(self.records.lock().await.get(&token_id).cloned())
    }

    async fn find_live_access(
        &self,
        token_id: Uuid,
        hashes: &[String],
        now: DateTime<Utc>,
    ) -> Result<Option<TokenRecord>> {
        let guard = self.records.lock().await;
        Ok(guard
            .get(&token_id)
            .filter(|r| {
                !r.is_revoked
                    && r.token_type == TokenRecordType::Jwt
                    && hashes.contains(&r.token_hash)
                    && r.expires_at > now
            })
            .cloned())
    }

    async fn find_live_refresh(
        &self,
        token_id: Uuid,
        hashes: &[String],
        now: DateTime<Utc>,
    ) -> Result<Option<TokenRecord>> {
        let guard = self.records.lock().await;
        Ok(guard
            .get(&token_id)
            .filter(|r| {
                !r.is_revoked
                    && r.token_type == TokenRecordType::Jwt
                    && r.refresh_hash.as_ref().is_some_and(|h| hashes.contains(h))
                    && r.refresh_expires_at.unwrap_or(r.expires_at) > now
            })
            .cloned())
    }

    async fn find_live_offline(
        &self,
        hashes: &[String],
        now: DateTime<Utc>,
    ) -> Result<Option<TokenRecord>> {
        let guard = self.records.lock().await;
        Ok(guard
            .values()
            .find(|r| {
                let hash_hit = r.offline_hash.as_ref().is_some_and(|h| hashes.contains(h))
                    || hashes.contains(&r.token_hash);
                hash_hit && r.offline_live_at(now)
            })
            .cloned())
    }

    async fn touch_last_used(&self, token_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        if let Some(record) = self.records.lock().await.get_mut(&token_id) {
            record.last_used_at = Some(at);
        }
        Ok(())
    }

    async fn revoke(&self, token_id: Uuid, reason: RevocationReason) -> Result<u64> {
        let mut guard = self.records.lock().await;
        Ok(Self::revoke_where(&mut guard, reason, |r| r.id == token_id))
    }

    async fn revoke_for_user(&self, user_id: Uuid, reason: RevocationReason) -> Result<u64> {
        let mut guard = self.records.lock().await;
        Ok(Self::revoke_where(&mut guard, reason, |r| r.user_id == user_id))
    }

    async fn revoke_for_device(
        &self,
        user_id: Uuid,
        device_id: &str,
        scope: DeviceRevocationScope,
        reason: RevocationReason,
    ) -> Result<u64> {
        let mut guard = self.records.lock().await;
        Ok(Self::revoke_where(&mut guard, reason, |r| {
            let in_scope = match scope {
                DeviceRevocationScope::All => true,
                DeviceRevocationScope::Only(kind) => r.token_type == kind,
            };
            r.user_id == user_id && r.device_id == device_id && in_scope
        }))
    }
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryUserSessionRepository {
    sessions: Arc<Mutex<HashMap<Uuid, UserSession>>>,
}

impl InMemoryUserSessionRepository {
    pub async fn all(&self) -> Vec<UserSession> {
        self.sessions.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl UserSessionRepository for InMemoryUserSessionRepository {
    async fn insert(&self, session: &UserSession) -> Result<()> {
        self.sessions.lock().await.insert(session.id, session.clone());
        Ok(())
    }

    async fn find_by_id(&self, session_id: Uuid) -> Result<Option<UserSession>> {
        Ok(self.sessions.lock().await.get(&session_id).cloned())
    }

    async fn find_active_by_token_hash(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserSession>> {
        let guard = self.sessions.lock().await;
        Ok(guard
            .values()
            .find(|s| s.session_token_hash == token_hash && s.is_live(now))
            .cloned())
    }

    async fn touch(&self, session_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        if let Some(session) = self.sessions.lock().await.get_mut(&session_id) {
            session.last_activity = at;
        }
        Ok(())
    }

    async fn rotate_refresh_hash(
        &self,
        old_hash: &str,
        new_hash: &str,
        at: DateTime<Utc>,
    ) -> Result<u64> {
        let mut rotated = 0;
        for session in self.sessions.lock().await.values_mut() {
            if session.is_active
                && session.refresh_token_hash.as_deref() == Some(old_hash)
            {
                session.refresh_token_hash = Some(new_hash.to_string());
                session.last_activity = at;
                rotated += 1;
            }
        }
        Ok(rotated)
    }

    async fn deactivate_for_device(
        &self,
        user_id: Uuid,
        device_id: &str,
        reason: RevocationReason,
    ) -> Result<u64> {
        let now = Utc::now();
        let mut closed = 0;
        for session in self.sessions.lock().await.values_mut() {
            let same_device = session.device_id.as_deref() == Some(device_id)
                || session.id.to_string() == device_id;
            if session.user_id != user_id || !session.is_active || !same_device {
                continue;
            }
            session.is_active = false;
            session.revoked_at = Some(now);
            session.revoked_reason = Some(reason.as_str().to_string());
            closed += 1;
        }
        Ok(closed)
    }
}

/// One of each in-memory repository, sharing nothing with other stores.
#[derive(Clone, Debug, Default)]
pub struct InMemoryAuthStore {
    pub users: InMemoryUserAccountRepository,
    pub devices: InMemoryDeviceBindingRepository,
    pub tokens: InMemoryTokenRecordRepository,
    pub sessions: InMemoryUserSessionRepository,
}

impl InMemoryAuthStore {
    pub fn repositories(&self) -> AuthRepositories {
        AuthRepositories {
            users: Arc::new(self.users.clone()),
            devices: Arc::new(self.devices.clone()),
            tokens: Arc::new(self.tokens.clone()),
            sessions: Arc::new(self.sessions.clone()),
        }
    }
}

impl InMemoryAuthStore {
    /// Seed an active account. Estates hang off the first company and
    /// divisions off the first estate.
    pub async fn seed_user(
        &self,
        crypto: &AuthCrypto,
        username: &str,
        password: &str,
        role: Role,
        grants: &ScopeGrants,
    ) -> Result<Uuid> {
        let now = Utc::now();
        let account = UserAccount {
            id: Uuid::now_v7(),
            username: username.to_string(),
            display_name: username.to_string(),
            email: Some(format!("{username}@agrinova.test")),
            phone: None,
            password_hash: crypto.hash_password(password)?,
            role,
            is_active: true,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        let company = grants.company_ids.first().copied().unwrap_or_default();
        let estate = grants.estate_ids.first().copied().unwrap_or_default();
        let assignments = AssignmentSnapshot {
            companies: grants
                .company_ids
                .iter()
                .map(|&company_id| CompanyAssignment {
                    company_id,
                    is_active: true,
                })
                .collect(),
            estates: grants
                .estate_ids
                .iter()
                .map(|&estate_id| EstateAssignment {
                    estate_id,
                    company_id: company,
                    is_active: true,
                })
                .collect(),
            divisions: grants
                .division_ids
                .iter()
                .map(|&division_id| DivisionAssignment {
                    division_id,
                    estate_id: estate,
                    is_active: true,
                })
                .collect(),
        };
        let id = account.id;
        self.users.insert(account, assignments).await;
        Ok(id)
    }
}
