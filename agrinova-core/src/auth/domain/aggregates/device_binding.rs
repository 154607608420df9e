use agrinova_model::{DeviceInfo, Platform};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::domain::value_objects::{DeviceFingerprint, DeviceId};

/// Trust relationship between a user and one physical device.
///
/// A binding is live until `revoked_at` is set. Revoked bindings are never
/// reactivated; binding the same device again creates a new row.
#[derive(Debug, Clone)]
pub struct DeviceBinding {
    id: Uuid,
    user_id: Uuid,
    device_id: DeviceId,
    fingerprint: DeviceFingerprint,
    platform: Platform,
    device_info: DeviceInfo,
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

/// Everything the caller supplies when binding a device.
#[derive(Debug, Clone)]
pub struct NewDeviceBinding {
    pub user_id: Uuid,
    pub device_id: DeviceId,
    pub fingerprint: DeviceFingerprint,
    pub platform: Platform,
    pub device_info: DeviceInfo,
    pub biometric_hash: Option<String>,
}

impl DeviceBinding {
    pub fn new(request: NewDeviceBinding, trusted: bool, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: request.user_id,
            device_id: request.device_id,
            fingerprint: request.fingerprint,
            platform: request.platform,
            device_info: request.device_info,
            biometric_hash: request.biometric_hash,
            is_trusted: trusted,
            is_authorized: trusted,
            last_seen_at: Some(now),
            authorized_by: None,
            authorized_at: trusted.then_some(now),
            revoked_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild from storage.
    #[allow(clippy::too_many_arguments)]
    pub fn hydrate(
        id: Uuid,
        user_id: Uuid,
        device_id: DeviceId,
        fingerprint: DeviceFingerprint,
        platform: Platform,
        device_info: DeviceInfo,
        biometric_hash: Option<String>,
        is_trusted: bool,
        is_authorized: bool,
        last_seen_at: Option<DateTime<Utc>>,
        authorized_by: Option<Uuid>,
        authorized_at: Option<DateTime<Utc>>,
        revoked_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            device_id,
            fingerprint,
            platform,
            device_info,
            biometric_hash,
            is_trusted,
            is_authorized,
            last_seen_at,
            authorized_by,
            authorized_at,
            revoked_at,
            created_at,
            updated_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub fn fingerprint(&self) -> &DeviceFingerprint {
        &self.fingerprint
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    pub fn biometric_hash(&self) -> Option<&str> {
        self.biometric_hash.as_deref()
    }

    pub fn is_trusted(&self) -> bool {
        self.is_trusted
    }

    pub fn is_authorized(&self) -> bool {
        self.is_authorized
    }

    pub fn last_seen_at(&self) -> Option<DateTime<Utc>> {
        self.last_seen_at
    }

    pub fn authorized_by(&self) -> Option<Uuid> {
        self.authorized_by
    }

    pub fn authorized_at(&self) -> Option<DateTime<Utc>> {
        self.authorized_at
    }

    pub fn revoked_at(&self) -> Option<DateTime<Utc>> {
        self.revoked_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_live(&self) -> bool {
        self.revoked_at.is_none()
    }

    /// Mobile tokens may only be issued against a live, trusted, authorized
    /// binding.
    pub fn can_issue_tokens(&self) -> bool {
        self.is_live() && self.is_trusted && self.is_authorized
    }

    pub fn fingerprint_matches(&self, candidate: &DeviceFingerprint) -> bool {
        self.fingerprint.matches(candidate)
    }

    pub fn authorize(&mut self, by: Option<Uuid>, now: DateTime<Utc>) {
        self.is_authorized = true;
        self.authorized_by = by;
        self.authorized_at = Some(now);
        self.updated_at = now;
    }

    pub fn trust(&mut self, now: DateTime<Utc>) {
        self.is_trusted = true;
        self.updated_at = now;
    }

    pub fn revoke(&mut self, now: DateTime<Utc>) {
        if self.revoked_at.is_none() {
            self.revoked_at = Some(now);
        }
        self.is_authorized = false;
        self.updated_at = now;
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_seen_at = Some(now);
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> NewDeviceBinding {
        NewDeviceBinding {
            user_id: Uuid::now_v7(),
            device_id: DeviceId::parse("device-1").unwrap(),
            fingerprint: DeviceFingerprint::new("fp-1").unwrap(),
            platform: Platform::Android,
            device_info: DeviceInfo::default(),
            biometric_hash: None,
        }
    }

    #[test]
    fn untrusted_binding_cannot_issue_until_both_flags_set() {
        let now = Utc::now();
        let mut binding = DeviceBinding::new(request(), false, now);
        assert!(!binding.can_issue_tokens());

        binding.authorize(None, now);
        assert!(!binding.can_issue_tokens());

        binding.trust(now);
        assert!(binding.can_issue_tokens());
    }

    #[test]
    fn revoke_is_sticky() {
        let now = Utc::now();
        let mut binding = DeviceBinding::new(request(), true, now);
        binding.revoke(now);
        let first = binding.revoked_at();

        binding.authorize(None, now + chrono::Duration::seconds(5));
        binding.revoke(now + chrono::Duration::seconds(10));

        assert_eq!(binding.revoked_at(), first);
        assert!(!binding.can_issue_tokens());
    }
}
