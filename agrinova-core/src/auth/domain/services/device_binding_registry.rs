use std::fmt;
use std::sync::Arc;

use agrinova_model::DeviceTrustPolicy;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::domain::aggregates::{DeviceBinding, NewDeviceBinding};
use crate::auth::domain::repositories::DeviceBindingRepository;
use crate::auth::domain::value_objects::{DeviceFingerprint, DeviceId};
use crate::auth::error::{AuthError, AuthResult};

/// Tracks which devices may receive mobile tokens for which user.
pub struct DeviceBindingRegistry {
    bindings: Arc<dyn DeviceBindingRepository>,
    policy: DeviceTrustPolicy,
}

impl fmt::Debug for DeviceBindingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBindingRegistry")
            .field("policy", &self.policy)
            .field("binding_repo_refs", &Arc::strong_count(&self.bindings))
            .finish()
    }
}

impl DeviceBindingRegistry {
    pub fn new(
        bindings: Arc<dyn DeviceBindingRepository>,
        policy: DeviceTrustPolicy,
    ) -> Self {
        Self { bindings, policy }
    }

    pub fn policy(&self) -> DeviceTrustPolicy {
        self.policy
    }

    /// Bind a device to a user, or return the existing binding when the same
    /// user re-binds with the same fingerprint.
    ///
    /// A stored fingerprint is never overwritten.
    pub async fn bind(
        &self,
        request: NewDeviceBinding,
    ) -> AuthResult<DeviceBinding> {
        if let Some(existing) =
            self.bindings.find_live_by_device(&request.device_id).await?
        {
            return self.resolve_rebind(existing, &request).await;
        }

        let trusted = match self.policy {
            DeviceTrustPolicy::Manual => false,
            DeviceTrustPolicy::TrustAll => true,
            DeviceTrustPolicy::TrustFirstDevice => {
                self.bindings.count_for_user(request.user_id).await? == 0
            }
        };

        let binding = DeviceBinding::new(request, trusted, Utc::now());
        if !self.bindings.insert(&binding).await? {
            // Lost a race with a concurrent bind of the same device.
            return Err(AuthError::DeviceAlreadyBound);
        }

        info!(
            target: "agrinova::auth",
            user_id = %binding.user_id(),
            device_id = %binding.device_id(),
            platform = %binding.platform(),
            trusted,
            "device bound"
        );
        Ok(binding)
    }

    async fn resolve_rebind(
        &self,
        existing: DeviceBinding,
        request: &NewDeviceBinding,
    ) -> AuthResult<DeviceBinding> {
        if existing.user_id() != request.user_id {
            warn!(
                target: "agrinova::auth",
                device_id = %request.device_id,
                requested_by = %request.user_id,
                "device already bound to another user"
            );
            return Err(AuthError::DeviceAlreadyBound);
        }

        if existing.fingerprint_matches(&request.fingerprint) {
            self.touch(&existing).await;
            return Ok(existing);
        }

        warn!(
            target: "agrinova::auth",
            user_id = %request.user_id,
            device_id = %request.device_id,
            suspicious = true,
            "device fingerprint differs from bound fingerprint"
        );
        if existing.is_authorized() {
            Err(AuthError::DeviceFingerprintMismatch)
        } else {
            Err(AuthError::DeviceAlreadyBound)
        }
    }

    pub async fn get_binding(
        &self,
        device_id: &DeviceId,
    ) -> AuthResult<Option<DeviceBinding>> {
        Ok(self.bindings.find_live_by_device(device_id).await?)
    }

    /// Revoke the live binding of a device. Returns the revoked binding, or
    /// `None` when the device had none.
    pub(crate) async fn unbind(
        &self,
        device_id: &DeviceId,
    ) -> AuthResult<Option<DeviceBinding>> {
        let Some(mut binding) =
            self.bindings.find_live_by_device(device_id).await?
        else {
            return Ok(None);
        };
        binding.revoke(Utc::now());
        self.bindings.save(&binding).await?;
        info!(
            target: "agrinova::auth",
            user_id = %binding.user_id(),
            device_id = %device_id,
            "device unbound"
        );
        Ok(Some(binding))
    }

    /// Administrative approval of a pending binding.
    pub async fn authorize(
        &self,
        device_id: &DeviceId,
        authorized_by: Option<Uuid>,
    ) -> AuthResult<DeviceBinding> {
        let mut binding = self
            .bindings
            .find_live_by_device(device_id)
            .await?
            .ok_or(AuthError::DeviceNotFound)?;
        binding.authorize(authorized_by, Utc::now());
        self.bindings.save(&binding).await?;
        Ok(binding)
    }

    pub async fn trust(&self, device_id: &DeviceId) -> AuthResult<DeviceBinding> {
        let mut binding = self
            .bindings
            .find_live_by_device(device_id)
            .await?
            .ok_or(AuthError::DeviceNotFound)?;
        binding.trust(Utc::now());
        self.bindings.save(&binding).await?;
        Ok(binding)
    }

    /// Authorize and trust a live binding in one write.
    pub async fn approve(
        &self,
        device_id: &DeviceId,
        approved_by: Uuid,
    ) -> AuthResult<DeviceBinding> {
        let mut binding = self
            .bindings
            .find_live_by_device(device_id)
            .await?
            .ok_or(AuthError::DeviceNotFound)?;
        let now = Utc::now();
        binding.authorize(Some(approved_by), now);
        binding.trust(now);
        self.bindings.save(&binding).await?;
        info!(
            target: "agrinova::auth",
            user_id = %binding.user_id(),
            device_id = %device_id,
            %approved_by,
            "device approved"
        );
        Ok(binding)
    }

    /// Gate for mobile token issuance on an already-bound device.
    pub async fn require_authorized(
        &self,
        user_id: Uuid,
        device_id: &DeviceId,
        fingerprint: Option<&DeviceFingerprint>,
    ) -> AuthResult<DeviceBinding> {
        let binding = self
            .bindings
            .find_live_by_device(device_id)
            .await?
            .ok_or(AuthError::DeviceNotFound)?;

        if binding.user_id() != user_id {
            return Err(AuthError::DeviceNotAuthorized);
        }
        if let Some(fingerprint) = fingerprint
            && !binding.fingerprint_matches(fingerprint)
        {
            warn!(
                target: "agrinova::auth",
                user_id = %user_id,
                device_id = %device_id,
                suspicious = true,
                "fingerprint mismatch on bound device"
            );
            return Err(AuthError::DeviceFingerprintMismatch);
        }
        if !binding.can_issue_tokens() {
            return Err(AuthError::DeviceNotAuthorized);
        }
        Ok(binding)
    }

    /// Best-effort last-seen update.
    pub async fn touch(&self, binding: &DeviceBinding) {
        if let Err(err) = self.bindings.touch(binding.id(), Utc::now()).await {
            warn!(
                target: "agrinova::auth",
                binding_id = %binding.id(),
                error = %err,
                "failed to update device last-seen"
            );
        }
    }
}
