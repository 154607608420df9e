use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::crypto::AuthCrypto;
use crate::auth::domain::aggregates::{DeviceBinding, VerifiedUser};
use crate::auth::domain::repositories::UserAccountRepository;
use crate::auth::error::{AuthError, AuthResult};

/// Checks identifier + secret pairs against stored accounts.
pub struct CredentialVerifier {
    users: Arc<dyn UserAccountRepository>,
    crypto: Arc<AuthCrypto>,
}

impl fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("user_repo_refs", &Arc::strong_count(&self.users))
            .field("crypto_refs", &Arc::strong_count(&self.crypto))
            .finish()
    }
}

impl CredentialVerifier {
    pub fn new(
        users: Arc<dyn UserAccountRepository>,
        crypto: Arc<AuthCrypto>,
    ) -> Self {
        Self { users, crypto }
    }

    /// Password login. Unknown, inactive, and wrong-password cases all end
    /// in [`AuthError::InvalidCredentials`].
    pub async fn verify(
        &self,
        identifier: &str,
        password: &str,
    ) -> AuthResult<VerifiedUser> {
        let identifier = identifier.trim();
        if identifier.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let Some(account) = self.users.find_by_identifier(identifier).await?
        else {
            self.crypto.verify_dummy(password);
            debug!(target: "agrinova::auth", "login for unknown identifier");
            return Err(AuthError::InvalidCredentials);
        };

        let password_ok =
            self.crypto.verify_password(password, &account.password_hash);
        if !password_ok || !account.can_authenticate() {
            info!(
                target: "agrinova::auth",
                user_id = %account.id,
                active = account.can_authenticate(),
                "credential check failed"
            );
            return Err(AuthError::InvalidCredentials);
        }

        let grants = self.users.load_assignments(account.id).await?;
        Ok(VerifiedUser {
            grants: grants.effective_grants(),
            account,
        })
    }

    /// Biometric login against the binding of the device presenting it.
    pub async fn verify_biometric(
        &self,
        identifier: &str,
        biometric_token: &str,
        binding: Option<&DeviceBinding>,
    ) -> AuthResult<VerifiedUser> {
        let Some(account) =
            self.users.find_by_identifier(identifier.trim()).await?
        else {
            return Err(AuthError::InvalidCredentials);
        };
        if !account.can_authenticate() {
            return Err(AuthError::InvalidCredentials);
        }

        let stored = binding
            .filter(|b| b.user_id() == account.id && b.is_live())
            .and_then(|b| b.biometric_hash());
        let presented = self.crypto.hash_token(biometric_token);
        match stored {
            Some(stored) if AuthCrypto::secure_eq(stored, &presented) => {}
            _ => return Err(AuthError::InvalidCredentials),
        }

        let grants = self.users.load_assignments(account.id).await?;
        Ok(VerifiedUser {
            grants: grants.effective_grants(),
            account,
        })
    }

    /// Re-read an account for a token-authenticated request.
    ///
    /// A valid token does not vouch for the account behind it, so inactive
    /// or deleted accounts fail here with [`AuthError::AccountInactive`].
    pub async fn reload(&self, user_id: Uuid) -> AuthResult<VerifiedUser> {
        let account = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::AccountInactive)?;
        if !account.can_authenticate() {
            return Err(AuthError::AccountInactive);
        }
        let grants = self.users.load_assignments(account.id).await?;
        Ok(VerifiedUser {
            grants: grants.effective_grants(),
            account,
        })
    }
}
