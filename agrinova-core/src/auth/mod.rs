//! Credential verification, device binding, and token lifecycle.
//!
//! Services are storage-agnostic and talk to persistence through the
//! repository ports in [`domain::repositories`]. Postgres adapters live in
//! `infrastructure` (feature `database`); in-memory adapters for tests live
//! in `memory` (feature `test-utils`).

pub mod crypto;
pub mod domain;
pub mod error;
#[cfg(feature = "database")]
pub mod infrastructure;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod rate_limit;

use std::sync::Arc;

use agrinova_model::{DeviceTrustPolicy, RateLimitRule};

pub use crypto::{AuthCrypto, AuthCryptoError};
pub use domain::aggregates::DeviceBinding;
pub use domain::claims::{
    AccessClaims, OfflineToken, RefreshClaims, TokenPair, ValidatedToken,
};
pub use domain::services::{
    AuthOrchestrator, AuthenticatedRequest, CredentialVerifier,
    DeviceBindingRegistry, IssuedSession, LoginRequest, LoginResponse,
    LogoutOutcome, OrchestratorConfig, SessionValidation, TokenConfig,
    TokenRefresh, TokenService,
};
pub use error::{AuthError, AuthResult};
pub use rate_limit::{InMemoryRateLimiter, LoginThrottle, RateLimiter};

use crate::rls::ScopeResolver;
use domain::repositories::{
    DeviceBindingRepository, TokenRecordRepository, UserAccountRepository,
    UserSessionRepository,
};

/// The four stores the auth services need.
#[derive(Clone)]
pub struct AuthRepositories {
    pub users: Arc<dyn UserAccountRepository>,
    pub devices: Arc<dyn DeviceBindingRepository>,
    pub tokens: Arc<dyn TokenRecordRepository>,
    pub sessions: Arc<dyn UserSessionRepository>,
}

impl std::fmt::Debug for AuthRepositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthRepositories").finish_non_exhaustive()
    }
}

/// Everything needed to wire an [`AuthOrchestrator`] besides storage.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub tokens: TokenConfig,
    pub orchestrator: OrchestratorConfig,
    pub device_trust: DeviceTrustPolicy,
    /// Failed-login budget per client address and identifier.
    pub login_limit: RateLimitRule,
}

#[cfg(any(test, feature = "test-utils"))]
impl AuthSettings {
    /// Distinct throwaway secrets, short TTLs, legacy hashes disabled.
    pub fn for_tests() -> Self {
        use chrono::Duration;
        use zeroize::Zeroizing;

        Self {
            tokens: TokenConfig {
                access_secret: Zeroizing::new("test-access-secret".to_string()),
                refresh_secret: Zeroizing::new("test-refresh-secret".to_string()),
                issuer: "agrinova-test".to_string(),
                access_ttl: Duration::minutes(15),
                refresh_ttl: Duration::days(7),
                offline_ttl: Duration::days(30),
                leeway_secs: 0,
                legacy_hash_cutover: None,
            },
            orchestrator: OrchestratorConfig::default(),
            device_trust: DeviceTrustPolicy::TrustFirstDevice,
            login_limit: RateLimitRule::login(5, std::time::Duration::from_secs(300)),
        }
    }
}

/// Wire the services over a set of repositories. Login attempts are
/// counted in process memory.
pub fn build_orchestrator(
    repos: AuthRepositories,
    crypto: Arc<AuthCrypto>,
    settings: AuthSettings,
) -> AuthOrchestrator {
    let verifier =
        Arc::new(CredentialVerifier::new(repos.users.clone(), crypto.clone()));
    let devices = Arc::new(DeviceBindingRegistry::new(
        repos.devices,
        settings.device_trust,
    ));
    let tokens = Arc::new(TokenService::new(
        repos.tokens,
        crypto.clone(),
        settings.tokens,
    ));
    let scopes = Arc::new(ScopeResolver::new(repos.users));

    AuthOrchestrator::new(
        verifier,
        devices,
        tokens,
        repos.sessions,
        scopes,
        crypto,
        LoginThrottle::new(
            Arc::new(InMemoryRateLimiter::new()),
            settings.login_limit,
        ),
        settings.orchestrator,
    )
}
