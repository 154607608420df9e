use std::fmt;
use std::sync::Arc;

use agrinova_model::{
    DeviceInfo, LoginMethod, Platform, RateLimitKey, RefreshRotation,
    ScopeLevel, UserProfile,
};
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::credential_verifier::CredentialVerifier;
use super::device_binding_registry::DeviceBindingRegistry;
use super::token_service::TokenService;
use crate::auth::crypto::AuthCrypto;
use crate::auth::domain::aggregates::{
    DeviceBinding, NewDeviceBinding, SessionSecurityFlags, UserSession,
    VerifiedUser,
};
use crate::auth::domain::claims::{OfflineToken, TokenPair, ValidatedToken};
use crate::auth::domain::repositories::UserSessionRepository;
use crate::auth::domain::value_objects::{
    DeviceFingerprint, DeviceId, RevocationReason,
};
use crate::auth::error::{AuthError, AuthResult};
use crate::auth::rate_limit::LoginThrottle;
use crate::rls::{RlsContext, ScopeResolver};

/// Session lifetimes and rotation policy for the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    pub session_ttl: Duration,
    pub remember_me_ttl: Duration,
    pub refresh_rotation: RefreshRotation,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::hours(24),
            remember_me_ttl: Duration::days(30),
            refresh_rotation: RefreshRotation::default(),
        }
    }
}

/// A login attempt as received from the API layer.
#[derive(Clone, Default)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
    pub platform: Platform,
    pub device_id: Option<String>,
    pub device_fingerprint: Option<String>,
    pub device_info: Option<DeviceInfo>,
    /// Mobile only. Used instead of the password when the password is
    /// empty; enrolled on first bind otherwise.
    pub biometric_token: Option<String>,
    pub remember_me: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("identifier", &self.identifier)
            .field("platform", &self.platform)
            .field("device_id", &self.device_id)
            .field("remember_me", &self.remember_me)
            .finish_non_exhaustive()
    }
}

/// Opaque web session handle. The plaintext token only exists here.
#[derive(Clone)]
pub struct IssuedSession {
    pub session_id: Uuid,
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for IssuedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedSession")
            .field("session_id", &self.session_id)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub tokens: TokenPair,
    /// Mobile logins only.
    pub offline_token: Option<OfflineToken>,
    /// Web logins only.
    pub session: Option<IssuedSession>,
    pub device: Option<DeviceBinding>,
    pub user: UserProfile,
}

/// Result of a refresh or a device renewal.
#[derive(Debug, Clone)]
pub struct TokenRefresh {
    pub tokens: TokenPair,
    pub user: UserProfile,
}

/// An active web session and the account behind it.
#[derive(Debug, Clone)]
pub struct SessionValidation {
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogoutOutcome {
    pub tokens_revoked: u64,
    pub sessions_closed: u64,
}

/// A request that passed bearer authentication.
#[derive(Debug, Clone)]
pub struct AuthenticatedRequest {
    pub token: ValidatedToken,
    pub context: RlsContext,
}

/// Composes the verifier, the device registry, the token service, and the
/// scope resolver into the login / refresh / renew / logout flows.
pub struct AuthOrchestrator {
    verifier: Arc<CredentialVerifier>,
    devices: Arc<DeviceBindingRegistry>,
    tokens: Arc<TokenService>,
    sessions: Arc<dyn UserSessionRepository>,
    scopes: Arc<ScopeResolver>,
    crypto: Arc<AuthCrypto>,
    throttle: LoginThrottle,
    config: OrchestratorConfig,
}

impl fmt::Debug for AuthOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthOrchestrator")
            .field("devices", &self.devices)
            .field("tokens", &self.tokens)
            .field("session_repo_refs", &Arc::strong_count(&self.sessions))
            .field("throttle", &self.throttle)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AuthOrchestrator {
    pub fn new(
        verifier: Arc<CredentialVerifier>,
        devices: Arc<DeviceBindingRegistry>,
        tokens: Arc<TokenService>,
        sessions: Arc<dyn UserSessionRepository>,
        scopes: Arc<ScopeResolver>,
        crypto: Arc<AuthCrypto>,
        throttle: LoginThrottle,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            verifier,
            devices,
            tokens,
            sessions,
            scopes,
            crypto,
            throttle,
            config,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn devices(&self) -> &DeviceBindingRegistry {
        &self.devices
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Failed credentials spend the caller's attempt budget, keyed by client
    /// address and identifier; a success clears it.
    pub async fn login(&self, request: LoginRequest) -> AuthResult<LoginResponse> {
        let limit_key = RateLimitKey::login(
            request.ip_address.as_deref(),
            &request.identifier,
        );
        let result = self.throttled_login(&request, &limit_key).await;

        match &result {
            Ok(response) => info!(
                target: "agrinova::auth",
                user_id = %response.user.id,
                platform = %request.platform,
                token_id = %response.tokens.token_id,
                "login succeeded"
            ),
            Err(err) if err.is_internal() => warn!(
                target: "agrinova::auth",
                platform = %request.platform,
                error = %err,
                "login failed on an internal error"
            ),
            Err(err) => info!(
                target: "agrinova::auth",
                platform = %request.platform,
                reason = %err,
                "login rejected"
            ),
        }
        result
    }

    async fn throttled_login(
        &self,
        request: &LoginRequest,
        limit_key: &RateLimitKey,
    ) -> AuthResult<LoginResponse> {
        self.throttle.ensure_allowed(limit_key).await?;
        let result = if request.platform.is_mobile() {
            self.mobile_login(request).await
        } else {
            self.web_login(request).await
        };
        match result {
            Err(AuthError::InvalidCredentials) => {
                self.throttle.record_failure(limit_key).await?;
                Err(AuthError::InvalidCredentials)
            }
            Ok(response) => {
                self.throttle.clear(limit_key).await;
                Ok(response)
            }
            Err(err) => Err(err),
        }
    }

    async fn mobile_login(
        &self,
        request: &LoginRequest,
    ) -> AuthResult<LoginResponse> {
        let device_id = parse_device_id(request.device_id.as_deref())?;
        let fingerprint = parse_fingerprint(request.device_fingerprint.as_deref())?
            .ok_or_else(|| {
                AuthError::InvalidRequest(
                    "device_fingerprint is required on mobile".into(),
                )
            })?;

        let biometric = request
            .biometric_token
            .as_deref()
            .filter(|token| !token.is_empty());
        let user = match biometric {
            Some(token) if request.password.is_empty() => {
                let binding = self.devices.get_binding(&device_id).await?;
                self.verifier
                    .verify_biometric(&request.identifier, token, binding.as_ref())
                    .await?
            }
            _ => {
                self.verifier
                    .verify(&request.identifier, &request.password)
                    .await?
            }
        };

        if !user.role().has_mobile_access() {
            return Err(AuthError::MobileAccessDenied(user.role()));
        }

        let binding = self
            .devices
            .bind(NewDeviceBinding {
                user_id: user.id(),
                device_id: device_id.clone(),
                fingerprint,
                platform: request.platform,
                device_info: request.device_info.clone().unwrap_or_default(),
                biometric_hash: biometric
                    .filter(|_| !request.password.is_empty())
                    .map(|token| self.crypto.hash_token(token)),
            })
            .await?;
        if !binding.can_issue_tokens() {
            info!(
                target: "agrinova::auth",
                user_id = %user.id(),
                device_id = %device_id,
                trusted = binding.is_trusted(),
                authorized = binding.is_authorized(),
                "device awaiting approval"
            );
            return Err(AuthError::DeviceNotAuthorized);
        }

        ensure_scope(&user)?;

        self.tokens
            .revoke_device_tokens(
                user.id(),
                device_id.as_str(),
                RevocationReason::LoginSuperseded,
            )
            .await?;
        let tokens = self
            .tokens
            .generate_token_pair(
                user.id(),
                device_id.as_str(),
                request.platform,
                user.role(),
                user.grants.primary_company(),
            )
            .await?;
        let offline_token = self
            .tokens
            .generate_offline_token(
                user.id(),
                device_id.as_str(),
                request.platform,
            )
            .await?;
        self.devices.touch(&binding).await;

        Ok(LoginResponse {
            tokens,
            offline_token: Some(offline_token),
            session: None,
            device: Some(binding),
            user: user.profile(),
        })
    }

    async fn web_login(&self, request: &LoginRequest) -> AuthResult<LoginResponse> {
        let user = self
            .verifier
            .verify(&request.identifier, &request.password)
            .await?;
        ensure_scope(&user)?;

        let now = Utc::now();
        let session_id = Uuid::now_v7();
        let client_device = request
            .device_id
            .as_deref()
            .and_then(DeviceId::parse)
            .map(DeviceId::into_inner);
        let token_device = client_device
            .clone()
            .unwrap_or_else(|| session_id.to_string());

        let tokens = self
            .tokens
            .generate_token_pair(
                user.id(),
                &token_device,
                Platform::Web,
                user.role(),
                user.grants.primary_company(),
            )
            .await?;

        let session_token = self.crypto.generate_opaque_token()?;
        let ttl = if request.remember_me {
            self.config.remember_me_ttl
        } else {
            self.config.session_ttl
        };
        let session = UserSession {
            id: session_id,
            user_id: user.id(),
            device_id: client_device,
            session_token_hash: self.crypto.hash_token(&session_token),
            refresh_token_hash: Some(self.crypto.hash_token(&tokens.refresh_token)),
            platform: Platform::Web,
            device_info: request.device_info.clone().unwrap_or_default(),
            ip_address: request.ip_address.clone(),
            user_agent: request.user_agent.clone(),
            login_method: LoginMethod::Password,
            flags: SessionSecurityFlags::default(),
            last_activity: now,
            expires_at: now + ttl,
            is_active: true,
            revoked_at: None,
            revoked_reason: None,
            created_at: now,
        };
        self.sessions.insert(&session).await?;

        Ok(LoginResponse {
            tokens,
            offline_token: None,
            session: Some(IssuedSession {
                session_id,
                session_token,
                expires_at: session.expires_at,
            }),
            device: None,
            user: user.profile(),
        })
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// With [`RefreshRotation::RevokeFamily`] the presented family is revoked
    /// before the new pair is minted. Of two concurrent refreshes with the
    /// same token only the one whose revocation lands succeeds.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
        device_id: Option<&str>,
    ) -> AuthResult<TokenRefresh> {
        let validated = self.tokens.validate_refresh_token(refresh_token).await?;
        if device_id.is_some_and(|device| device.trim() != validated.device_id) {
            warn!(
                target: "agrinova::auth",
                user_id = %validated.user_id,
                token_id = %validated.token_id,
                "refresh presented from a different device"
            );
            return Err(AuthError::DeviceNotAuthorized);
        }

        let user = self.verifier.reload(validated.user_id).await?;
        let binding = self.token_binding(user.id(), &validated).await?;
        ensure_scope(&user)?;

        if self.config.refresh_rotation == RefreshRotation::RevokeFamily {
            let revoked = self
                .tokens
                .revoke_token(validated.token_id, RevocationReason::Rotation)
                .await?;
            if revoked == 0 {
                warn!(
                    target: "agrinova::auth",
                    user_id = %user.id(),
                    token_id = %validated.token_id,
                    "refresh token was already rotated"
                );
                return Err(AuthError::TokenNotFoundOrRevokedOrExpired);
            }
        }
        let tokens = self
            .tokens
            .generate_token_pair(
                user.id(),
                &validated.device_id,
                validated.platform,
                user.role(),
                user.grants.primary_company(),
            )
            .await?;
        if let Some(binding) = &binding {
            self.devices.touch(binding).await;
        } else {
            self.rotate_session_refresh(refresh_token, &tokens).await;
        }

        info!(
            target: "agrinova::auth",
            user_id = %user.id(),
            previous_token_id = %validated.token_id,
            token_id = %tokens.token_id,
            rotation = ?self.config.refresh_rotation,
            "token refreshed"
        );
        Ok(TokenRefresh {
            tokens,
            user: user.profile(),
        })
    }

    /// Mobile families need a live binding that the user still owns and that
    /// can still issue tokens. Web families have no binding.
    async fn token_binding(
        &self,
        user_id: Uuid,
        token: &ValidatedToken,
    ) -> AuthResult<Option<DeviceBinding>> {
        if !token.platform.is_mobile() {
            return Ok(None);
        }
        let device_id =
            DeviceId::parse(&token.device_id).ok_or(AuthError::DeviceNotFound)?;
        match self.devices.get_binding(&device_id).await? {
            None => {
                warn!(
                    target: "agrinova::auth",
                    %user_id,
                    device_id = %device_id,
                    token_id = %token.token_id,
                    "mobile token presented after its binding was revoked"
                );
                Err(AuthError::DeviceNotFound)
            }
            Some(binding)
                if binding.user_id() == user_id && binding.can_issue_tokens() =>
            {
                Ok(Some(binding))
            }
            Some(_) => Err(AuthError::DeviceNotAuthorized),
        }
    }

    /// Secondary effect; failures are logged, never returned.
    async fn rotate_session_refresh(&self, previous: &str, tokens: &TokenPair) {
        let result = self
            .sessions
            .rotate_refresh_hash(
                &self.crypto.hash_token(previous),
                &self.crypto.hash_token(&tokens.refresh_token),
                Utc::now(),
            )
            .await;
        if let Err(err) = result {
            warn!(
                target: "agrinova::auth",
                token_id = %tokens.token_id,
                error = %err,
                "failed to update session refresh hash"
            );
        }
    }

    /// Recovery path: trade a long-lived offline token for a new pair.
    ///
    /// Every earlier access/refresh family of the device is revoked; the
    /// offline record itself stays valid.
    pub async fn device_renew(
        &self,
        offline_token: &str,
        device_id: &str,
        fingerprint: Option<&str>,
    ) -> AuthResult<TokenRefresh> {
        let validated = self.tokens.validate_offline_token(offline_token).await?;
        let device_id = parse_device_id(Some(device_id))?;
        if device_id.as_str() != validated.device_id {
            warn!(
                target: "agrinova::auth",
                user_id = %validated.user_id,
                token_id = %validated.token_id,
                "offline token presented from a different device"
            );
            return Err(AuthError::DeviceNotAuthorized);
        }

        let user = self.verifier.reload(validated.user_id).await?;
        if !user.role().has_mobile_access() {
            return Err(AuthError::MobileAccessDenied(user.role()));
        }
        let fingerprint = parse_fingerprint(fingerprint)?;
        let binding = self
            .devices
            .require_authorized(user.id(), &device_id, fingerprint.as_ref())
            .await?;
        ensure_scope(&user)?;

        self.tokens
            .revoke_device_families(
                user.id(),
                device_id.as_str(),
                RevocationReason::DeviceRenewed,
            )
            .await?;
        let tokens = self
            .tokens
            .generate_token_pair(
                user.id(),
                device_id.as_str(),
                binding.platform(),
                user.role(),
                user.grants.primary_company(),
            )
            .await?;
        self.devices.touch(&binding).await;

        info!(
            target: "agrinova::auth",
            user_id = %user.id(),
            device_id = %device_id,
            token_id = %tokens.token_id,
            "device renewed from offline token"
        );
        Ok(TokenRefresh {
            tokens,
            user: user.profile(),
        })
    }

    /// Check an offline token and the device behind it without issuing
    /// anything.
    pub async fn validate_offline_access(
        &self,
        offline_token: &str,
        device_id: Option<&str>,
    ) -> AuthResult<UserProfile> {
        let validated = self.tokens.validate_offline_token(offline_token).await?;
        if device_id.is_some_and(|device| device.trim() != validated.device_id) {
            return Err(AuthError::DeviceNotAuthorized);
        }
        let user = self.verifier.reload(validated.user_id).await?;
        let device_id = parse_device_id(Some(&validated.device_id))?;
        self.devices
            .require_authorized(user.id(), &device_id, None)
            .await?;
        Ok(user.profile())
    }

    /// Check an opaque web session token and record activity on it.
    ///
    /// The session must be active and unexpired and its account must still
    /// be able to sign in.
    pub async fn validate_session(
        &self,
        session_token: &str,
    ) -> AuthResult<SessionValidation> {
        let session_token = session_token.trim();
        if session_token.is_empty() {
            return Err(AuthError::InvalidSession);
        }
        let now = Utc::now();
        let session = self
            .sessions
            .find_active_by_token_hash(&self.crypto.hash_token(session_token), now)
            .await?
            .filter(|session| session.is_live(now))
            .ok_or(AuthError::InvalidSession)?;

        let user = self.verifier.reload(session.user_id).await?;
        self.sessions.touch(session.id, now).await?;

        Ok(SessionValidation {
            session_id: session.id,
            expires_at: session.expires_at,
            last_activity: now,
            user: user.profile(),
        })
    }

    /// Current profile of an authenticated caller.
    pub async fn profile(&self, user_id: Uuid) -> AuthResult<UserProfile> {
        Ok(self.verifier.reload(user_id).await?.profile())
    }

    /// Revoke everything issued to this user on this device and close its
    /// web sessions. Safe to repeat.
    pub async fn logout(
        &self,
        user_id: Uuid,
        device_id: &str,
    ) -> AuthResult<LogoutOutcome> {
        let device_id = parse_device_id(Some(device_id))?;
        let tokens_revoked = self
            .tokens
            .revoke_device_tokens(
                user_id,
                device_id.as_str(),
                RevocationReason::UserLogout,
            )
            .await?;
        let sessions_closed = self
            .sessions
            .deactivate_for_device(
                user_id,
                device_id.as_str(),
                RevocationReason::UserLogout,
            )
            .await?;

        info!(
            target: "agrinova::auth",
            %user_id,
            device_id = %device_id,
            tokens_revoked,
            sessions_closed,
            "logged out"
        );
        Ok(LogoutOutcome {
            tokens_revoked,
            sessions_closed,
        })
    }

    /// Revoke the binding and every token of the device together.
    pub async fn unbind_device(
        &self,
        user_id: Uuid,
        device_id: &str,
    ) -> AuthResult<LogoutOutcome> {
        let device_id = parse_device_id(Some(device_id))?;
        match self.devices.get_binding(&device_id).await? {
            Some(binding) if binding.user_id() == user_id => {}
            _ => return Err(AuthError::DeviceNotFound),
        }

        self.devices.unbind(&device_id).await?;
        let tokens_revoked = self
            .tokens
            .revoke_device_tokens(
                user_id,
                device_id.as_str(),
                RevocationReason::DeviceUnbound,
            )
            .await?;
        let sessions_closed = self
            .sessions
            .deactivate_for_device(
                user_id,
                device_id.as_str(),
                RevocationReason::DeviceUnbound,
            )
            .await?;

        Ok(LogoutOutcome {
            tokens_revoked,
            sessions_closed,
        })
    }

    /// Administrative approval of a pending or re-bound device.
    ///
    /// Company admins only see devices of users sharing one of their
    /// companies; anything else reads as not found.
    pub async fn approve_device(
        &self,
        approver: &AuthenticatedRequest,
        device_id: &str,
    ) -> AuthResult<DeviceBinding> {
        let role = approver.context.role;
        if !role.can_approve_devices() {
            return Err(AuthError::InsufficientRole(role));
        }
        let device_id = parse_device_id(Some(device_id))?;
        let binding = self
            .devices
            .get_binding(&device_id)
            .await?
            .ok_or(AuthError::DeviceNotFound)?;

        if !role.is_super_admin() {
            let owner = match self.scopes.resolve(binding.user_id()).await {
                Ok(owner) => owner,
                Err(AuthError::AccountInactive) => {
                    return Err(AuthError::DeviceNotFound);
                }
                Err(err) => return Err(err),
            };
            let shared = owner
                .company_ids
                .iter()
                .any(|company| approver.context.company_ids.contains(company));
            if !shared {
                return Err(AuthError::DeviceNotFound);
            }
        }

        self.devices
            .approve(&device_id, approver.context.user_id)
            .await
    }

    /// Bearer authentication: token first, then the account behind it and
    /// its scope, then the device binding of mobile tokens.
    pub async fn authenticate_request(
        &self,
        access_token: &str,
    ) -> AuthResult<AuthenticatedRequest> {
        let token = self.tokens.validate_access_token(access_token).await?;
        let context = self.scopes.resolve(token.user_id).await?;
        self.token_binding(token.user_id, &token).await?;
        if token.role != Some(context.role) {
            // Role changed since issuance; the stored role wins.
            info!(
                target: "agrinova::auth",
                user_id = %token.user_id,
                token_role = ?token.role,
                current_role = %context.role,
                "token role is stale"
            );
        }
        Ok(AuthenticatedRequest { token, context })
    }
}

fn parse_device_id(raw: Option<&str>) -> AuthResult<DeviceId> {
    raw.and_then(DeviceId::parse)
        .ok_or_else(|| AuthError::InvalidRequest("device_id is required".into()))
}

fn parse_fingerprint(raw: Option<&str>) -> AuthResult<Option<DeviceFingerprint>> {
    raw.map(DeviceFingerprint::new)
        .transpose()
        .map_err(|err| AuthError::InvalidRequest(err.to_string()))
}

/// A role with zero usable grants at its level cannot operate.
fn ensure_scope(user: &VerifiedUser) -> AuthResult<()> {
    let grants = &user.grants;
    let level = user.role().scope_level();
    if level == ScopeLevel::Global {
        return Ok(());
    }
    if grants.company_ids.is_empty() {
        return Err(AuthError::NoCompany);
    }
    let covered = match level {
        ScopeLevel::Global | ScopeLevel::Company => true,
        ScopeLevel::Estate => !grants.estate_ids.is_empty(),
        ScopeLevel::Division | ScopeLevel::Own => {
            !grants.division_ids.is_empty() || !grants.estate_ids.is_empty()
        }
    };
    if covered {
        Ok(())
    } else {
        Err(AuthError::NoAssignments)
    }
}
