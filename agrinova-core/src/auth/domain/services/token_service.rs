use std::fmt;
use std::sync::Arc;

use agrinova_model::{
    OFFLINE_ACCESS_SCOPE, Platform, Role, TokenKind, TokenRecordType,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use tracing::{debug, info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::auth::crypto::AuthCrypto;
use crate::auth::domain::claims::{
    AccessClaims, OfflineToken, RefreshClaims, TokenPair, ValidatedToken,
};
use crate::auth::domain::repositories::{
    DeviceRevocationScope, TokenRecord, TokenRecordRepository,
};
use crate::auth::domain::value_objects::RevocationReason;
use crate::auth::error::{AuthError, AuthResult};

/// Signing and lifetime settings for the token service.
#[derive(Clone)]
pub struct TokenConfig {
    pub access_secret: Zeroizing<String>,
    pub refresh_secret: Zeroizing<String>,
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub offline_ttl: Duration,
    /// Clock-skew tolerance for `exp`, in seconds.
    pub leeway_secs: u64,
    /// Legacy hashes are accepted strictly before this instant; never when
    /// unset.
    pub legacy_hash_cutover: Option<DateTime<Utc>>,
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("offline_ttl", &self.offline_ttl)
            .field("leeway_secs", &self.leeway_secs)
            .field("legacy_hash_cutover", &self.legacy_hash_cutover)
            .finish_non_exhaustive()
    }
}

/// Issues, validates, and revokes access, refresh, and offline tokens.
///
/// Only SHA-256 hashes of issued tokens are persisted. Signed tokens are
/// checked for signature, algorithm, issuer, expiry, and type before the
/// store is consulted; a signature-valid token without a live record is
/// still rejected.
pub struct TokenService {
    records: Arc<dyn TokenRecordRepository>,
    crypto: Arc<AuthCrypto>,
    config: TokenConfig,
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("config", &self.config)
            .field("record_repo_refs", &Arc::strong_count(&self.records))
            .finish_non_exhaustive()
    }
}

impl TokenService {
    const ALGORITHM: Algorithm = Algorithm::HS256;

    pub fn new(
        records: Arc<dyn TokenRecordRepository>,
        crypto: Arc<AuthCrypto>,
        config: TokenConfig,
    ) -> Self {
        let access = config.access_secret.as_bytes();
        let refresh = config.refresh_secret.as_bytes();
        Self {
            access_encoding: EncodingKey::from_secret(access),
            access_decoding: DecodingKey::from_secret(access),
            refresh_encoding: EncodingKey::from_secret(refresh),
            refresh_decoding: DecodingKey::from_secret(refresh),
            records,
            crypto,
            config,
        }
    }

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Self::ALGORITHM);
        validation.set_issuer(&[self.config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iat", "iss"]);
        validation.leeway = self.config.leeway_secs;
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation
    }

    /// Store expiries get the same skew tolerance as the `exp` claim.
    fn expiry_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let leeway = i64::try_from(self.config.leeway_secs).unwrap_or(0);
        now - Duration::seconds(leeway)
    }

    /// Hashes a presented token may be stored under right now.
    fn candidate_hashes(&self, token: &str, now: DateTime<Utc>) -> Vec<String> {
        let mut hashes = vec![self.crypto.hash_token(token)];
        if self
            .config
            .legacy_hash_cutover
            .is_some_and(|cutover| now < cutover)
        {
            hashes.push(self.crypto.legacy_hash_token(token));
        }
        hashes
    }

    /// Mint an access + refresh family sharing one token id.
    pub async fn generate_token_pair(
        &self,
        user_id: Uuid,
        device_id: &str,
        platform: Platform,
        role: Role,
        company_id: Option<Uuid>,
    ) -> AuthResult<TokenPair> {
        let token_id = Uuid::new_v4();
        let now = Utc::now();
        let access_expires_at = now + self.config.access_ttl;
        let refresh_expires_at = now + self.config.refresh_ttl;

        let access_claims = AccessClaims {
            token_id,
            user_id,
            device_id: device_id.to_string(),
            role,
            company_id,
            iss: self.config.issuer.clone(),
            token_type: TokenKind::Access,
            iat: now.timestamp(),
            exp: access_expires_at.timestamp(),
        };
        let refresh_claims = RefreshClaims {
            token_id,
            user_id,
            device_id: device_id.to_string(),
            iss: self.config.issuer.clone(),
            token_type: TokenKind::Refresh,
            iat: now.timestamp(),
            exp: refresh_expires_at.timestamp(),
        };

        let header = Header::new(Self::ALGORITHM);
        let access_token =
            encode(&header, &access_claims, &self.access_encoding)
                .map_err(|err| AuthError::Store(err.into()))?;
        let refresh_token =
            encode(&header, &refresh_claims, &self.refresh_encoding)
                .map_err(|err| AuthError::Store(err.into()))?;

        let record = TokenRecord {
            id: token_id,
            user_id,
            device_id: device_id.to_string(),
            platform,
            token_type: TokenRecordType::Jwt,
            token_hash: self.crypto.hash_token(&access_token),
            refresh_hash: Some(self.crypto.hash_token(&refresh_token)),
            offline_hash: None,
            expires_at: access_expires_at,
            refresh_expires_at: Some(refresh_expires_at),
            offline_expires_at: None,
            is_revoked: false,
            revoked_at: None,
            revoked_reason: None,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        };
        self.records.insert(&record).await?;

        debug!(
            target: "agrinova::auth",
            %user_id,
            %token_id,
            device_id,
            "issued token pair"
        );

        Ok(TokenPair {
            token_id,
            access_token,
            refresh_token,
            access_expires_at,
            refresh_expires_at,
        })
    }

    /// Mint an opaque offline token. It carries no claims; everything is
    /// re-derived from the stored record on validation.
    pub async fn generate_offline_token(
        &self,
        user_id: Uuid,
        device_id: &str,
        platform: Platform,
    ) -> AuthResult<OfflineToken> {
        let token = self.crypto.generate_opaque_token()?;
        let token_id = Uuid::new_v4();
        let now = Utc::now();
        let expires_at = now + self.config.offline_ttl;
        let hash = self.crypto.hash_token(&token);

        let record = TokenRecord {
            id: token_id,
            user_id,
            device_id: device_id.to_string(),
            platform,
            token_type: TokenRecordType::Offline,
            token_hash: hash.clone(),
            refresh_hash: None,
            offline_hash: Some(hash),
            expires_at,
            refresh_expires_at: None,
            offline_expires_at: Some(expires_at),
            is_revoked: false,
            revoked_at: None,
            revoked_reason: None,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        };
        self.records.insert(&record).await?;

        debug!(
            target: "agrinova::auth",
            %user_id,
            %token_id,
            device_id,
            "issued offline token"
        );

        Ok(OfflineToken {
            token_id,
            token,
            expires_at,
        })
    }

    pub async fn validate_access_token(
        &self,
        token: &str,
    ) -> AuthResult<ValidatedToken> {
        let claims =
            decode::<AccessClaims>(token, &self.access_decoding, &self.validation())?
                .claims;
        if claims.token_type != TokenKind::Access || claims.iss != self.config.issuer
        {
            return Err(AuthError::InvalidToken);
        }

        let now = Utc::now();
        let hashes = self.candidate_hashes(token, now);
        let record = self
            .records
            .find_live_access(claims.token_id, &hashes, self.expiry_cutoff(now))
            .await?
            .ok_or(AuthError::TokenNotFoundOrRevokedOrExpired)?;
        self.ensure_record_matches(&record, claims.user_id, &claims.device_id)?;
        self.touch(record.id, now).await;

        Ok(ValidatedToken {
            token_id: claims.token_id,
            user_id: claims.user_id,
            device_id: claims.device_id,
            platform: record.platform,
            kind: TokenKind::Access,
            role: Some(claims.role),
            company_id: claims.company_id,
            scope: Vec::new(),
            expires_at: timestamp(claims.exp),
        })
    }

    pub async fn validate_refresh_token(
        &self,
        token: &str,
    ) -> AuthResult<ValidatedToken> {
        let claims = decode::<RefreshClaims>(
            token,
            &self.refresh_decoding,
            &self.validation(),
        )?
        .claims;
        if claims.token_type != TokenKind::Refresh
            || claims.iss != self.config.issuer
        {
            return Err(AuthError::InvalidToken);
        }

        let now = Utc::now();
        let hashes = self.candidate_hashes(token, now);
        let record = self
            .records
            .find_live_refresh(
                claims.token_id,
                &hashes,
                self.expiry_cutoff(now),
            )
            .await?
            .ok_or(AuthError::TokenNotFoundOrRevokedOrExpired)?;
        self.ensure_record_matches(&record, claims.user_id, &claims.device_id)?;
        self.touch(record.id, now).await;

        Ok(ValidatedToken {
            token_id: claims.token_id,
            user_id: claims.user_id,
            device_id: claims.device_id,
            platform: record.platform,
            kind: TokenKind::Refresh,
            role: None,
            company_id: None,
            scope: Vec::new(),
            expires_at: timestamp(claims.exp),
        })
    }

    /// Hash lookup only; offline tokens have no signature to check.
    pub async fn validate_offline_token(
        &self,
        token: &str,
    ) -> AuthResult<ValidatedToken> {
        let token = token.trim();
        if token.is_empty() || token.contains('.') {
            // Signed tokens are never offline tokens.
            return Err(AuthError::InvalidToken);
        }

        let now = Utc::now();
        let hashes = self.candidate_hashes(token, now);
        let record = self
            .records
            .find_live_offline(&hashes, now)
            .await?
            .filter(|record| record.offline_live_at(now))
            .ok_or(AuthError::TokenNotFoundOrRevokedOrExpired)?;
        self.touch(record.id, now).await;

        Ok(ValidatedToken {
            token_id: record.id,
            user_id: record.user_id,
            device_id: record.device_id.clone(),
            platform: record.platform,
            kind: TokenKind::Offline,
            role: None,
            company_id: None,
            scope: vec![OFFLINE_ACCESS_SCOPE.to_string()],
            expires_at: record.offline_expires_at.unwrap_or(record.expires_at),
        })
    }

    fn ensure_record_matches(
        &self,
        record: &TokenRecord,
        user_id: Uuid,
        device_id: &str,
    ) -> AuthResult<()> {
        if record.user_id != user_id || record.device_id != device_id {
            warn!(
                target: "agrinova::auth",
                token_id = %record.id,
                "token claims disagree with stored record"
            );
            return Err(AuthError::InvalidToken);
        }
        Ok(())
    }

    /// Secondary effect; failures are logged, never returned.
    async fn touch(&self, token_id: Uuid, now: DateTime<Utc>) {
        if let Err(err) = self.records.touch_last_used(token_id, now).await {
            warn!(
                target: "agrinova::auth",
                %token_id,
                error = %err,
                "failed to update token last_used_at"
            );
        }
    }

    /// Returns 1 when this call revoked the record, 0 when it was already
    /// revoked or never existed.
    pub async fn revoke_token(
        &self,
        token_id: Uuid,
        reason: RevocationReason,
    ) -> AuthResult<u64> {
        let revoked = self.records.revoke(token_id, reason).await?;
        info!(target: "agrinova::auth", %token_id, %reason, revoked, "revoked token");
        Ok(revoked)
    }

    pub async fn revoke_all_user_tokens(
        &self,
        user_id: Uuid,
        reason: RevocationReason,
    ) -> AuthResult<u64> {
        let revoked = self.records.revoke_for_user(user_id, reason).await?;
        info!(target: "agrinova::auth", %user_id, %reason, revoked, "revoked user tokens");
        Ok(revoked)
    }

    pub async fn revoke_device_tokens(
        &self,
        user_id: Uuid,
        device_id: &str,
        reason: RevocationReason,
    ) -> AuthResult<u64> {
        self.revoke_device_scope(
            user_id,
            device_id,
            DeviceRevocationScope::All,
            reason,
        )
        .await
    }

    /// Revoke the device's access + refresh families, leaving offline
    /// records alone.
    pub async fn revoke_device_families(
        &self,
        user_id: Uuid,
        device_id: &str,
        reason: RevocationReason,
    ) -> AuthResult<u64> {
        self.revoke_device_scope(
            user_id,
            device_id,
            DeviceRevocationScope::Only(TokenRecordType::Jwt),
            reason,
        )
        .await
    }

    async fn revoke_device_scope(
        &self,
        user_id: Uuid,
        device_id: &str,
        scope: DeviceRevocationScope,
        reason: RevocationReason,
    ) -> AuthResult<u64> {
        let revoked = self
            .records
            .revoke_for_device(user_id, device_id, scope, reason)
            .await?;
        info!(
            target: "agrinova::auth",
            %user_id,
            device_id,
            %reason,
            revoked,
            "revoked device tokens"
        );
        Ok(revoked)
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthSettings;
    use crate::auth::memory::InMemoryTokenRecordRepository;

    fn service_with(
        tweak: impl FnOnce(&mut TokenConfig),
    ) -> (TokenService, InMemoryTokenRecordRepository) {
        let mut config = AuthSettings::for_tests().tokens;
        tweak(&mut config);
        let records = InMemoryTokenRecordRepository::default();
        let service = TokenService::new(
            Arc::new(records.clone()),
            Arc::new(AuthCrypto::for_tests()),
            config,
        );
        (service, records)
    }

    fn service() -> (TokenService, InMemoryTokenRecordRepository) {
        service_with(|_| {})
    }

    #[tokio::test]
    async fn access_token_round_trips_its_claims() {
        let (tokens, _) = service();
        let user = Uuid::now_v7();
        let company = Uuid::now_v7();

        let pair = tokens
            .generate_token_pair(
                user,
                "dev-1",
                Platform::Android,
                Role::Asisten,
                Some(company),
            )
            .await
            .unwrap();
        let claims = tokens.validate_access_token(&pair.access_token).await.unwrap();

        assert_eq!(claims.token_id, pair.token_id);
        assert_eq!(claims.user_id, user);
        assert_eq!(claims.device_id, "dev-1");
        assert_eq!(claims.role, Some(Role::Asisten));
        assert_eq!(claims.company_id, Some(company));
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.platform, Platform::Android);

        let refresh = tokens.validate_refresh_token(&pair.refresh_token).await.unwrap();
        assert_eq!(refresh.token_id, pair.token_id);
        assert_eq!(refresh.role, None);
    }

    #[tokio::test]
    async fn each_validator_accepts_only_its_own_kind() {
        let (tokens, _) = service();
        let user = Uuid::now_v7();
        let pair = tokens
            .generate_token_pair(
                user,
                "dev-1",
                Platform::Android,
                Role::Mandor,
                None,
            )
            .await
            .unwrap();
        let offline = tokens
            .generate_offline_token(user, "dev-1", Platform::Android)
            .await
            .unwrap();

        assert!(tokens.validate_access_token(&pair.access_token).await.is_ok());
        assert!(tokens.validate_refresh_token(&pair.refresh_token).await.is_ok());
        assert!(tokens.validate_offline_token(&offline.token).await.is_ok());

        let rejected = [
            tokens.validate_access_token(&pair.refresh_token).await,
            tokens.validate_access_token(&offline.token).await,
            tokens.validate_refresh_token(&pair.access_token).await,
            tokens.validate_refresh_token(&offline.token).await,
            tokens.validate_offline_token(&pair.access_token).await,
            tokens.validate_offline_token(&pair.refresh_token).await,
        ];
        for result in rejected {
            assert!(matches!(result, Err(AuthError::InvalidToken)), "{result:?}");
        }
    }

    #[tokio::test]
    async fn shared_secret_still_cannot_confuse_access_and_refresh() {
        let (tokens, _) = service_with(|config| {
            config.refresh_secret = config.access_secret.clone();
        });
        let pair = tokens
            .generate_token_pair(
                Uuid::now_v7(),
                "dev-1",
                Platform::Android,
                Role::Mandor,
                None,
            )
            .await
            .unwrap();

        assert!(matches!(
            tokens.validate_access_token(&pair.refresh_token).await,
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            tokens.validate_refresh_token(&pair.access_token).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn only_hashes_are_persisted() {
        let (tokens, records) = service();
        let user = Uuid::now_v7();
        let pair = tokens
            .generate_token_pair(
                user,
                "dev-1",
                Platform::Android,
                Role::Mandor,
                None,
            )
            .await
            .unwrap();
        let offline = tokens
            .generate_offline_token(user, "dev-1", Platform::Android)
            .await
            .unwrap();
        let plaintexts = [&pair.access_token, &pair.refresh_token, &offline.token];

        for record in records.all().await {
            let stored = [
                Some(&record.token_hash),
                record.refresh_hash.as_ref(),
                record.offline_hash.as_ref(),
                Some(&record.device_id),
            ];
            for value in stored.into_iter().flatten() {
                assert!(plaintexts.iter().all(|token| *token != value));
            }
        }

        let access_record = records
            .all()
            .await
            .into_iter()
            .find(|r| r.id == pair.token_id)
            .unwrap();
        assert_eq!(access_record.token_hash, crate::auth::crypto::hash_token(&pair.access_token));
    }

    #[tokio::test]
    async fn tampered_or_foreign_tokens_are_invalid() {
        let (tokens, _) = service();
        let (foreign, _) = service_with(|config| {
            config.access_secret = Zeroizing::new("someone-elses-secret".into());
        });
        let pair = foreign
            .generate_token_pair(
                Uuid::now_v7(),
                "dev-1",
                Platform::Android,
                Role::Mandor,
                None,
            )
            .await
            .unwrap();
        assert!(matches!(
            tokens.validate_access_token(&pair.access_token).await,
            Err(AuthError::InvalidToken)
        ));

        let (other_issuer, _) = service_with(|config| config.issuer = "elsewhere".into());
        let pair = other_issuer
            .generate_token_pair(
                Uuid::now_v7(),
                "dev-1",
                Platform::Android,
                Role::Mandor,
                None,
            )
            .await
            .unwrap();
        assert!(matches!(
            tokens.validate_access_token(&pair.access_token).await,
            Err(AuthError::InvalidToken)
        ));

        assert!(matches!(
            tokens.validate_access_token("not-a-jwt").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn well_formed_token_without_a_record_is_rejected() {
        let (issuer, _) = service();
        let (validator, _) = service();
        let pair = issuer
            .generate_token_pair(
                Uuid::now_v7(),
                "dev-1",
                Platform::Android,
                Role::Mandor,
                None,
            )
            .await
            .unwrap();

        assert!(matches!(
            validator.validate_access_token(&pair.access_token).await,
            Err(AuthError::TokenNotFoundOrRevokedOrExpired)
        ));
    }

    #[tokio::test]
    async fn expired_access_token_is_reported_as_expired() {
        let (tokens, _) = service_with(|config| config.access_ttl = Duration::minutes(-5));
        let pair = tokens
            .generate_token_pair(
                Uuid::now_v7(),
                "dev-1",
                Platform::Android,
                Role::Mandor,
                None,
            )
            .await
            .unwrap();

        assert!(matches!(
            tokens.validate_access_token(&pair.access_token).await,
            Err(AuthError::TokenNotFoundOrRevokedOrExpired)
        ));
    }

    #[tokio::test]
    async fn offline_expiry_falls_back_to_general_expiry() {
        let (tokens, records) = service();
        let user = Uuid::now_v7();
        let offline = tokens
            .generate_offline_token(user, "dev-1", Platform::Android)
            .await
            .unwrap();

        records
            .update(offline.token_id, |r| {
                r.offline_expires_at = None;
                r.expires_at = Utc::now() - Duration::minutes(1);
            })
            .await
            .unwrap();
        assert!(matches!(
            tokens.validate_offline_token(&offline.token).await,
            Err(AuthError::TokenNotFoundOrRevokedOrExpired)
        ));

        records
            .update(offline.token_id, |r| {
                r.expires_at = Utc::now() + Duration::days(1);
            })
            .await
            .unwrap();
        let validated = tokens.validate_offline_token(&offline.token).await.unwrap();
        assert_eq!(validated.scope, vec![OFFLINE_ACCESS_SCOPE.to_string()]);
        assert_eq!(validated.role, None);
    }

    #[tokio::test]
    async fn revoking_twice_is_a_quiet_no_op() {
        let (tokens, records) = service();
        let pair = tokens
            .generate_token_pair(
                Uuid::now_v7(),
                "dev-1",
                Platform::Android,
                Role::Mandor,
                None,
            )
            .await
            .unwrap();

        let revoked = tokens
            .revoke_token(pair.token_id, RevocationReason::UserLogout)
            .await
            .unwrap();
        assert_eq!(revoked, 1);
        let first = records.all().await.pop().unwrap();

        let revoked = tokens
            .revoke_token(pair.token_id, RevocationReason::Admin)
            .await
            .unwrap();
        assert_eq!(revoked, 0);
        let second = records.all().await.pop().unwrap();

        assert!(second.is_revoked);
        assert_eq!(first.revoked_at, second.revoked_at);
        assert_eq!(second.revoked_reason.as_deref(), Some("user_logout"));
        assert!(matches!(
            tokens.validate_refresh_token(&pair.refresh_token).await,
            Err(AuthError::TokenNotFoundOrRevokedOrExpired)
        ));
    }

    #[tokio::test]
    async fn device_revocation_is_scoped_to_user_and_device() {
        let (tokens, _) = service();
        let user = Uuid::now_v7();
        let here = tokens
            .generate_token_pair(
                user,
                "dev-1",
                Platform::Android,
                Role::Mandor,
                None,
            )
            .await
            .unwrap();
        let there = tokens
            .generate_token_pair(
                user,
                "dev-2",
                Platform::Android,
                Role::Mandor,
                None,
            )
            .await
            .unwrap();
        let offline = tokens
            .generate_offline_token(user, "dev-1", Platform::Android)
            .await
            .unwrap();

        let revoked = tokens
            .revoke_device_families(user, "dev-1", RevocationReason::DeviceRenewed)
            .await
            .unwrap();
        assert_eq!(revoked, 1);
        assert!(tokens.validate_access_token(&here.access_token).await.is_err());
        assert!(tokens.validate_access_token(&there.access_token).await.is_ok());
        assert!(tokens.validate_offline_token(&offline.token).await.is_ok());

        let revoked = tokens
            .revoke_all_user_tokens(user, RevocationReason::PasswordChange)
            .await
            .unwrap();
        assert_eq!(revoked, 2);
        assert!(tokens.validate_offline_token(&offline.token).await.is_err());
    }

    #[tokio::test]
    async fn legacy_hash_is_accepted_only_before_cutover() {
        let (open, records) = service_with(|config| {
            config.legacy_hash_cutover = Some(Utc::now() + Duration::days(1));
        });
        let pair = open
            .generate_token_pair(
                Uuid::now_v7(),
                "dev-1",
                Platform::Android,
                Role::Mandor,
                None,
            )
            .await
            .unwrap();
        let legacy = crate::auth::crypto::AuthCrypto::for_tests()
            .legacy_hash_token(&pair.access_token);
        records
            .update(pair.token_id, |r| r.token_hash = legacy.clone())
            .await
            .unwrap();

        open.validate_access_token(&pair.access_token)
            .await
            .expect("legacy hash accepted inside the window");

        let closed = TokenService::new(
            Arc::new(records.clone()),
            Arc::new(AuthCrypto::for_tests()),
            TokenConfig {
                legacy_hash_cutover: Some(Utc::now() - Duration::seconds(1)),
                ..open.config().clone()
            },
        );
        assert!(matches!(
            closed.validate_access_token(&pair.access_token).await,
            Err(AuthError::TokenNotFoundOrRevokedOrExpired)
        ));

        let (fresh, fresh_records) = service_with(|config| {
            config.legacy_hash_cutover = Some(Utc::now() + Duration::days(1));
        });
        let issued = fresh
            .generate_token_pair(
                Uuid::now_v7(),
                "dev-1",
                Platform::Android,
                Role::Mandor,
                None,
            )
            .await
            .unwrap();
        let stored = fresh_records.all().await.pop().unwrap();
        assert_eq!(
            stored.token_hash,
            crate::auth::crypto::hash_token(&issued.access_token)
        );
    }
}
