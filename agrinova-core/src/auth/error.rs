use std::time::Duration;

use agrinova_model::Role;
use thiserror::Error;

use super::crypto::AuthCryptoError;

pub type AuthResult<T> = Result<T, AuthError>;

/// Every outcome an auth operation can fail with.
///
/// Policy denials are distinct variants; infrastructure failures collapse
/// into [`AuthError::Store`] / [`AuthError::Crypto`] so callers never confuse
/// a database outage with a rejected credential.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("token not found, revoked, or expired")]
    TokenNotFoundOrRevokedOrExpired,

    #[error("session not found, inactive, or expired")]
    InvalidSession,

    #[error("device not found")]
    DeviceNotFound,

    #[error("device not authorized")]
    DeviceNotAuthorized,

    #[error("device already bound")]
    DeviceAlreadyBound,

    #[error("device fingerprint mismatch")]
    DeviceFingerprintMismatch,

    #[error("user has no active company")]
    NoCompany,

    #[error("user has no active assignments")]
    NoAssignments,

    #[error("role {0} may not sign in from a mobile device")]
    MobileAccessDenied(Role),

    #[error("account is inactive")]
    AccountInactive,

    #[error("role {0} may not perform this action")]
    InsufficientRole(Role),

    #[error("too many login attempts, retry in {}s", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("operation timed out")]
    Timeout,

    #[error("crypto error: {0}")]
    Crypto(#[from] AuthCryptoError),

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl AuthError {
    /// True for infrastructure faults as opposed to policy denials.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::Store(_) | AuthError::Crypto(_) | AuthError::Timeout
        )
    }

    /// Message safe to show to an end user.
    ///
    /// Login failures share one generic message. Token and device failures
    /// tell the user to sign in again or that the device is not allowed.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials | AuthError::AccountInactive => {
                "Invalid username or password"
            }
            AuthError::InvalidToken
            | AuthError::TokenNotFoundOrRevokedOrExpired
            | AuthError::InvalidSession => {
                "Session expired, please sign in again"
            }
            AuthError::DeviceNotFound => "Device is not registered",
            AuthError::DeviceNotAuthorized => "Device is not authorized",
            AuthError::DeviceAlreadyBound => {
                "Device is already bound to an account"
            }
            AuthError::DeviceFingerprintMismatch => {
                "Device verification failed"
            }
            AuthError::NoCompany => "Account is not assigned to a company",
            AuthError::NoAssignments => "Account has no active assignments",
            AuthError::MobileAccessDenied(_) => {
                "This account cannot sign in from the mobile app"
            }
            AuthError::InsufficientRole(_) => {
                "You are not allowed to perform this action"
            }
            AuthError::RateLimited { .. } => {
                "Too many login attempts, please try again later"
            }
            AuthError::InvalidRequest(_) => "Invalid request",
            AuthError::Timeout
            | AuthError::Crypto(_)
            | AuthError::Store(_) => "Internal server error",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AuthError::TokenNotFoundOrRevokedOrExpired
            }
            _ => AuthError::InvalidToken,
        }
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Store(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumeration_safe_messages() {
        assert_eq!(
            AuthError::InvalidCredentials.user_message(),
            AuthError::AccountInactive.user_message()
        );
    }

    #[test]
    fn store_failures_are_internal() {
        let err = AuthError::from(anyhow::anyhow!("connection refused"));
        assert!(err.is_internal());
        assert!(!AuthError::DeviceNotAuthorized.is_internal());
        assert!(
            !AuthError::RateLimited {
                retry_after: Duration::from_secs(1)
            }
            .is_internal()
        );
    }

    #[test]
    fn rate_limit_message_names_the_wait() {
        let err = AuthError::RateLimited {
            retry_after: Duration::from_secs(90),
        };
        assert_eq!(err.to_string(), "too many login attempts, retry in 90s");
    }
}
