use agrinova_model::{Platform, Role, TokenKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Claims carried by an access token.
///
/// Decoding is strict: a missing field, an unknown role string, or a
/// non-UUID id fails deserialization as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub token_id: Uuid,
    pub user_id: Uuid,
    pub device_id: String,
    pub role: Role,
    pub company_id: Option<Uuid>,
    pub iss: String,
    #[serde(rename = "type")]
    pub token_type: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by a refresh token. No role or company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub token_id: Uuid,
    pub user_id: Uuid,
    pub device_id: String,
    pub iss: String,
    #[serde(rename = "type")]
    pub token_type: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

/// Result of a successful validation, whatever the token kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedToken {
    pub token_id: Uuid,
    pub user_id: Uuid,
    pub device_id: String,
    /// Taken from the stored record, never from claims.
    pub platform: Platform,
    pub kind: TokenKind,
    /// `None` for offline tokens; their privileges come from `scope`.
    pub role: Option<Role>,
    pub company_id: Option<Uuid>,
    pub scope: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

/// A freshly issued access + refresh family.
#[derive(Clone)]
pub struct TokenPair {
    pub token_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("token_id", &self.token_id)
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct OfflineToken {
    pub token_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for OfflineToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OfflineToken")
            .field("token_id", &self.token_id)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_role_fails_decoding() {
        let raw = serde_json::json!({
            "token_id": Uuid::now_v7(),
            "user_id": Uuid::now_v7(),
            "device_id": "d",
            "role": "ROOT",
            "company_id": null,
            "iss": "agrinova",
            "type": "access",
            "iat": 0,
            "exp": 1,
        });
        assert!(serde_json::from_value::<AccessClaims>(raw).is_err());
    }

    #[test]
    fn refresh_payload_is_not_access_claims() {
        let raw = serde_json::json!({
            "token_id": Uuid::now_v7(),
            "user_id": Uuid::now_v7(),
            "device_id": "d",
            "iss": "agrinova",
            "type": "refresh",
            "iat": 0,
            "exp": 1,
        });
        assert!(serde_json::from_value::<AccessClaims>(raw.clone()).is_err());
        let refresh: RefreshClaims = serde_json::from_value(raw).unwrap();
        assert_eq!(refresh.token_type, TokenKind::Refresh);
    }
}
