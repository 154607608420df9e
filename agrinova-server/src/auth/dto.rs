use std::fmt;

use agrinova_core::auth::{
    DeviceBinding, LoginResponse, LogoutOutcome, SessionValidation, TokenRefresh,
};
use agrinova_model::{DeviceInfo, Platform, UserProfile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `{ "status": "success", "data": ... }` envelope used by every success
/// response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success".to_string(),
            data: Some(data),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct LoginBody {
    /// Username, email, or phone number.
    #[serde(alias = "username", alias = "email")]
    pub identifier: String,
    pub password: String,
    pub platform: Platform,
    pub device_id: Option<String>,
    pub device_fingerprint: Option<String>,
    pub device_info: Option<DeviceInfo>,
    pub biometric_token: Option<String>,
    pub remember_me: bool,
}

impl fmt::Debug for LoginBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginBody")
            .field("identifier", &self.identifier)
            .field("platform", &self.platform)
            .field("device_id", &self.device_id)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
pub struct RefreshBody {
    pub refresh_token: String,
    pub device_id: Option<String>,
}

#[derive(Deserialize)]
pub struct DeviceRenewBody {
    pub offline_token: String,
    pub device_id: String,
    pub device_fingerprint: Option<String>,
}

#[derive(Deserialize)]
pub struct OfflineValidateBody {
    pub offline_token: String,
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnbindBody {
    pub device_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ApproveDeviceBody {
    pub device_id: String,
}

#[derive(Deserialize)]
pub struct SessionValidateBody {
    pub session_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub device_id: String,
    pub platform: Platform,
    pub is_trusted: bool,
    pub is_authorized: bool,
}

impl From<&DeviceBinding> for DeviceSummary {
    fn from(binding: &DeviceBinding) -> Self {
        Self {
            device_id: binding.device_id().as_str().to_string(),
            platform: binding.platform(),
            is_trusted: binding.is_trusted(),
            is_authorized: binding.is_authorized(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub session_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginPayload {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offline_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offline_expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceSummary>,
    pub user: UserProfile,
}

impl From<LoginResponse> for LoginPayload {
    fn from(response: LoginResponse) -> Self {
        let (offline_token, offline_expires_at) = match response.offline_token {
            Some(offline) => (Some(offline.token), Some(offline.expires_at)),
            None => (None, None),
        };
        Self {
            access_token: response.tokens.access_token,
            refresh_token: response.tokens.refresh_token,
            access_expires_at: response.tokens.access_expires_at,
            refresh_expires_at: response.tokens.refresh_expires_at,
            offline_token,
            offline_expires_at,
            session: response.session.map(|session| SessionSummary {
                session_id: session.session_id,
                session_token: session.session_token,
                expires_at: session.expires_at,
            }),
            device: response.device.as_ref().map(DeviceSummary::from),
            user: response.user,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPayload {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

impl From<TokenRefresh> for TokenPayload {
    fn from(refresh: TokenRefresh) -> Self {
        Self {
            access_token: refresh.tokens.access_token,
            refresh_token: refresh.tokens.refresh_token,
            access_expires_at: refresh.tokens.access_expires_at,
            refresh_expires_at: refresh.tokens.refresh_expires_at,
            user: refresh.user,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPayload {
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub user: UserProfile,
}

impl From<SessionValidation> for SessionPayload {
    fn from(validation: SessionValidation) -> Self {
        Self {
            session_id: validation.session_id,
            expires_at: validation.expires_at,
            last_activity: validation.last_activity,
            user: validation.user,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LogoutPayload {
    pub tokens_revoked: u64,
    pub sessions_closed: u64,
}

impl From<LogoutOutcome> for LogoutPayload {
    fn from(outcome: LogoutOutcome) -> Self {
        Self {
            tokens_revoked: outcome.tokens_revoked,
            sessions_closed: outcome.sessions_closed,
        }
    }
}
