use agrinova_model::{DeviceInfo, LoginMethod, Platform};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Risk markers recorded on a session at creation and during its life.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSecurityFlags {
    pub require_reauth: bool,
    pub suspicious_activity: bool,
    pub new_device: bool,
    pub location_change: bool,
}

/// Server-side session row. Deactivated, never deleted.
#[derive(Debug, Clone)]
pub struct UserSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub device_id: Option<String>,
    /// SHA-256 of the opaque session token.
    pub session_token_hash: String,
    pub refresh_token_hash: Option<String>,
    pub platform: Platform,
    pub device_info: DeviceInfo,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub login_method: LoginMethod,
    pub flags: SessionSecurityFlags,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserSession {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at > now
    }

    /// The device id tokens for this session are bound to: the client
    /// device when known, the session id otherwise.
    pub fn token_device_id(&self) -> String {
        self.device_id
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }
}
