pub mod sources;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use agrinova_model::{DeviceTrustPolicy, RefreshRotation};
use chrono::{DateTime, Utc};

use crate::constants::{DEFAULT_ACCESS_SECRET, DEFAULT_REFRESH_SECRET};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub rls: RlsConfig,
    pub dev_mode: bool,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Browser origins allowed by CORS. Empty means same-origin only.
    pub cors_allowed_origins: Vec<String>,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

/// Token, session, and device settings consumed by the auth core.
#[derive(Clone)]
pub struct AuthConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub offline_ttl: Duration,
    pub session_ttl: Duration,
    pub remember_me_ttl: Duration,
    /// Clock-skew tolerance applied to `exp` checks.
    pub leeway: Duration,
    /// Legacy token hashes are accepted strictly before this instant.
    pub legacy_hash_cutover: Option<DateTime<Utc>>,
    pub password_pepper: Option<String>,
    pub device_trust: DeviceTrustPolicy,
    pub refresh_rotation: RefreshRotation,
    /// Failed logins allowed per client address and identifier.
    pub login_attempt_limit: u32,
    pub login_attempt_window: Duration,
}

impl AuthConfig {
    pub fn is_default_access_secret(&self) -> bool {
        self.access_secret == DEFAULT_ACCESS_SECRET
    }

    pub fn is_default_refresh_secret(&self) -> bool {
        self.refresh_secret == DEFAULT_REFRESH_SECRET
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("offline_ttl", &self.offline_ttl)
            .field("session_ttl", &self.session_ttl)
            .field("remember_me_ttl", &self.remember_me_ttl)
            .field("leeway", &self.leeway)
            .field("legacy_hash_cutover", &self.legacy_hash_cutover)
            .field(
                "password_pepper",
                &self.password_pepper.as_ref().map(|_| "<redacted>"),
            )
            .field("device_trust", &self.device_trust)
            .field("refresh_rotation", &self.refresh_rotation)
            .field("login_attempt_limit", &self.login_attempt_limit)
            .field("login_attempt_window", &self.login_attempt_window)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RlsConfig {
    /// Upper bound for work executed under a request's RLS context.
    pub request_timeout: Duration,
    /// Database role data transactions switch to. `None` keeps the login
    /// role, which only makes sense when that role is already subject to
    /// row-level policies.
    pub data_role: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
