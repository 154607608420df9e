use serde::{Deserialize, Serialize};

use crate::util::{non_empty_var, parse_bool_var, parse_csv_var};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub database: FileDatabaseConfig,
    #[serde(default)]
    pub auth: FileAuthConfig,
    #[serde(default)]
    pub rls: FileRlsConfig,
    pub dev_mode: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquire_timeout: Option<String>,
}

/// Durations are humantime strings (`"15m"`, `"7d"`).
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileAuthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_ttl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_ttl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offline_ttl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_ttl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember_me_ttl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leeway: Option<String>,
    /// RFC 3339 timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legacy_hash_cutover: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_pepper: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_trust: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_rotation: Option<String>,
    /// Failed logins allowed per client and identifier inside the window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_attempt_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_attempt_window: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileRlsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<String>,
    /// `"none"` disables the role switch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_role: Option<String>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub database_url: Option<String>,
    pub database_max_connections: Option<u32>,
    pub database_acquire_timeout: Option<String>,
    pub access_secret: Option<String>,
    pub refresh_secret: Option<String>,
    pub issuer: Option<String>,
    pub access_ttl: Option<String>,
    pub refresh_ttl: Option<String>,
    pub offline_ttl: Option<String>,
    pub session_ttl: Option<String>,
    pub remember_me_ttl: Option<String>,
    pub leeway: Option<String>,
    pub legacy_hash_cutover: Option<String>,
    pub password_pepper: Option<String>,
    pub device_trust: Option<String>,
    pub refresh_rotation: Option<String>,
    pub login_attempt_limit: Option<u32>,
    pub login_attempt_window: Option<String>,
    pub rls_request_timeout: Option<String>,
    pub rls_data_role: Option<String>,
    pub dev_mode: Option<bool>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            server_host: non_empty_var("SERVER_HOST"),
            server_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|s| s.parse().ok()),
            cors_allowed_origins: parse_csv_var("CORS_ALLOWED_ORIGINS"),
            database_url: non_empty_var("DATABASE_URL"),
            database_max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok()),
            database_acquire_timeout: non_empty_var(
                "DATABASE_ACQUIRE_TIMEOUT",
            ),
            access_secret: non_empty_var("JWT_ACCESS_SECRET"),
            refresh_secret: non_empty_var("JWT_REFRESH_SECRET"),
            issuer: non_empty_var("JWT_ISSUER"),
            access_ttl: non_empty_var("JWT_ACCESS_TTL"),
            refresh_ttl: non_empty_var("JWT_REFRESH_TTL"),
            offline_ttl: non_empty_var("JWT_OFFLINE_TTL"),
            session_ttl: non_empty_var("SESSION_TTL"),
            remember_me_ttl: non_empty_var("REMEMBER_ME_TTL"),
            leeway: non_empty_var("JWT_LEEWAY"),
            legacy_hash_cutover: non_empty_var("LEGACY_HASH_CUTOVER"),
            password_pepper: non_empty_var("AUTH_PASSWORD_PEPPER"),
            device_trust: non_empty_var("DEVICE_TRUST_POLICY"),
            refresh_rotation: non_empty_var("REFRESH_ROTATION"),
            login_attempt_limit: std::env::var("LOGIN_ATTEMPT_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok()),
            login_attempt_window: non_empty_var("LOGIN_ATTEMPT_WINDOW"),
            rls_request_timeout: non_empty_var("RLS_REQUEST_TIMEOUT"),
            rls_data_role: non_empty_var("RLS_DATA_ROLE"),
            dev_mode: parse_bool_var("DEV_MODE"),
        }
    }
}
