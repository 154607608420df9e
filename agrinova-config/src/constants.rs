use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "agrinova.toml";
pub const CONFIG_PATH_ENV: &str = "AGRINOVA_CONFIG";

pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 8080;

pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_DB_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Development-only signing secrets. Startup warns loudly when these are live.
pub const DEFAULT_ACCESS_SECRET: &str = "change-me-access-secret";
pub const DEFAULT_REFRESH_SECRET: &str = "change-me-refresh-secret";

pub const DEFAULT_ISSUER: &str = "agrinova";

pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const DEFAULT_OFFLINE_TTL: Duration =
    Duration::from_secs(30 * 24 * 60 * 60);
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_REMEMBER_ME_TTL: Duration =
    Duration::from_secs(30 * 24 * 60 * 60);
pub const DEFAULT_LEEWAY: Duration = Duration::from_secs(30);
pub const MAX_LEEWAY: Duration = Duration::from_secs(300);

pub const DEFAULT_LOGIN_ATTEMPT_LIMIT: u32 = 5;
pub const DEFAULT_LOGIN_ATTEMPT_WINDOW: Duration = Duration::from_secs(5 * 60);

pub const DEFAULT_RLS_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RLS_DATA_ROLE: &str = "agrinova_app";
