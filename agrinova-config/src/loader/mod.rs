pub mod error;

use std::path::{Path, PathBuf};
use std::time::Duration;

use agrinova_model::{DeviceTrustPolicy, RefreshRotation};
use chrono::{DateTime, Utc};
use tracing::debug;
use url::Url;

use crate::constants::*;
use crate::models::sources::{EnvConfig, FileConfig};
use crate::models::{
    AuthConfig, Config, ConfigMetadata, DatabaseConfig, RlsConfig,
    ServerConfig,
};
use crate::util::parse_duration;
use crate::validation::{ConfigWarnings, validate};

use error::ConfigLoadError;

/// Fully composed configuration together with any non-fatal warnings.
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_file: Option<PathBuf>,
    skip_env_file: bool,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    pub fn skip_env_file(mut self) -> Self {
        self.skip_env_file = true;
        self
    }

    /// Read `.env`, the TOML file and the process environment, then compose
    /// and validate.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = self.load_env_file()?;

        let config_path = self.resolve_config_path();
        let file = match &config_path {
            Some(path) => read_file_config(path)?,
            None => FileConfig::default(),
        };

        let metadata = ConfigMetadata {
            config_path,
            env_file_loaded,
        };
        compose(file, EnvConfig::gather(), metadata, Utc::now())
    }

    fn load_env_file(&self) -> Result<bool, ConfigLoadError> {
        if self.skip_env_file {
            return Ok(false);
        }
        match &self.env_file {
            Some(path) => dotenvy::from_path(path)
                .map(|_| true)
                .map_err(|source| ConfigLoadError::EnvFile {
                    path: path.clone(),
                    source,
                }),
            None => match dotenvy::dotenv() {
                Ok(path) => {
                    debug!(path = %path.display(), "loaded env file");
                    Ok(true)
                }
                Err(err) if err.not_found() => Ok(false),
                Err(source) => Err(ConfigLoadError::EnvFile {
                    path: PathBuf::from(".env"),
                    source,
                }),
            },
        }
    }

    fn resolve_config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            return Some(path.clone());
        }
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV)
            && !path.trim().is_empty()
        {
            return Some(PathBuf::from(path));
        }
        [
            PathBuf::from(DEFAULT_CONFIG_FILE),
            Path::new("config").join(DEFAULT_CONFIG_FILE),
        ]
        .into_iter()
        .find(|candidate| candidate.is_file())
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let raw = std::fs::read_to_string(path).map_err(|source| {
        ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        }
    })?;
    toml::from_str(&raw).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge file and env sources over defaults, then run guard rails.
///
/// Env values take precedence over file values.
pub fn compose(
    file: FileConfig,
    env: EnvConfig,
    metadata: ConfigMetadata,
    now: DateTime<Utc>,
) -> Result<ConfigLoad, ConfigLoadError> {
    let server = ServerConfig {
        host: env
            .server_host
            .or(file.server.host)
            .unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
        port: env
            .server_port
            .or(file.server.port)
            .unwrap_or(DEFAULT_SERVER_PORT),
        cors_allowed_origins: env
            .cors_allowed_origins
            .unwrap_or(file.server.cors_allowed_origins),
    };

    let database_url = env.database_url.or(file.database.url);
    if let Some(url) = &database_url {
        Url::parse(url)
            .map_err(|source| ConfigLoadError::InvalidDatabaseUrl { source })?;
    }
    let database = DatabaseConfig {
        url: database_url,
        max_connections: env
            .database_max_connections
            .or(file.database.max_connections)
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
        acquire_timeout: duration(
            "database.acquire_timeout",
            env.database_acquire_timeout
                .or(file.database.acquire_timeout),
            DEFAULT_DB_ACQUIRE_TIMEOUT,
        )?,
    };

    let fa = file.auth;
    let auth = AuthConfig {
        access_secret: env
            .access_secret
            .or(fa.access_secret)
            .unwrap_or_else(|| DEFAULT_ACCESS_SECRET.to_string()),
        refresh_secret: env
            .refresh_secret
            .or(fa.refresh_secret)
            .unwrap_or_else(|| DEFAULT_REFRESH_SECRET.to_string()),
        issuer: env
            .issuer
            .or(fa.issuer)
            .unwrap_or_else(|| DEFAULT_ISSUER.to_string()),
        access_ttl: duration(
            "auth.access_ttl",
            env.access_ttl.or(fa.access_ttl),
            DEFAULT_ACCESS_TTL,
        )?,
        refresh_ttl: duration(
            "auth.refresh_ttl",
            env.refresh_ttl.or(fa.refresh_ttl),
            DEFAULT_REFRESH_TTL,
        )?,
        offline_ttl: duration(
            "auth.offline_ttl",
            env.offline_ttl.or(fa.offline_ttl),
            DEFAULT_OFFLINE_TTL,
        )?,
        session_ttl: duration(
            "auth.session_ttl",
            env.session_ttl.or(fa.session_ttl),
            DEFAULT_SESSION_TTL,
        )?,
        remember_me_ttl: duration(
            "auth.remember_me_ttl",
            env.remember_me_ttl.or(fa.remember_me_ttl),
            DEFAULT_REMEMBER_ME_TTL,
        )?,
        leeway: duration(
            "auth.leeway",
            env.leeway.or(fa.leeway),
            DEFAULT_LEEWAY,
        )?,
        legacy_hash_cutover: timestamp(
            "auth.legacy_hash_cutover",
            env.legacy_hash_cutover.or(fa.legacy_hash_cutover),
        )?,
        password_pepper: env
            .password_pepper
            .or(fa.password_pepper)
            .filter(|pepper| !pepper.is_empty()),
        device_trust: parsed::<DeviceTrustPolicy>(
            "auth.device_trust",
            env.device_trust.or(fa.device_trust),
        )?
        .unwrap_or_default(),
        refresh_rotation: parsed::<RefreshRotation>(
            "auth.refresh_rotation",
            env.refresh_rotation.or(fa.refresh_rotation),
        )?
        .unwrap_or_default(),
        login_attempt_limit: env
            .login_attempt_limit
            .or(fa.login_attempt_limit)
            .unwrap_or(DEFAULT_LOGIN_ATTEMPT_LIMIT),
        login_attempt_window: duration(
            "auth.login_attempt_window",
            env.login_attempt_window.or(fa.login_attempt_window),
            DEFAULT_LOGIN_ATTEMPT_WINDOW,
        )?,
    };

    let rls = RlsConfig {
        request_timeout: duration(
            "rls.request_timeout",
            env.rls_request_timeout.or(file.rls.request_timeout),
            DEFAULT_RLS_REQUEST_TIMEOUT,
        )?,
        data_role: data_role(env.rls_data_role.or(file.rls.data_role))?,
    };

    let config = Config {
        server,
        database,
        auth,
        rls,
        dev_mode: env.dev_mode.or(file.dev_mode).unwrap_or(false),
        metadata,
    };

    let warnings = validate(&config, now)?;
    Ok(ConfigLoad { config, warnings })
}

fn duration(
    key: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigLoadError> {
    match raw {
        None => Ok(default),
        Some(value) => parse_duration(&value).map_err(|source| {
            ConfigLoadError::InvalidDuration { key, value, source }
        }),
    }
}

fn data_role(raw: Option<String>) -> Result<Option<String>, ConfigLoadError> {
    let Some(value) = raw else {
        return Ok(Some(DEFAULT_RLS_DATA_ROLE.to_string()));
    };
    let value = value.trim();
    if value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(ConfigLoadError::InvalidValue {
            key: "rls.data_role",
            message: format!("'{value}' is not a plain role name"),
        });
    }
    Ok(Some(value.to_string()))
}

fn timestamp(
    key: &'static str,
    raw: Option<String>,
) -> Result<Option<DateTime<Utc>>, ConfigLoadError> {
    raw.map(|value| {
        DateTime::parse_from_rfc3339(value.trim())
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|source| ConfigLoadError::InvalidTimestamp {
                key,
                value,
                source,
            })
    })
    .transpose()
}

fn parsed<T>(
    key: &'static str,
    raw: Option<String>,
) -> Result<Option<T>, ConfigLoadError>
where
    T: std::str::FromStr<Err = String>,
{
    raw.map(|value| {
        value
            .parse::<T>()
            .map_err(|message| ConfigLoadError::InvalidValue { key, message })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ConfigGuardRailError;

    fn env_with_secrets() -> EnvConfig {
        EnvConfig {
            access_secret: Some("access-secret-for-tests".into()),
            refresh_secret: Some("refresh-secret-for-tests".into()),
            ..EnvConfig::default()
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn defaults_apply_when_sources_are_empty() {
        let load = compose(
            FileConfig::default(),
            env_with_secrets(),
            ConfigMetadata::default(),
            now(),
        )
        .unwrap();

        let auth = &load.config.auth;
        assert_eq!(auth.access_ttl, DEFAULT_ACCESS_TTL);
        assert_eq!(auth.refresh_ttl, DEFAULT_REFRESH_TTL);
        assert_eq!(auth.issuer, DEFAULT_ISSUER);
        assert_eq!(auth.device_trust, DeviceTrustPolicy::TrustFirstDevice);
        assert_eq!(auth.refresh_rotation, RefreshRotation::RevokeFamily);
        assert_eq!(auth.login_attempt_limit, DEFAULT_LOGIN_ATTEMPT_LIMIT);
        assert_eq!(auth.login_attempt_window, DEFAULT_LOGIN_ATTEMPT_WINDOW);
        assert_eq!(load.config.server.port, DEFAULT_SERVER_PORT);
        assert_eq!(
            load.config.rls.data_role.as_deref(),
            Some(DEFAULT_RLS_DATA_ROLE)
        );
    }

    #[test]
    fn data_role_can_be_disabled_or_renamed() {
        let file: FileConfig = toml::from_str(
            r#"
            [rls]
            data_role = "none"
            request_timeout = "5s"
            "#,
        )
        .unwrap();
        let load = compose(
            file.clone(),
            env_with_secrets(),
            ConfigMetadata::default(),
            now(),
        )
        .unwrap();
        assert_eq!(load.config.rls.data_role, None);
        assert_eq!(load.config.rls.request_timeout, Duration::from_secs(5));

        let env = EnvConfig {
            rls_data_role: Some("estate_reader".into()),
            ..env_with_secrets()
        };
        let load =
            compose(file, env, ConfigMetadata::default(), now()).unwrap();
        assert_eq!(load.config.rls.data_role.as_deref(), Some("estate_reader"));
    }

    #[test]
    fn data_role_must_be_a_plain_identifier() {
        let env = EnvConfig {
            rls_data_role: Some("app; DROP TABLE users".into()),
            ..env_with_secrets()
        };
        let err = compose(
            FileConfig::default(),
            env,
            ConfigMetadata::default(),
            now(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::InvalidValue { key: "rls.data_role", .. }
        ));
    }

    #[test]
    fn env_overrides_file_values() {
        let file: FileConfig = toml::from_str(
            r#"
            [server]
            port = 9000
            cors_allowed_origins = ["https://app.agrinova.test"]

            [auth]
            access_ttl = "30m"
            issuer = "from-file"
            "#,
        )
        .unwrap();
        let env = EnvConfig {
            issuer: Some("from-env".into()),
            ..env_with_secrets()
        };

        let load =
            compose(file, env, ConfigMetadata::default(), now()).unwrap();
        assert_eq!(load.config.server.port, 9000);
        assert_eq!(
            load.config.server.cors_allowed_origins,
            vec!["https://app.agrinova.test".to_string()]
        );
        assert_eq!(load.config.auth.issuer, "from-env");
        assert_eq!(load.config.auth.access_ttl, Duration::from_secs(1800));
    }

    #[test]
    fn login_attempt_budget_comes_from_file_or_env() {
        let file: FileConfig = toml::from_str(
            r#"
            [auth]
            login_attempt_limit = 10
            login_attempt_window = "1m"
            "#,
        )
        .unwrap();
        let load = compose(
            file.clone(),
            env_with_secrets(),
            ConfigMetadata::default(),
            now(),
        )
        .unwrap();
        assert_eq!(load.config.auth.login_attempt_limit, 10);
        assert_eq!(
            load.config.auth.login_attempt_window,
            Duration::from_secs(60)
        );

        let env = EnvConfig {
            login_attempt_limit: Some(0),
            ..env_with_secrets()
        };
        let err =
            compose(file, env, ConfigMetadata::default(), now()).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::GuardRail(ConfigGuardRailError::ZeroLoginAttemptLimit)
        ));
    }

    #[test]
    fn identical_secrets_are_rejected() {
        let env = EnvConfig {
            access_secret: Some("same".into()),
            refresh_secret: Some("same".into()),
            ..EnvConfig::default()
        };
        let err = compose(
            FileConfig::default(),
            env,
            ConfigMetadata::default(),
            now(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::GuardRail(ConfigGuardRailError::SharedSigningSecret)
        ));
    }

    #[test]
    fn oversized_leeway_is_rejected() {
        let env = EnvConfig {
            leeway: Some("10m".into()),
            ..env_with_secrets()
        };
        let err = compose(
            FileConfig::default(),
            env,
            ConfigMetadata::default(),
            now(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::GuardRail(ConfigGuardRailError::LeewayTooLarge(600))
        ));
    }

    #[test]
    fn malformed_duration_names_the_key() {
        let env = EnvConfig {
            refresh_ttl: Some("a week".into()),
            ..env_with_secrets()
        };
        let err = compose(
            FileConfig::default(),
            env,
            ConfigMetadata::default(),
            now(),
        )
        .unwrap_err();
        match err {
            ConfigLoadError::InvalidDuration { key, .. } => {
                assert_eq!(key, "auth.refresh_ttl")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn default_secrets_and_past_cutover_only_warn() {
        let env = EnvConfig {
            legacy_hash_cutover: Some("2025-06-01T00:00:00Z".into()),
            ..EnvConfig::default()
        };
        let load = compose(
            FileConfig::default(),
            env,
            ConfigMetadata::default(),
            now(),
        )
        .unwrap();
        let messages: Vec<String> =
            load.warnings.iter().map(|w| w.message.clone()).collect();
        assert!(messages.iter().any(|m| m.contains("development signing")));
        assert!(messages.iter().any(|m| m.contains("cutover")));
    }
}
