use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::constants::MAX_LEEWAY;
use crate::models::Config;

/// Configuration that must never reach a running server.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigGuardRailError {
    #[error("{0} must be set and non-empty")]
    MissingSecret(&'static str),
    #[error("access and refresh signing secrets must differ")]
    SharedSigningSecret,
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("refresh ttl must not be shorter than access ttl")]
    RefreshShorterThanAccess,
    #[error("clock-skew leeway of {0}s exceeds the {max}s ceiling", max = MAX_LEEWAY.as_secs())]
    LeewayTooLarge(u64),
    #[error("issuer must not be empty")]
    EmptyIssuer,
    #[error("login attempt limit must be greater than zero")]
    ZeroLoginAttemptLimit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.hint {
            Some(hint) => write!(f, "{} ({hint})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push(&mut self, message: impl Into<String>, hint: Option<&str>) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: hint.map(str::to_string),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }

    /// Emit every warning through `tracing` at `warn` level.
    pub fn log(&self) {
        for warning in &self.items {
            tracing::warn!(target: "agrinova::config", "{warning}");
        }
    }
}

/// Check hard guard rails and collect softer warnings.
pub fn validate(
    config: &Config,
    now: DateTime<Utc>,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let auth = &config.auth;

    if auth.access_secret.trim().is_empty() {
        return Err(ConfigGuardRailError::MissingSecret("access secret"));
    }
    if auth.refresh_secret.trim().is_empty() {
        return Err(ConfigGuardRailError::MissingSecret("refresh secret"));
    }
    if auth.access_secret == auth.refresh_secret {
        return Err(ConfigGuardRailError::SharedSigningSecret);
    }
    if auth.issuer.trim().is_empty() {
        return Err(ConfigGuardRailError::EmptyIssuer);
    }

    for (name, value) in [
        ("access ttl", auth.access_ttl),
        ("refresh ttl", auth.refresh_ttl),
        ("offline ttl", auth.offline_ttl),
        ("session ttl", auth.session_ttl),
        ("remember-me ttl", auth.remember_me_ttl),
        ("login attempt window", auth.login_attempt_window),
        ("rls request timeout", config.rls.request_timeout),
    ] {
        if value.is_zero() {
            return Err(ConfigGuardRailError::ZeroDuration(name));
        }
    }

    if auth.login_attempt_limit == 0 {
        return Err(ConfigGuardRailError::ZeroLoginAttemptLimit);
    }
    if auth.refresh_ttl < auth.access_ttl {
        return Err(ConfigGuardRailError::RefreshShorterThanAccess);
    }
    if auth.leeway > MAX_LEEWAY {
        return Err(ConfigGuardRailError::LeewayTooLarge(auth.leeway.as_secs()));
    }

    let mut warnings = ConfigWarnings::default();

    if auth.is_default_access_secret() || auth.is_default_refresh_secret() {
        warnings.push(
            "built-in development signing secrets are in use",
            Some("set JWT_ACCESS_SECRET and JWT_REFRESH_SECRET"),
        );
    }
    if config.metadata.config_path.is_none() {
        warnings.push("no config file found; using env and defaults", None);
    }
    if let Some(cutover) = auth.legacy_hash_cutover
        && cutover <= now
    {
        warnings.push(
            format!("legacy token hash cutover {cutover} has passed"),
            Some("remove LEGACY_HASH_CUTOVER once old tokens have expired"),
        );
    }
    if config.database.url.is_none() {
        warnings.push("DATABASE_URL is not set", None);
    }

    Ok(warnings)
}
