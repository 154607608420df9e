use std::sync::Arc;

use agrinova_config::{AuthConfig, Config, DatabaseConfig, RlsConfig, ServerConfig};
use agrinova_core::auth::{
    AuthCrypto, AuthRepositories, AuthSettings, OrchestratorConfig,
    TokenConfig, build_orchestrator,
};
use agrinova_core::model::RateLimitRule;
use agrinova_core::rls::RlsOptions;
use anyhow::{Context, anyhow};
use axum::http::{HeaderValue, Method, header};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::{info, warn};
use zeroize::Zeroizing;

use super::app_state::AppState;

/// Map loaded configuration onto the auth core's settings.
pub fn auth_settings(config: &AuthConfig) -> anyhow::Result<AuthSettings> {
    let tokens = TokenConfig {
        access_secret: Zeroizing::new(config.access_secret.clone()),
        refresh_secret: Zeroizing::new(config.refresh_secret.clone()),
        issuer: config.issuer.clone(),
        access_ttl: chrono_duration("access ttl", config.access_ttl)?,
        refresh_ttl: chrono_duration("refresh ttl", config.refresh_ttl)?,
        offline_ttl: chrono_duration("offline ttl", config.offline_ttl)?,
        leeway_secs: config.leeway.as_secs(),
        legacy_hash_cutover: config.legacy_hash_cutover,
    };
    let orchestrator = OrchestratorConfig {
        session_ttl: chrono_duration("session ttl", config.session_ttl)?,
        remember_me_ttl: chrono_duration(
            "remember-me ttl",
            config.remember_me_ttl,
        )?,
        refresh_rotation: config.refresh_rotation,
    };
    Ok(AuthSettings {
        tokens,
        orchestrator,
        device_trust: config.device_trust,
        login_limit: RateLimitRule::login(
            config.login_attempt_limit,
            config.login_attempt_window,
        ),
    })
}

fn chrono_duration(
    name: &str,
    value: std::time::Duration,
) -> anyhow::Result<chrono::Duration> {
    chrono::Duration::from_std(value)
        .map_err(|_| anyhow!("{name} of {value:?} is out of range"))
}

pub fn rls_options(config: &RlsConfig) -> RlsOptions {
    RlsOptions {
        request_timeout: config.request_timeout,
        data_role: config.data_role.clone(),
    }
}

pub async fn connect_database(config: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let url = config
        .url
        .as_deref()
        .context("DATABASE_URL must be set to run the server")?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(url)
        .await
        .context("failed to connect to PostgreSQL")?;
    info!(
        max_connections = config.max_connections,
        "database pool ready"
    );
    Ok(pool)
}

/// Wire the orchestrator over Postgres and assemble the shared state.
pub fn build_state(config: &Config, pool: PgPool) -> anyhow::Result<AppState> {
    let crypto = Arc::new(
        AuthCrypto::new(config.auth.password_pepper.as_deref())
            .context("failed to initialise password hashing")?,
    );
    let settings = auth_settings(&config.auth)?;
    info!(
        issuer = %settings.tokens.issuer,
        device_trust = %settings.device_trust,
        refresh_rotation = %settings.orchestrator.refresh_rotation,
        leeway_secs = settings.tokens.leeway_secs,
        login_attempt_limit = settings.login_limit.limit,
        "auth settings in effect"
    );
    let orchestrator = build_orchestrator(
        AuthRepositories::postgres(pool.clone()),
        crypto,
        settings,
    );
    Ok(AppState::new(
        Arc::new(orchestrator),
        Some(pool),
        rls_options(&config.rls),
    ))
}

/// `None` when no origins are configured, leaving the router same-origin.
pub fn cors_layer(config: &ServerConfig) -> Option<CorsLayer> {
    if config.cors_allowed_origins.is_empty() {
        return None;
    }
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(AllowMethods::list([Method::GET, Method::POST]))
            .allow_headers(AllowHeaders::list([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
            ])),
    )
}
