#![allow(dead_code)]

use std::sync::Arc;

use agrinova_core::auth::{
    AuthCrypto, AuthOrchestrator, AuthRepositories, AuthSettings,
    LoginRequest, build_orchestrator,
};
use agrinova_core::model::{Platform, Role};
use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

pub const DEMO_PASSWORD: &str = "demo123";

/// One company with one estate and one division.
#[derive(Debug, Clone, Copy)]
pub struct Hierarchy {
    pub company: Uuid,
    pub estate: Uuid,
    pub division: Uuid,
}

/// Orchestrator wired to Postgres, plus seeding helpers.
pub struct PgHarness {
    pool: PgPool,
    crypto: Arc<AuthCrypto>,
    auth: AuthOrchestrator,
}

impl PgHarness {
    pub fn new(pool: PgPool) -> Self {
        let crypto = Arc::new(AuthCrypto::for_tests());
        let auth = build_orchestrator(
            AuthRepositories::postgres(pool.clone()),
            crypto.clone(),
            AuthSettings::for_tests(),
        );
        Self { pool, crypto, auth }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn auth(&self) -> &AuthOrchestrator {
        &self.auth
    }

    pub fn crypto(&self) -> &AuthCrypto {
        &self.crypto
    }

    pub async fn create_hierarchy(&self, name: &str) -> Result<Hierarchy> {
        let hierarchy = Hierarchy {
            company: Uuid::now_v7(),
            estate: Uuid::now_v7(),
            division: Uuid::now_v7(),
        };
        sqlx::query("INSERT INTO companies (id, name) VALUES ($1, $2)")
            .bind(hierarchy.company)
            .bind(format!("{name} company"))
            .execute(&self.pool)
            .await?;
        sqlx::query("INSERT INTO estates (id, company_id, name) VALUES ($1, $2, $3)")
            .bind(hierarchy.estate)
            .bind(hierarchy.company)
            .bind(format!("{name} estate"))
            .execute(&self.pool)
            .await?;
        sqlx::query("INSERT INTO divisions (id, estate_id, name) VALUES ($1, $2, $3)")
            .bind(hierarchy.division)
            .bind(hierarchy.estate)
            .bind(format!("{name} division"))
            .execute(&self.pool)
            .await?;
        Ok(hierarchy)
    }

    pub async fn create_user(&self, username: &str, role: Role) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let hash = self.crypto.hash_password(DEMO_PASSWORD)?;
        sqlx::query(
            r#"
            INSERT INTO users (id, username, display_name, email, password_hash, role)
            VALUES ($1, $2, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(format!("{username}@agrinova.test"))
        .bind(hash)
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    /// Grant the whole chain: company, estate, and division.
    pub async fn assign(&self, user_id: Uuid, hierarchy: Hierarchy) -> Result<()> {
        sqlx::query(
            "INSERT INTO user_company_assignments (id, user_id, company_id) VALUES ($1, $2, $3)",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(hierarchy.company)
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "INSERT INTO user_estate_assignments (id, user_id, estate_id) VALUES ($1, $2, $3)",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(hierarchy.estate)
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "INSERT INTO user_division_assignments (id, user_id, division_id) VALUES ($1, $2, $3)",
        )
        .bind(Uuid::now_v7())
        .bind(user_id)
        .bind(hierarchy.division)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_active(&self, user_id: Uuid, active: bool) -> Result<()> {
        sqlx::query("UPDATE users SET is_active = $2 WHERE id = $1")
            .bind(user_id)
            .bind(active)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

pub fn web_login(identifier: &str) -> LoginRequest {
    LoginRequest {
        identifier: identifier.into(),
        password: DEMO_PASSWORD.into(),
        platform: Platform::Web,
        ..LoginRequest::default()
    }
}

pub fn mobile_login(identifier: &str, device: &str, fingerprint: &str) -> LoginRequest {
    LoginRequest {
        identifier: identifier.into(),
        password: DEMO_PASSWORD.into(),
        platform: Platform::Android,
        device_id: Some(device.into()),
        device_fingerprint: Some(fingerprint.into()),
        ..LoginRequest::default()
    }
}
