#![allow(dead_code)]

use std::sync::Arc;

use agrinova_core::auth::memory::InMemoryAuthStore;
use agrinova_core::auth::{AuthCrypto, AuthSettings, build_orchestrator};
use agrinova_core::model::{Role, ScopeGrants};
use agrinova_core::rls::RlsOptions;
use agrinova_server::{AppState, create_app};
use anyhow::Result;
use axum_test::TestServer;
use uuid::Uuid;

pub const PASSWORD: &str = "demo123";

/// Server over in-memory stores with direct access to those stores.
pub struct TestApp {
    pub server: TestServer,
    pub store: InMemoryAuthStore,
    pub crypto: Arc<AuthCrypto>,
    pub company: Uuid,
    pub estate: Uuid,
    pub division: Uuid,
}

impl TestApp {
    pub fn build() -> Result<Self> {
        let store = InMemoryAuthStore::default();
        let crypto = Arc::new(AuthCrypto::for_tests());
        let orchestrator = build_orchestrator(
            store.repositories(),
            crypto.clone(),
            AuthSettings::for_tests(),
        );
        let state = AppState::new(Arc::new(orchestrator), None, RlsOptions::default());
        let server = TestServer::new(create_app(state))
            .map_err(|err| anyhow::anyhow!(err.to_string()))?;
        Ok(Self {
            server,
            store,
            crypto,
            company: Uuid::now_v7(),
            estate: Uuid::now_v7(),
            division: Uuid::now_v7(),
        })
    }

    pub fn grants(&self) -> ScopeGrants {
        ScopeGrants::new(vec![self.company], vec![self.estate], vec![self.division])
    }

    pub async fn seed(&self, username: &str, role: Role) -> Result<Uuid> {
        self.store
            .seed_user(&self.crypto, username, PASSWORD, role, &self.grants())
            .await
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub fn data_field<'a>(body: &'a serde_json::Value, key: &str) -> &'a str {
    body["data"][key]
        .as_str()
        .unwrap_or_else(|| panic!("{} missing", key))
}
