//! Postgres adapters for the auth repository ports.

pub mod repositories;

use std::sync::Arc;

use sqlx::PgPool;

use super::AuthRepositories;
use repositories::{
    PostgresDeviceBindingRepository, PostgresTokenRecordRepository,
    PostgresUserAccountRepository, PostgresUserSessionRepository,
};

impl AuthRepositories {
    /// All four stores backed by the same pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PostgresUserAccountRepository::new(pool.clone())),
            devices: Arc::new(PostgresDeviceBindingRepository::new(pool.clone())),
            tokens: Arc::new(PostgresTokenRecordRepository::new(pool.clone())),
            sessions: Arc::new(PostgresUserSessionRepository::new(pool)),
        }
    }
}
