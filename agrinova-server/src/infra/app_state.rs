use std::fmt;
use std::sync::Arc;

use agrinova_core::auth::AuthOrchestrator;
use agrinova_core::rls::RlsOptions;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthOrchestrator>,
    /// `None` when running over in-memory stores; scoped queries then answer
    /// from the resolved context alone.
    pub pool: Option<PgPool>,
    pub rls: RlsOptions,
}

impl AppState {
    pub fn new(auth: Arc<AuthOrchestrator>, pool: Option<PgPool>, rls: RlsOptions) -> Self {
        Self { auth, pool, rls }
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("database", &self.pool.is_some())
            .field("rls", &self.rls)
            .finish_non_exhaustive()
    }
}
