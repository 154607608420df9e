use std::fmt;
use std::time::Duration;

use agrinova_model::Role;
use futures::future::BoxFuture;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::{debug, warn};
use uuid::Uuid;

use super::context::RlsContext;
use crate::auth::error::{AuthError, AuthResult};

/// Database role data queries switch to inside an [`RlsSession`].
pub const DEFAULT_DATA_ROLE: &str = "agrinova_app";

#[derive(Debug, Clone)]
pub struct RlsOptions {
    /// Bound on begin + work + finish for one request.
    pub request_timeout: Duration,
    /// Role assumed for the transaction so policies apply even when the pool
    /// logs in as the table owner. `None` keeps the login role.
    pub data_role: Option<String>,
}

impl Default for RlsOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            data_role: Some(DEFAULT_DATA_ROLE.to_string()),
        }
    }
}

/// Scoped guard owning one transaction with the caller's context installed.
///
/// The five context values are transaction-local. [`RlsSession::finish`]
/// clears them and commits; dropping the guard any other way (error, panic,
/// cancelled future) rolls the transaction back, which discards them before
/// the connection goes back to the pool.
pub struct RlsSession {
    tx: Transaction<'static, Postgres>,
    user_id: Uuid,
}

impl fmt::Debug for RlsSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RlsSession")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl RlsSession {
    pub async fn begin(
        pool: &PgPool,
        context: &RlsContext,
        options: &RlsOptions,
    ) -> AuthResult<Self> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT app_set_user_context($1, $2, $3, $4, $5)")
            .bind(context.user_id)
            .bind(context.role.as_str())
            .bind(&context.company_ids)
            .bind(&context.estate_ids)
            .bind(&context.division_ids)
            .execute(&mut *tx)
            .await?;

        if let Some(role) = options.data_role.as_deref() {
            sqlx::query("SELECT set_config('role', $1, true)")
                .bind(role)
                .execute(&mut *tx)
                .await?;
        }

        debug!(
            target: "agrinova::rls",
            user_id = %context.user_id,
            role = %context.role,
            "context installed"
        );
        Ok(Self {
            tx,
            user_id: context.user_id,
        })
    }

    /// Connection for data queries; the context is live on it.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    pub async fn finish(mut self) -> AuthResult<()> {
        sqlx::query("SELECT app_clear_user_context()")
            .execute(&mut *self.tx)
            .await?;
        self.tx.commit().await?;
        debug!(target: "agrinova::rls", user_id = %self.user_id, "context cleared");
        Ok(())
    }
}

/// Run `work` with `context` installed, bounded by the request timeout.
///
/// The context is gone once this returns, whatever the outcome.
pub async fn with_rls_context<T, F>(
    pool: &PgPool,
    context: &RlsContext,
    options: &RlsOptions,
    work: F,
) -> AuthResult<T>
where
    T: Send,
    F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, AuthResult<T>> + Send,
{
    let scoped = async {
        let mut session = RlsSession::begin(pool, context, options).await?;
        let value = work(session.conn()).await?;
        session.finish().await?;
        Ok(value)
    };

    match tokio::time::timeout(options.request_timeout, scoped).await {
        Ok(result) => result,
        Err(_) => {
            warn!(
                target: "agrinova::rls",
                user_id = %context.user_id,
                timeout_ms = options.request_timeout.as_millis() as u64,
                "context-bound work timed out"
            );
            Err(AuthError::Timeout)
        }
    }
}

pub async fn current_user_id(conn: &mut PgConnection) -> AuthResult<Option<Uuid>> {
    Ok(sqlx::query_scalar("SELECT app_get_user_id()")
        .fetch_one(conn)
        .await?)
}

/// `None` when unset. A stored value outside the closed role set also reads
/// as `None`, so policies built on it deny.
pub async fn current_role(conn: &mut PgConnection) -> AuthResult<Option<Role>> {
    let raw: Option<String> = sqlx::query_scalar("SELECT app_get_user_role()")
        .fetch_one(conn)
        .await?;
    Ok(raw.and_then(|raw| match raw.parse() {
        Ok(role) => Some(role),
        Err(err) => {
            warn!(target: "agrinova::rls", error = %err, "unrecognised role in context");
            None
        }
    }))
}

pub async fn current_company_ids(conn: &mut PgConnection) -> AuthResult<Vec<Uuid>> {
    uuid_array(conn, "SELECT COALESCE(app_get_company_ids(), ARRAY[]::uuid[])").await
}

pub async fn current_estate_ids(conn: &mut PgConnection) -> AuthResult<Vec<Uuid>> {
    uuid_array(conn, "SELECT COALESCE(app_get_estate_ids(), ARRAY[]::uuid[])").await
}

pub async fn current_division_ids(conn: &mut PgConnection) -> AuthResult<Vec<Uuid>> {
    uuid_array(conn, "SELECT COALESCE(app_get_division_ids(), ARRAY[]::uuid[])").await
}

async fn uuid_array(conn: &mut PgConnection, sql: &'static str) -> AuthResult<Vec<Uuid>> {
    Ok(sqlx::query_scalar(sql).fetch_one(conn).await?)
}
