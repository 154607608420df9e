use std::fmt;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::context::RlsContext;
use crate::auth::domain::repositories::UserAccountRepository;
use crate::auth::error::{AuthError, AuthResult};

/// Recomputes a caller's [`RlsContext`] from the user record and the
/// assignment chain. Nothing is cached between requests.
pub struct ScopeResolver {
    users: Arc<dyn UserAccountRepository>,
}

impl fmt::Debug for ScopeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeResolver")
            .field("user_repo_refs", &Arc::strong_count(&self.users))
            .finish()
    }
}

impl ScopeResolver {
    pub fn new(users: Arc<dyn UserAccountRepository>) -> Self {
        Self { users }
    }

    /// Fails with [`AuthError::AccountInactive`] for missing, inactive, or
    /// soft-deleted accounts.
    pub async fn resolve(&self, user_id: Uuid) -> AuthResult<RlsContext> {
        let account = self
            .users
            .find_by_id(user_id)
            .await?
            .filter(|account| account.can_authenticate())
            .ok_or(AuthError::AccountInactive)?;

        let grants = self.users.load_assignments(user_id).await?.effective_grants();
        let context = RlsContext::for_user(user_id, account.role, &grants);
        debug!(
            target: "agrinova::rls",
            %user_id,
            role = %context.role,
            companies = context.company_ids.len(),
            estates = context.estate_ids.len(),
            divisions = context.division_ids.len(),
            "resolved request scope"
        );
        Ok(context)
    }
}
