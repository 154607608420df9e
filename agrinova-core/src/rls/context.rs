use agrinova_model::{Role, ScopeGrants};
use uuid::Uuid;

use crate::auth::domain::aggregates::VerifiedUser;

/// The five values row-level policies are evaluated against.
///
/// A plain value, computed per request and handed to the data layer; it is
/// never stored in a global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RlsContext {
    pub user_id: Uuid,
    pub role: Role,
    pub company_ids: Vec<Uuid>,
    pub estate_ids: Vec<Uuid>,
    pub division_ids: Vec<Uuid>,
}

impl RlsContext {
    /// SUPER_ADMIN gets empty arrays: all-access comes from the explicit role
    /// check in the policies, never from the arrays.
    pub fn for_user(user_id: Uuid, role: Role, grants: &ScopeGrants) -> Self {
        if role.is_super_admin() {
            return Self {
                user_id,
                role,
                company_ids: Vec::new(),
                estate_ids: Vec::new(),
                division_ids: Vec::new(),
            };
        }
        Self {
            user_id,
            role,
            company_ids: grants.company_ids.clone(),
            estate_ids: grants.estate_ids.clone(),
            division_ids: grants.division_ids.clone(),
        }
    }

    pub fn from_verified(user: &VerifiedUser) -> Self {
        Self::for_user(user.id(), user.role(), &user.grants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn super_admin_context_carries_no_ids() {
        let grants = ScopeGrants::new([Uuid::now_v7()], [], []);
        let ctx = RlsContext::for_user(Uuid::now_v7(), Role::SuperAdmin, &grants);
        assert!(ctx.company_ids.is_empty());
        assert!(ctx.estate_ids.is_empty());
        assert!(ctx.division_ids.is_empty());
    }

    #[test]
    fn scoped_roles_copy_their_grants() {
        let company = Uuid::now_v7();
        let estate = Uuid::now_v7();
        let grants = ScopeGrants::new([company], [estate], []);
        let ctx = RlsContext::for_user(Uuid::now_v7(), Role::Manager, &grants);
        assert_eq!(ctx.company_ids, vec![company]);
        assert_eq!(ctx.estate_ids, vec![estate]);
    }
}
