use agrinova_model::ScopeLevel;
use uuid::Uuid;

use super::context::RlsContext;

/// Location of a row in the hierarchy, as far as it is known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordScope {
    pub company_id: Option<Uuid>,
    pub estate_id: Option<Uuid>,
    pub division_id: Option<Uuid>,
    /// User that owns or created the row.
    pub owner_id: Option<Uuid>,
}

/// Application-side mirror of the database policies.
///
/// Same rules as the SQL helpers: no context denies, SUPER_ADMIN is allowed
/// by an explicit role check, and empty id lists grant nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopePolicy;

impl ScopePolicy {
    pub fn can_access_company(ctx: Option<&RlsContext>, company_id: Uuid) -> bool {
        let Some(ctx) = ctx else { return false };
        ctx.role.is_super_admin() || ctx.company_ids.contains(&company_id)
    }

    pub fn can_access_estate(
        ctx: Option<&RlsContext>,
        estate_id: Uuid,
        company_id: Uuid,
    ) -> bool {
        let Some(ctx) = ctx else { return false };
        if ctx.role.is_super_admin() || ctx.estate_ids.contains(&estate_id) {
            return true;
        }
        ctx.role.scope_level() == ScopeLevel::Company
            && ctx.company_ids.contains(&company_id)
    }

    pub fn can_access_division(
        ctx: Option<&RlsContext>,
        division_id: Uuid,
        estate_id: Uuid,
        company_id: Uuid,
    ) -> bool {
        let Some(ctx) = ctx else { return false };
        if ctx.role.is_super_admin() || ctx.division_ids.contains(&division_id)
        {
            return true;
        }
        match ctx.role.scope_level() {
            ScopeLevel::Company => ctx.company_ids.contains(&company_id),
            ScopeLevel::Estate => ctx.estate_ids.contains(&estate_id),
            _ => false,
        }
    }

    /// Role-driven check for arbitrary business rows.
    pub fn can_access_record(ctx: Option<&RlsContext>, record: &RecordScope) -> bool {
        let Some(ctx) = ctx else { return false };
        if record.owner_id == Some(ctx.user_id) {
            return true;
        }
        let hit = |ids: &[Uuid], id: Option<Uuid>| id.is_some_and(|id| ids.contains(&id));
        match ctx.role.scope_level() {
            ScopeLevel::Global => true,
            ScopeLevel::Company => hit(&ctx.company_ids, record.company_id),
            ScopeLevel::Estate => hit(&ctx.estate_ids, record.estate_id),
            ScopeLevel::Division => hit(&ctx.division_ids, record.division_id),
            ScopeLevel::Own => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agrinova_model::Role;

    fn ctx(role: Role, companies: Vec<Uuid>, estates: Vec<Uuid>, divisions: Vec<Uuid>) -> RlsContext {
        RlsContext {
            user_id: Uuid::now_v7(),
            role,
            company_ids: companies,
            estate_ids: estates,
            division_ids: divisions,
        }
    }

    #[test]
    fn absent_context_denies_everything() {
        let id = Uuid::now_v7();
        assert!(!ScopePolicy::can_access_company(None, id));
        assert!(!ScopePolicy::can_access_estate(None, id, id));
        assert!(!ScopePolicy::can_access_division(None, id, id, id));
        assert!(!ScopePolicy::can_access_record(None, &RecordScope::default()));
    }

    #[test]
    fn empty_arrays_grant_nothing_except_for_super_admin() {
        let company = Uuid::now_v7();
        let manager = ctx(Role::Manager, vec![], vec![], vec![]);
        let admin = ctx(Role::SuperAdmin, vec![], vec![], vec![]);
        assert!(!ScopePolicy::can_access_company(Some(&manager), company));
        assert!(ScopePolicy::can_access_company(Some(&admin), company));
    }

    #[test]
    fn company_roles_reach_estates_of_their_companies() {
        let company = Uuid::now_v7();
        let estate = Uuid::now_v7();
        let area = ctx(Role::AreaManager, vec![company], vec![], vec![]);
        let mandor = ctx(Role::Mandor, vec![company], vec![], vec![]);
        assert!(ScopePolicy::can_access_estate(Some(&area), estate, company));
        assert!(!ScopePolicy::can_access_estate(Some(&mandor), estate, company));
    }

    #[test]
    fn records_follow_role_level() {
        let company = Uuid::now_v7();
        let estate = Uuid::now_v7();
        let division = Uuid::now_v7();
        let record = RecordScope {
            company_id: Some(company),
            estate_id: Some(estate),
            division_id: Some(division),
            owner_id: None,
        };

        let asisten = ctx(Role::Asisten, vec![company], vec![estate], vec![division]);
        let other_division = ctx(Role::Asisten, vec![company], vec![estate], vec![Uuid::now_v7()]);
        let mandor = ctx(Role::Mandor, vec![company], vec![estate], vec![division]);

        assert!(ScopePolicy::can_access_record(Some(&asisten), &record));
        assert!(!ScopePolicy::can_access_record(Some(&other_division), &record));
        assert!(!ScopePolicy::can_access_record(Some(&mandor), &record));

        let own = RecordScope {
            owner_id: Some(mandor.user_id),
            ..record
        };
        assert!(ScopePolicy::can_access_record(Some(&mandor), &own));
    }
}
