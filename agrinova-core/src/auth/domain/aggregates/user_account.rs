use agrinova_model::{Role, ScopeGrants, UserProfile};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Stored user record as the auth core sees it.
#[derive(Clone)]
pub struct UserAccount {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    /// Active and not soft-deleted.
    pub fn can_authenticate(&self) -> bool {
        self.is_active && self.deleted_at.is_none()
    }

    pub fn profile(&self, grants: &ScopeGrants) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            role: self.role,
            is_active: self.is_active,
            company_id: grants.primary_company(),
            assignments: grants.clone(),
            created_at: self.created_at,
        }
    }
}

impl std::fmt::Debug for UserAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserAccount")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .field("deleted_at", &self.deleted_at)
            .finish_non_exhaustive()
    }
}

/// One row from each level of the assignment chain, parents included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyAssignment {
    pub company_id: Uuid,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstateAssignment {
    pub estate_id: Uuid,
    pub company_id: Uuid,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivisionAssignment {
    pub division_id: Uuid,
    pub estate_id: Uuid,
    pub is_active: bool,
}

/// Raw assignment rows for a user, in assignment order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentSnapshot {
    pub companies: Vec<CompanyAssignment>,
    pub estates: Vec<EstateAssignment>,
    pub divisions: Vec<DivisionAssignment>,
}

impl AssignmentSnapshot {
    /// Evaluate the chain top-down.
    ///
    /// An estate grant counts only while the user holds an active grant for
    /// the estate's company; a division grant only while its estate grant
    /// counts.
    pub fn effective_grants(&self) -> ScopeGrants {
        let companies: Vec<Uuid> = self
            .companies
            .iter()
            .filter(|c| c.is_active)
            .map(|c| c.company_id)
            .collect();

        let estates: Vec<Uuid> = self
            .estates
            .iter()
            .filter(|e| e.is_active && companies.contains(&e.company_id))
            .map(|e| e.estate_id)
            .collect();

        let divisions: Vec<Uuid> = self
            .divisions
            .iter()
            .filter(|d| d.is_active && estates.contains(&d.estate_id))
            .map(|d| d.division_id)
            .collect();

        ScopeGrants::new(companies, estates, divisions)
    }
}

/// Output of a successful credential check.
#[derive(Debug, Clone)]
pub struct VerifiedUser {
    pub account: UserAccount,
    pub grants: ScopeGrants,
}

impl VerifiedUser {
    pub fn id(&self) -> Uuid {
        self.account.id
    }

    pub fn role(&self) -> Role {
        self.account.role
    }

    pub fn profile(&self) -> UserProfile {
        self.account.profile(&self.grants)
    }
}
