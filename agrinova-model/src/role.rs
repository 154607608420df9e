use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::ModelError;

/// Closed set of roles a user account can hold.
///
/// Wire and storage representation is the SCREAMING_SNAKE string returned by
/// [`Role::as_str`]. Anything else is rejected at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Role {
    SuperAdmin,
    CompanyAdmin,
    AreaManager,
    Manager,
    Asisten,
    Mandor,
    Satpam,
    Timbangan,
    Grading,
}

/// Level of the company → estate → division hierarchy a role is scoped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeLevel {
    /// Unrestricted; only ever granted by an explicit role check.
    Global,
    Company,
    Estate,
    Division,
    /// Only the user's own records.
    Own,
}

impl Role {
    pub const ALL: [Role; 9] = [
        Role::SuperAdmin,
        Role::CompanyAdmin,
        Role::AreaManager,
        Role::Manager,
        Role::Asisten,
        Role::Mandor,
        Role::Satpam,
        Role::Timbangan,
        Role::Grading,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::CompanyAdmin => "COMPANY_ADMIN",
            Role::AreaManager => "AREA_MANAGER",
            Role::Manager => "MANAGER",
            Role::Asisten => "ASISTEN",
            Role::Mandor => "MANDOR",
            Role::Satpam => "SATPAM",
            Role::Timbangan => "TIMBANGAN",
            Role::Grading => "GRADING",
        }
    }

    /// Administrative roles operate from the web console only.
    pub fn has_mobile_access(&self) -> bool {
        !matches!(self, Role::SuperAdmin | Role::CompanyAdmin)
    }

    pub fn has_web_access(&self) -> bool {
        true
    }

    /// Roles allowed to approve pending mobile devices.
    pub fn can_approve_devices(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::CompanyAdmin)
    }

    pub fn is_super_admin(&self) -> bool {
        matches!(self, Role::SuperAdmin)
    }

    pub fn scope_level(&self) -> ScopeLevel {
        match self {
            Role::SuperAdmin => ScopeLevel::Global,
            Role::CompanyAdmin | Role::AreaManager => ScopeLevel::Company,
            Role::Manager | Role::Satpam | Role::Timbangan | Role::Grading => {
                ScopeLevel::Estate
            }
            Role::Asisten => ScopeLevel::Division,
            Role::Mandor => ScopeLevel::Own,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ModelError::UnknownRole(s.to_string()))
    }
}

impl TryFrom<&str> for Role {
    type Error = ModelError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_parse_back_to_the_same_role() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
    }

    #[test]
    fn unknown_and_lowercase_roles_are_rejected() {
        assert!("manager".parse::<Role>().is_err());
        assert_eq!(
            "ROOT".parse::<Role>(),
            Err(ModelError::UnknownRole("ROOT".into()))
        );
    }

    #[test]
    fn only_admins_approve_devices() {
        let approvers: Vec<Role> = Role::ALL
            .into_iter()
            .filter(Role::can_approve_devices)
            .collect();
        assert_eq!(approvers, vec![Role::SuperAdmin, Role::CompanyAdmin]);
    }

    #[test]
    fn admin_roles_are_web_only() {
        assert!(!Role::SuperAdmin.has_mobile_access());
        assert!(!Role::CompanyAdmin.has_mobile_access());
        assert!(Role::Mandor.has_mobile_access());
        assert!(Role::Manager.has_mobile_access());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_as_screaming_snake() {
        let json = serde_json::to_string(&Role::AreaManager).unwrap();
        assert_eq!(json, "\"AREA_MANAGER\"");
    }
}
