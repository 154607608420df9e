use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Role, ScopeGrants};

/// User-facing projection of an account, returned after login.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub company_id: Option<Uuid>,
    pub assignments: ScopeGrants,
    pub created_at: DateTime<Utc>,
}
