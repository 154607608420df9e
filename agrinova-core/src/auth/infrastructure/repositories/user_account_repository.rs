use std::fmt;

use agrinova_model::Role;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::auth::domain::aggregates::{
    AssignmentSnapshot, CompanyAssignment, DivisionAssignment,
    EstateAssignment, UserAccount,
};
use crate::auth::domain::repositories::UserAccountRepository;

pub struct PostgresUserAccountRepository {
    pool: PgPool,
}

impl fmt::Debug for PostgresUserAccountRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresUserAccountRepository").finish()
    }
}

impl PostgresUserAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    display_name: String,
    email: Option<String>,
    phone: Option<String>,
    password_hash: String,
    role: String,
    is_active: bool,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserAccount {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        let role: Role = row
            .role
            .parse()
            .with_context(|| format!("user {} has an unknown role", row.id))?;
        Ok(UserAccount {
            id: row.id,
            username: row.username,
            display_name: row.display_name,
            email: row.email,
            phone: row.phone,
            password_hash: row.password_hash,
            role,
            is_active: row.is_active,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const USER_COLUMNS: &str = r#"
    id, username, display_name, email, phone, password_hash, role,
    is_active, deleted_at, created_at, updated_at
"#;

#[async_trait]
impl UserAccountRepository for PostgresUserAccountRepository {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<UserAccount>> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE LOWER(username) = LOWER($1)
               OR LOWER(email) = LOWER($1)
               OR phone = $1
            ORDER BY (LOWER(username) = LOWER($1)) DESC
            LIMIT 1
            "#
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await
            .context("failed to look up user by identifier")?;

        row.map(UserAccount::try_from).transpose()
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserAccount>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load user")?;

        row.map(UserAccount::try_from).transpose()
    }

    async fn load_assignments(
        &self,
        user_id: Uuid,
    ) -> Result<AssignmentSnapshot> {
        let companies: Vec<(Uuid, bool)> = sqlx::query_as(
            r#"
            SELECT company_id, is_active
            FROM user_company_assignments
            WHERE user_id = $1
            ORDER BY assigned_at, company_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to load company assignments")?;

        let estates: Vec<(Uuid, Uuid, bool)> = sqlx::query_as(
            r#"
            SELECT a.estate_id, e.company_id, a.is_active
            FROM user_estate_assignments a
            JOIN estates e ON e.id = a.estate_id
            WHERE a.user_id = $1
            ORDER BY a.assigned_at, a.estate_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to load estate assignments")?;

        let divisions: Vec<(Uuid, Uuid, bool)> = sqlx::query_as(
            r#"
            SELECT a.division_id, d.estate_id, a.is_active
            FROM user_division_assignments a
            JOIN divisions d ON d.id = a.division_id
            WHERE a.user_id = $1
            ORDER BY a.assigned_at, a.division_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to load division assignments")?;

        Ok(AssignmentSnapshot {
            companies: companies
                .into_iter()
                .map(|(company_id, is_active)| CompanyAssignment {
                    company_id,
                    is_active,
                })
                .collect(),
            estates: estates
                .into_iter()
                .map(|(estate_id, company_id, is_active)| EstateAssignment {
                    estate_id,
                    company_id,
                    is_active,
                })
                .collect(),
            divisions: divisions
                .into_iter()
                .map(|(division_id, estate_id, is_active)| DivisionAssignment {
                    division_id,
                    estate_id,
                    is_active,
                })
                .collect(),
        })
    }
}
