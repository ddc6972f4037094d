use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use protecta_application::{AssignmentStore, ValidAssignment};
use protecta_core::{AppError, AppResult, CompanyId, LocationId, UserId};
use protecta_domain::{
    AssignmentId, CountryCode, Role, RoleId, RoleKey, UserRoleAssignment,
};

use crate::storage::{is_unique_violation, map_storage_error};

/// PostgreSQL-backed repository for user-role assignments.
#[derive(Clone)]
pub struct PostgresAssignmentRepository {
    pool: PgPool,
}

impl PostgresAssignmentRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    id: Uuid,
    user_id: Uuid,
    role_id: Uuid,
    company_id: Option<Uuid>,
    location_id: Option<Uuid>,
    granted_by: Uuid,
    granted_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
}

impl AssignmentRow {
    fn into_assignment(self) -> UserRoleAssignment {
        UserRoleAssignment {
            id: AssignmentId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            role_id: RoleId::from_uuid(self.role_id),
            company_id: self.company_id.map(CompanyId::from_uuid),
            location_id: self.location_id.map(LocationId::from_uuid),
            granted_by: UserId::from_uuid(self.granted_by),
            granted_at: self.granted_at,
            expires_at: self.expires_at,
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, FromRow)]
struct ValidAssignmentRow {
    id: Uuid,
    user_id: Uuid,
    role_id: Uuid,
    company_id: Option<Uuid>,
    location_id: Option<Uuid>,
    granted_by: Uuid,
    granted_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
    role_key: String,
    role_name: String,
    role_description: Option<String>,
    role_country_code: Option<String>,
    role_is_system: bool,
    role_is_active: bool,
    role_created_by: Uuid,
    role_created_at: DateTime<Utc>,
    role_metadata: serde_json::Value,
}

impl ValidAssignmentRow {
    fn into_valid_assignment(self) -> AppResult<ValidAssignment> {
        let role_key = RoleKey::new(self.role_key.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "invalid stored role key '{}': {error}",
                self.role_key
            ))
        })?;
        let country_code = self
            .role_country_code
            .map(|value| {
                CountryCode::new(value.as_str()).map_err(|error| {
                    AppError::Internal(format!("invalid stored country code '{value}': {error}"))
                })
            })
            .transpose()?;

        let role = Role {
            id: RoleId::from_uuid(self.role_id),
            role_key,
            role_name: self.role_name,
            description: self.role_description,
            country_code,
            is_system: self.role_is_system,
            is_active: self.role_is_active,
            created_by: UserId::from_uuid(self.role_created_by),
            created_at: self.role_created_at,
            metadata: self.role_metadata,
        };
        let assignment = UserRoleAssignment {
            id: AssignmentId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            role_id: RoleId::from_uuid(self.role_id),
            company_id: self.company_id.map(CompanyId::from_uuid),
            location_id: self.location_id.map(LocationId::from_uuid),
            granted_by: UserId::from_uuid(self.granted_by),
            granted_at: self.granted_at,
            expires_at: self.expires_at,
            is_active: self.is_active,
        };

        Ok(ValidAssignment { assignment, role })
    }
}

#[async_trait]
impl AssignmentStore for PostgresAssignmentRepository {
    async fn insert_assignment(&self, assignment: UserRoleAssignment) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (
                id,
                user_id,
                role_id,
                company_id,
                location_id,
                granted_by,
                granted_at,
                expires_at,
                is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(assignment.id.as_uuid())
        .bind(assignment.user_id.as_uuid())
        .bind(assignment.role_id.as_uuid())
        .bind(assignment.company_id.map(|company_id| company_id.as_uuid()))
        .bind(assignment.location_id.map(|location_id| location_id.as_uuid()))
        .bind(assignment.granted_by.as_uuid())
        .bind(assignment.granted_at)
        .bind(assignment.expires_at)
        .bind(assignment.is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                AppError::DuplicateAssignment(format!(
                    "user '{}' already holds role '{}' in this scope",
                    assignment.user_id, assignment.role_id
                ))
            } else {
                map_storage_error(error, "failed to insert assignment")
            }
        })?;

        Ok(())
    }

    async fn revoke_assignment(
        &self,
        user_id: UserId,
        role_id: RoleId,
        company_id: Option<CompanyId>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE user_roles
            SET is_active = false
            WHERE user_id = $1
                AND role_id = $2
                AND company_id IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .bind(company_id.map(|company_id| company_id.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(|error| map_storage_error(error, "failed to revoke assignment"))?;

        Ok(())
    }

    async fn list_valid_assignments(
        &self,
        user_id: UserId,
        tenant: Option<CompanyId>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<ValidAssignment>> {
        let rows = sqlx::query_as::<_, ValidAssignmentRow>(
            r#"
            SELECT
                user_roles.id,
                user_roles.user_id,
                user_roles.role_id,
                user_roles.company_id,
                user_roles.location_id,
                user_roles.granted_by,
                user_roles.granted_at,
                user_roles.expires_at,
                user_roles.is_active,
                roles.role_key,
                roles.role_name,
                roles.description AS role_description,
                roles.country_code AS role_country_code,
                roles.is_system AS role_is_system,
                roles.is_active AS role_is_active,
                roles.created_by AS role_created_by,
                roles.created_at AS role_created_at,
                roles.metadata AS role_metadata
            FROM user_roles
            INNER JOIN roles
                ON roles.id = user_roles.role_id
            WHERE user_roles.user_id = $1
                AND user_roles.is_active
                AND roles.is_active
                AND (user_roles.expires_at IS NULL OR user_roles.expires_at > $3)
                AND ($2::uuid IS NULL
                    OR user_roles.company_id IS NULL
                    OR user_roles.company_id = $2)
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(tenant.map(|company_id| company_id.as_uuid()))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_storage_error(error, "failed to list valid assignments"))?;

        rows.into_iter()
            .map(ValidAssignmentRow::into_valid_assignment)
            .collect()
    }

    async fn list_user_assignments(
        &self,
        user_id: UserId,
        tenant: Option<CompanyId>,
    ) -> AppResult<Vec<UserRoleAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT
                id,
                user_id,
                role_id,
                company_id,
                location_id,
                granted_by,
                granted_at,
                expires_at,
                is_active
            FROM user_roles
            WHERE user_id = $1
                AND is_active
                AND ($2::uuid IS NULL OR company_id IS NULL OR company_id = $2)
            ORDER BY granted_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(tenant.map(|company_id| company_id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_storage_error(error, "failed to list user assignments"))?;

        Ok(rows.into_iter().map(AssignmentRow::into_assignment).collect())
    }

    async fn list_role_assignees(
        &self,
        role_id: RoleId,
        tenant: Option<CompanyId>,
    ) -> AppResult<Vec<UserRoleAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT
                id,
                user_id,
                role_id,
                company_id,
                location_id,
                granted_by,
                granted_at,
                expires_at,
                is_active
            FROM user_roles
            WHERE role_id = $1
                AND is_active
                AND ($2::uuid IS NULL OR company_id IS NULL OR company_id = $2)
            ORDER BY granted_at DESC
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(tenant.map(|company_id| company_id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_storage_error(error, "failed to list role assignees"))?;

        Ok(rows.into_iter().map(AssignmentRow::into_assignment).collect())
    }
}
