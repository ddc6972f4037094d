use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use protecta_application::RoleStore;
use protecta_core::{AppError, AppResult, UserId};
use protecta_domain::{CountryCode, Role, RoleId, RoleKey};

use crate::storage::{is_unique_violation, map_storage_error};

/// PostgreSQL-backed repository for role definitions.
#[derive(Clone)]
pub struct PostgresRoleRepository {
    pool: PgPool,
}

impl PostgresRoleRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: Uuid,
    role_key: String,
    role_name: String,
    description: Option<String>,
    country_code: Option<String>,
    is_system: bool,
    is_active: bool,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    metadata: serde_json::Value,
}

impl RoleRow {
    fn into_role(self) -> AppResult<Role> {
        let role_key = RoleKey::new(self.role_key.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "invalid stored role key '{}': {error}",
                self.role_key
            ))
        })?;
        let country_code = self
            .country_code
            .map(|value| {
                CountryCode::new(value.as_str()).map_err(|error| {
                    AppError::Internal(format!("invalid stored country code '{value}': {error}"))
                })
            })
            .transpose()?;

        Ok(Role {
            id: RoleId::from_uuid(self.id),
            role_key,
            role_name: self.role_name,
            description: self.description,
            country_code,
            is_system: self.is_system,
            is_active: self.is_active,
            created_by: UserId::from_uuid(self.created_by),
            created_at: self.created_at,
            metadata: self.metadata,
        })
    }
}

const ROLE_COLUMNS: &str = r#"
    id,
    role_key,
    role_name,
    description,
    country_code,
    is_system,
    is_active,
    created_by,
    created_at,
    metadata
"#;

#[async_trait]
impl RoleStore for PostgresRoleRepository {
    async fn insert_role(&self, role: Role) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO roles (
                id,
                role_key,
                role_name,
                description,
                country_code,
                is_system,
                is_active,
                created_by,
                created_at,
                metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(role.id.as_uuid())
        .bind(role.role_key.as_str())
        .bind(role.role_name.as_str())
        .bind(role.description.as_deref())
        .bind(role.country_code.as_ref().map(CountryCode::as_str))
        .bind(role.is_system)
        .bind(role.is_active)
        .bind(role.created_by.as_uuid())
        .bind(role.created_at)
        .bind(&role.metadata)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            if is_unique_violation(&error) {
                AppError::DuplicateRoleKey(format!(
                    "role key '{}' already exists",
                    role.role_key
                ))
            } else {
                map_storage_error(error, "failed to insert role")
            }
        })?;

        Ok(())
    }

    async fn update_role(&self, role: &Role) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE roles
            SET role_name = $2,
                description = $3,
                country_code = $4,
                is_active = $5,
                metadata = $6
            WHERE id = $1
            "#,
        )
        .bind(role.id.as_uuid())
        .bind(role.role_name.as_str())
        .bind(role.description.as_deref())
        .bind(role.country_code.as_ref().map(CountryCode::as_str))
        .bind(role.is_active)
        .bind(&role.metadata)
        .execute(&self.pool)
        .await
        .map_err(|error| map_storage_error(error, "failed to update role"))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!("role '{}'", role.id)));
        }

        Ok(())
    }

    async fn get_role(&self, role_id: RoleId) -> AppResult<Role> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"
        ))
        .bind(role_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| map_storage_error(error, "failed to load role"))?
        .ok_or_else(|| AppError::NotFound(format!("role '{role_id}'")))?;

        row.into_role()
    }

    async fn get_role_by_key(&self, role_key: &RoleKey) -> AppResult<Role> {
        let row = sqlx::query_as::<_, RoleRow>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE role_key = $1"
        ))
        .bind(role_key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| map_storage_error(error, "failed to load role"))?
        .ok_or_else(|| AppError::NotFound(format!("role '{role_key}'")))?;

        row.into_role()
    }

    async fn list_roles(&self, country_filter: Option<&CountryCode>) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(&format!(
            r#"
            SELECT {ROLE_COLUMNS}
            FROM roles
            WHERE $1::text IS NULL
                OR country_code IS NULL
                OR country_code = $1
            ORDER BY role_key
            "#
        ))
        .bind(country_filter.map(CountryCode::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_storage_error(error, "failed to list roles"))?;

        rows.into_iter().map(RoleRow::into_role).collect()
    }
}
