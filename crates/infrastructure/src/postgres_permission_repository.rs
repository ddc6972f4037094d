use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use protecta_application::PermissionStore;
use protecta_core::{AppError, AppResult};
use protecta_domain::{
    Action, CountryCode, FieldVisibility, Permission, PermissionId, Resource, RoleId,
};

use crate::storage::{is_unique_violation, map_storage_error};

/// PostgreSQL-backed repository for permission grants.
#[derive(Clone)]
pub struct PostgresPermissionRepository {
    pool: PgPool,
}

impl PostgresPermissionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: Uuid,
    role_id: Uuid,
    resource: String,
    action: String,
    field_restrictions: serde_json::Value,
    conditions: serde_json::Value,
    country_code: Option<String>,
    is_active: bool,
}

impl PermissionRow {
    fn into_permission(self) -> AppResult<Permission> {
        let resource = Resource::from_str(self.resource.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "invalid stored resource '{}': {error}",
                self.resource
            ))
        })?;
        let action = Action::from_str(self.action.as_str()).map_err(|error| {
            AppError::Internal(format!("invalid stored action '{}': {error}", self.action))
        })?;
        let field_restrictions: BTreeMap<String, FieldVisibility> =
            serde_json::from_value(self.field_restrictions).map_err(|error| {
                AppError::Internal(format!("invalid stored field restrictions: {error}"))
            })?;
        let country_code = self
            .country_code
            .map(|value| {
                CountryCode::new(value.as_str()).map_err(|error| {
                    AppError::Internal(format!("invalid stored country code '{value}': {error}"))
                })
            })
            .transpose()?;

        Ok(Permission {
            id: PermissionId::from_uuid(self.id),
            role_id: RoleId::from_uuid(self.role_id),
            resource,
            action,
            field_restrictions,
            conditions: self.conditions,
            country_code,
            is_active: self.is_active,
        })
    }
}

const PERMISSION_COLUMNS: &str = r#"
    id,
    role_id,
    resource,
    action,
    field_restrictions,
    conditions,
    country_code,
    is_active
"#;

fn field_restrictions_json(permission: &Permission) -> AppResult<serde_json::Value> {
    serde_json::to_value(&permission.field_restrictions).map_err(|error| {
        AppError::Internal(format!("failed to encode field restrictions: {error}"))
    })
}

fn map_insert_error(error: sqlx::Error, permission: &Permission) -> AppError {
    if is_unique_violation(&error) {
        AppError::DuplicatePermission(format!(
            "active grant ({}, {}) already exists for role '{}'",
            permission.resource.as_str(),
            permission.action.as_str(),
            permission.role_id
        ))
    } else {
        map_storage_error(error, "failed to insert permission")
    }
}

#[async_trait]
impl PermissionStore for PostgresPermissionRepository {
    async fn list_permissions(&self, role_id: RoleId) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(&format!(
            r#"
            SELECT {PERMISSION_COLUMNS}
            FROM permissions
            WHERE role_id = $1 AND is_active
            ORDER BY resource, action
            "#
        ))
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_storage_error(error, "failed to list permissions"))?;

        rows.into_iter().map(PermissionRow::into_permission).collect()
    }

    async fn list_permissions_for_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<Permission>> {
        let ids: Vec<Uuid> = role_ids.iter().map(RoleId::as_uuid).collect();

        let rows = sqlx::query_as::<_, PermissionRow>(&format!(
            r#"
            SELECT {PERMISSION_COLUMNS}
            FROM permissions
            WHERE role_id = ANY($1) AND is_active
            "#
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| map_storage_error(error, "failed to list permissions"))?;

        rows.into_iter().map(PermissionRow::into_permission).collect()
    }

    async fn get_permission(&self, permission_id: PermissionId) -> AppResult<Permission> {
        let row = sqlx::query_as::<_, PermissionRow>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE id = $1"
        ))
        .bind(permission_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| map_storage_error(error, "failed to load permission"))?
        .ok_or_else(|| AppError::NotFound(format!("permission '{permission_id}'")))?;

        row.into_permission()
    }

    async fn insert_permission(&self, permission: Permission) -> AppResult<()> {
        let field_restrictions = field_restrictions_json(&permission)?;

        sqlx::query(
            r#"
            INSERT INTO permissions (
                id,
                role_id,
                resource,
                action,
                field_restrictions,
                conditions,
                country_code,
                is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(permission.id.as_uuid())
        .bind(permission.role_id.as_uuid())
        .bind(permission.resource.as_str())
        .bind(permission.action.as_str())
        .bind(&field_restrictions)
        .bind(&permission.conditions)
        .bind(permission.country_code.as_ref().map(CountryCode::as_str))
        .bind(permission.is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| map_insert_error(error, &permission))?;

        Ok(())
    }

    async fn update_permission(&self, permission: &Permission) -> AppResult<()> {
        let field_restrictions = field_restrictions_json(permission)?;

        let rows_affected = sqlx::query(
            r#"
            UPDATE permissions
            SET field_restrictions = $2,
                conditions = $3,
                country_code = $4
            WHERE id = $1
            "#,
        )
        .bind(permission.id.as_uuid())
        .bind(&field_restrictions)
        .bind(&permission.conditions)
        .bind(permission.country_code.as_ref().map(CountryCode::as_str))
        .execute(&self.pool)
        .await
        .map_err(|error| map_storage_error(error, "failed to update permission"))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!("permission '{}'", permission.id)));
        }

        Ok(())
    }

    async fn deactivate_permission(&self, permission_id: PermissionId) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE permissions
            SET is_active = false
            WHERE id = $1
            "#,
        )
        .bind(permission_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| map_storage_error(error, "failed to deactivate permission"))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!("permission '{permission_id}'")));
        }

        Ok(())
    }

    async fn replace_all_permissions(
        &self,
        role_id: RoleId,
        new_set: Vec<Permission>,
    ) -> AppResult<()> {
        let mut transaction = self
            .pool
            .begin()
            .await
            .map_err(|error| map_storage_error(error, "failed to begin transaction"))?;

        sqlx::query(
            r#"
            UPDATE permissions
            SET is_active = false
            WHERE role_id = $1 AND is_active
            "#,
        )
        .bind(role_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_storage_error(error, "failed to retire permission set"))?;

        for permission in &new_set {
            let field_restrictions = field_restrictions_json(permission)?;

            sqlx::query(
                r#"
                INSERT INTO permissions (
                    id,
                    role_id,
                    resource,
                    action,
                    field_restrictions,
                    conditions,
                    country_code,
                    is_active
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(permission.id.as_uuid())
            .bind(permission.role_id.as_uuid())
            .bind(permission.resource.as_str())
            .bind(permission.action.as_str())
            .bind(&field_restrictions)
            .bind(&permission.conditions)
            .bind(permission.country_code.as_ref().map(CountryCode::as_str))
            .bind(permission.is_active)
            .execute(&mut *transaction)
            .await
            .map_err(|error| map_insert_error(error, permission))?;
        }

        transaction
            .commit()
            .await
            .map_err(|error| map_storage_error(error, "failed to commit transaction"))?;

        Ok(())
    }
}
