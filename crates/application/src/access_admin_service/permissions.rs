use protecta_domain::{AuditAction, Permission, PermissionId, RoleId};

use super::*;

use crate::access_ports::{PermissionGrantInput, UpdatePermissionInput};

impl AccessAdminService {
    /// Lists the active permission set of one role.
    pub async fn list_permissions(
        &self,
        actor: &UserIdentity,
        role_id: RoleId,
    ) -> AppResult<Vec<Permission>> {
        self.require_roles_permission(actor, Action::Read).await?;
        self.permissions.list_permissions(role_id).await
    }

    /// Adds a permission grant to a role and emits an audit event.
    pub async fn add_permission(
        &self,
        actor: &UserIdentity,
        role_id: RoleId,
        input: PermissionGrantInput,
    ) -> AppResult<Permission> {
        self.require_roles_permission(actor, Action::Manage).await?;

        let role = self.roles.get_role(role_id).await?;
        let permission = Permission {
            id: PermissionId::new(),
            role_id: role.id,
            resource: input.resource,
            action: input.action,
            field_restrictions: input.field_restrictions,
            conditions: input.conditions,
            country_code: input.country_code,
            is_active: true,
        };

        self.permissions.insert_permission(permission.clone()).await?;

        self.append_audit_event(AuditEvent {
            company_id: actor.company_id(),
            actor: actor.user_id(),
            action: AuditAction::PermissionAdded,
            resource_type: "permission".to_owned(),
            resource_id: grant_label(role.role_key.as_str(), &permission),
            detail: None,
        })
        .await?;

        Ok(permission)
    }

    /// Applies a partial update to a permission grant.
    pub async fn update_permission(
        &self,
        actor: &UserIdentity,
        permission_id: PermissionId,
        input: UpdatePermissionInput,
    ) -> AppResult<Permission> {
        self.require_roles_permission(actor, Action::Manage).await?;

        let mut permission = self.permissions.get_permission(permission_id).await?;

        if let Some(field_restrictions) = input.field_restrictions {
            permission.field_restrictions = field_restrictions;
        }
        if let Some(conditions) = input.conditions {
            permission.conditions = conditions;
        }
        if let Some(country_code) = input.country_code {
            permission.country_code = Some(country_code);
        }

        self.permissions.update_permission(&permission).await?;

        self.append_audit_event(AuditEvent {
            company_id: actor.company_id(),
            actor: actor.user_id(),
            action: AuditAction::PermissionUpdated,
            resource_type: "permission".to_owned(),
            resource_id: permission.id.to_string(),
            detail: None,
        })
        .await?;

        Ok(permission)
    }

    /// Soft-deactivates a permission grant.
    pub async fn remove_permission(
        &self,
        actor: &UserIdentity,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        self.require_roles_permission(actor, Action::Manage).await?;

        self.permissions.deactivate_permission(permission_id).await?;

        self.append_audit_event(AuditEvent {
            company_id: actor.company_id(),
            actor: actor.user_id(),
            action: AuditAction::PermissionRemoved,
            resource_type: "permission".to_owned(),
            resource_id: permission_id.to_string(),
            detail: None,
        })
        .await
    }

    /// Replaces the role's whole active permission set.
    ///
    /// The prior set is fully deactivated before the new set is inserted,
    /// so a failure never leaves a stale-plus-fresh mixture for the role.
    pub async fn replace_all_permissions(
        &self,
        actor: &UserIdentity,
        role_id: RoleId,
        grants: Vec<PermissionGrantInput>,
    ) -> AppResult<Vec<Permission>> {
        self.require_roles_permission(actor, Action::Manage).await?;

        let role = self.roles.get_role(role_id).await?;

        let mut seen = std::collections::BTreeSet::new();
        let mut permissions = Vec::with_capacity(grants.len());
        for input in grants {
            let tuple = (
                input.resource.as_str(),
                input.action.as_str(),
                input.country_code.as_ref().map(|country| country.as_str().to_owned()),
            );
            if !seen.insert(tuple) {
                return Err(AppError::DuplicatePermission(format!(
                    "replacement set repeats ({}, {}) for role '{}'",
                    input.resource.as_str(),
                    input.action.as_str(),
                    role.role_key
                )));
            }

            permissions.push(Permission {
                id: PermissionId::new(),
                role_id: role.id,
                resource: input.resource,
                action: input.action,
                field_restrictions: input.field_restrictions,
                conditions: input.conditions,
                country_code: input.country_code,
                is_active: true,
            });
        }

        self.permissions
            .replace_all_permissions(role.id, permissions.clone())
            .await?;

        self.append_audit_event(AuditEvent {
            company_id: actor.company_id(),
            actor: actor.user_id(),
            action: AuditAction::PermissionsReplaced,
            resource_type: "role".to_owned(),
            resource_id: role.role_key.as_str().to_owned(),
            detail: Some(format!(
                "replaced permission set of '{}' with {} grants",
                role.role_key,
                permissions.len()
            )),
        })
        .await?;

        Ok(permissions)
    }
}

fn grant_label(role_key: &str, permission: &Permission) -> String {
    format!(
        "{role_key}:{}:{}",
        permission.resource.as_str(),
        permission.action.as_str()
    )
}
