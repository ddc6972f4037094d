use chrono::Utc;
use protecta_core::NonEmptyString;
use protecta_domain::{AuditAction, CountryCode, Role, RoleId, RoleKey};

use super::*;

use crate::access_ports::{CreateRoleInput, UpdateRoleInput};

impl AccessAdminService {
    /// Creates a custom role and emits an audit event.
    pub async fn create_role(
        &self,
        actor: &UserIdentity,
        input: CreateRoleInput,
    ) -> AppResult<Role> {
        self.require_roles_permission(actor, Action::Manage).await?;

        let role_key = RoleKey::new(input.role_key)?;
        let role_name = NonEmptyString::new(input.role_name)?;
        let role = Role {
            id: RoleId::new(),
            role_key,
            role_name: role_name.into(),
            description: input.description,
            country_code: input.country_code,
            is_system: false,
            is_active: true,
            created_by: actor.user_id(),
            created_at: Utc::now(),
            metadata: input.metadata,
        };

        self.roles.insert_role(role.clone()).await?;

        self.append_audit_event(AuditEvent {
            company_id: actor.company_id(),
            actor: actor.user_id(),
            action: AuditAction::RoleCreated,
            resource_type: "role".to_owned(),
            resource_id: role.role_key.as_str().to_owned(),
            detail: Some(format!("created role '{}'", role.role_key)),
        })
        .await?;

        Ok(role)
    }

    /// Applies a partial update to a role definition.
    ///
    /// System roles accept only description and metadata changes; touching
    /// their name, country scope, or activation state fails with
    /// `SystemRoleProtected`.
    pub async fn update_role(
        &self,
        actor: &UserIdentity,
        role_id: RoleId,
        input: UpdateRoleInput,
    ) -> AppResult<Role> {
        self.require_roles_permission(actor, Action::Manage).await?;

        let mut role = self.roles.get_role(role_id).await?;

        let renames = input
            .role_name
            .as_ref()
            .is_some_and(|name| name != &role.role_name);
        let rescopes = input
            .country_code
            .as_ref()
            .is_some_and(|country| Some(country) != role.country_code.as_ref());
        let toggles_activation = input
            .is_active
            .is_some_and(|is_active| is_active != role.is_active);

        if role.is_system && (renames || rescopes || toggles_activation) {
            return Err(AppError::SystemRoleProtected(format!(
                "role '{}' is platform-defined; only description and metadata may change",
                role.role_key
            )));
        }

        if let Some(role_name) = input.role_name {
            role.role_name = NonEmptyString::new(role_name)?.into();
        }
        if let Some(description) = input.description {
            role.description = Some(description);
        }
        if let Some(country_code) = input.country_code {
            role.country_code = Some(country_code);
        }
        if let Some(metadata) = input.metadata {
            role.metadata = metadata;
        }
        if let Some(is_active) = input.is_active {
            role.is_active = is_active;
        }

        self.roles.update_role(&role).await?;

        self.append_audit_event(AuditEvent {
            company_id: actor.company_id(),
            actor: actor.user_id(),
            action: AuditAction::RoleUpdated,
            resource_type: "role".to_owned(),
            resource_id: role.role_key.as_str().to_owned(),
            detail: Some(format!("updated role '{}'", role.role_key)),
        })
        .await?;

        Ok(role)
    }

    /// Soft-deactivates a role; the row stays for the audit trail.
    ///
    /// Idempotent on already-inactive roles. System roles reject
    /// deactivation entirely.
    pub async fn deactivate_role(&self, actor: &UserIdentity, role_id: RoleId) -> AppResult<()> {
        self.require_roles_permission(actor, Action::Manage).await?;

        let mut role = self.roles.get_role(role_id).await?;

        if role.is_system {
            return Err(AppError::SystemRoleProtected(format!(
                "role '{}' is platform-defined and cannot be deactivated",
                role.role_key
            )));
        }

        if !role.is_active {
            return Ok(());
        }

        role.is_active = false;
        self.roles.update_role(&role).await?;

        self.append_audit_event(AuditEvent {
            company_id: actor.company_id(),
            actor: actor.user_id(),
            action: AuditAction::RoleDeactivated,
            resource_type: "role".to_owned(),
            resource_id: role.role_key.as_str().to_owned(),
            detail: Some(format!("deactivated role '{}'", role.role_key)),
        })
        .await
    }

    /// Loads a role by identifier.
    pub async fn get_role(&self, actor: &UserIdentity, role_id: RoleId) -> AppResult<Role> {
        self.require_roles_permission(actor, Action::Read).await?;
        self.roles.get_role(role_id).await
    }

    /// Loads a role by its stable key.
    pub async fn get_role_by_key(
        &self,
        actor: &UserIdentity,
        role_key: &RoleKey,
    ) -> AppResult<Role> {
        self.require_roles_permission(actor, Action::Read).await?;
        self.roles.get_role_by_key(role_key).await
    }

    /// Lists roles visible to tenants in the given country.
    pub async fn list_roles(
        &self,
        actor: &UserIdentity,
        country_filter: Option<&CountryCode>,
    ) -> AppResult<Vec<Role>> {
        self.require_roles_permission(actor, Action::Read).await?;
        self.roles.list_roles(country_filter).await
    }
}
