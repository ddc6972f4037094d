use chrono::Utc;
use protecta_core::{CompanyId, UserId};
use protecta_domain::{AssignmentId, AuditAction, RoleId, UserRoleAssignment};

use super::*;

use crate::access_ports::AssignRoleInput;

impl AccessAdminService {
    /// Assigns a role to a user and emits an audit event.
    pub async fn assign_role(
        &self,
        actor: &UserIdentity,
        input: AssignRoleInput,
    ) -> AppResult<UserRoleAssignment> {
        self.require_roles_permission(actor, Action::Manage).await?;

        let role = self.roles.get_role(input.role_id).await?;
        if !role.is_active {
            return Err(AppError::Validation(format!(
                "role '{}' is deactivated and cannot be assigned",
                role.role_key
            )));
        }

        if let Some(expires_at) = input.expires_at
            && expires_at <= Utc::now()
        {
            return Err(AppError::Validation(
                "assignment expiry must lie in the future".to_owned(),
            ));
        }

        let assignment = UserRoleAssignment {
            id: AssignmentId::new(),
            user_id: input.user_id,
            role_id: role.id,
            company_id: input.company_id,
            location_id: input.location_id,
            granted_by: actor.user_id(),
            granted_at: Utc::now(),
            expires_at: input.expires_at,
            is_active: true,
        };

        self.assignments.insert_assignment(assignment.clone()).await?;

        self.append_audit_event(AuditEvent {
            company_id: input.company_id,
            actor: actor.user_id(),
            action: AuditAction::RoleAssigned,
            resource_type: "assignment".to_owned(),
            resource_id: format!("{}:{}", assignment.user_id, role.role_key),
            detail: Some(format!(
                "assigned role '{}' to user '{}'",
                role.role_key, assignment.user_id
            )),
        })
        .await?;

        Ok(assignment)
    }

    /// Revokes a role assignment; the row stays for the audit trail.
    ///
    /// Idempotent: revoking an already-inactive assignment is a no-op.
    pub async fn revoke_role(
        &self,
        actor: &UserIdentity,
        user_id: UserId,
        role_id: RoleId,
        company_id: Option<CompanyId>,
    ) -> AppResult<()> {
        self.require_roles_permission(actor, Action::Manage).await?;

        self.assignments
            .revoke_assignment(user_id, role_id, company_id)
            .await?;

        self.append_audit_event(AuditEvent {
            company_id,
            actor: actor.user_id(),
            action: AuditAction::RoleRevoked,
            resource_type: "assignment".to_owned(),
            resource_id: format!("{user_id}:{role_id}"),
            detail: Some(format!(
                "revoked role '{role_id}' from user '{user_id}'"
            )),
        })
        .await
    }

    /// Lists active assignments of a user.
    pub async fn list_user_assignments(
        &self,
        actor: &UserIdentity,
        user_id: UserId,
        tenant: Option<CompanyId>,
    ) -> AppResult<Vec<UserRoleAssignment>> {
        self.require_roles_permission(actor, Action::Read).await?;
        self.assignments.list_user_assignments(user_id, tenant).await
    }

    /// Lists active assignments holding a role.
    pub async fn list_role_assignees(
        &self,
        actor: &UserIdentity,
        role_id: RoleId,
        tenant: Option<CompanyId>,
    ) -> AppResult<Vec<UserRoleAssignment>> {
        self.require_roles_permission(actor, Action::Read).await?;
        self.assignments.list_role_assignees(role_id, tenant).await
    }
}
