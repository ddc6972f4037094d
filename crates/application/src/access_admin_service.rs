use std::sync::Arc;

use protecta_core::{AppError, AppResult, UserIdentity};
use protecta_domain::{Action, Resource};

use crate::access_ports::{AssignmentStore, PermissionStore, RoleStore};
use crate::audit::{AuditEvent, AuditRepository};
use crate::permission_evaluator::PermissionEvaluator;

mod assignments;
mod permissions;
mod roles;
#[cfg(test)]
mod tests;

/// Application service for role, permission, and assignment administration.
#[derive(Clone)]
pub struct AccessAdminService {
    roles: Arc<dyn RoleStore>,
    permissions: Arc<dyn PermissionStore>,
    assignments: Arc<dyn AssignmentStore>,
    evaluator: PermissionEvaluator,
    audit_repository: Arc<dyn AuditRepository>,
}

impl AccessAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        roles: Arc<dyn RoleStore>,
        permissions: Arc<dyn PermissionStore>,
        assignments: Arc<dyn AssignmentStore>,
        evaluator: PermissionEvaluator,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            roles,
            permissions,
            assignments,
            evaluator,
            audit_repository,
        }
    }

    async fn require_roles_permission(
        &self,
        actor: &UserIdentity,
        action: Action,
    ) -> AppResult<()> {
        let allowed = self
            .evaluator
            .has_permission(actor.user_id(), actor.company_id(), Resource::Roles, action)
            .await?;

        if allowed {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "user '{}' is missing '{}' on roles",
                actor.user_id(),
                action.as_str()
            )))
        }
    }

    async fn append_audit_event(&self, event: AuditEvent) -> AppResult<()> {
        self.audit_repository.append_event(event).await
    }
}
