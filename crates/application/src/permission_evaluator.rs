use std::sync::Arc;

use protecta_core::{AppResult, CompanyId, UserId};
use protecta_domain::{Action, Resource, RoleId};

use crate::access_ports::{CompanyDirectory, PermissionStore};
use crate::role_resolver::{ResolvedRole, RoleResolver, fail_closed};

/// Decides allow/deny for (user, tenant, resource, action) checks.
#[derive(Clone)]
pub struct PermissionEvaluator {
    resolver: Arc<RoleResolver>,
    permissions: Arc<dyn PermissionStore>,
    directory: Arc<dyn CompanyDirectory>,
}

impl PermissionEvaluator {
    /// Creates an evaluator from the resolver and permission lookups.
    #[must_use]
    pub fn new(
        resolver: Arc<RoleResolver>,
        permissions: Arc<dyn PermissionStore>,
        directory: Arc<dyn CompanyDirectory>,
    ) -> Self {
        Self {
            resolver,
            permissions,
            directory,
        }
    }

    /// Returns whether the user may perform the action on the resource.
    ///
    /// Storage failures on this path answer `false` rather than erroring,
    /// except `UnmappedLegacyRole`, which always propagates.
    pub async fn has_permission(
        &self,
        user_id: UserId,
        tenant: Option<CompanyId>,
        resource: Resource,
        action: Action,
    ) -> AppResult<bool> {
        let roles = match self.resolver.resolve_roles(user_id, tenant).await {
            Ok(roles) => roles,
            Err(error) => return fail_closed(error, "has_permission"),
        };

        self.has_permission_for_roles(&roles, tenant, resource, action)
            .await
    }

    /// Permission check over an already-resolved role set.
    ///
    /// The super-admin bypass is total and is decided before any
    /// resource/action or tenant-country lookup happens.
    pub async fn has_permission_for_roles(
        &self,
        roles: &[ResolvedRole],
        tenant: Option<CompanyId>,
        resource: Resource,
        action: Action,
    ) -> AppResult<bool> {
        if roles.iter().any(ResolvedRole::is_super_admin) {
            return Ok(true);
        }

        let role_ids: Vec<RoleId> = roles.iter().filter_map(|role| role.role_id).collect();
        if role_ids.is_empty() {
            return Ok(false);
        }

        let tenant_country = match tenant {
            Some(company_id) => match self.directory.find_country(company_id).await {
                Ok(country) => country,
                Err(error) => return fail_closed(error, "has_permission"),
            },
            None => None,
        };

        let permissions = match self.permissions.list_permissions_for_roles(&role_ids).await {
            Ok(permissions) => permissions,
            Err(error) => return fail_closed(error, "has_permission"),
        };

        // Union across roles: any one matching grant allows the action.
        Ok(permissions
            .iter()
            .any(|permission| permission.grants(resource, action, tenant_country.as_ref())))
    }

    /// Returns whether the user holds a valid super-admin assignment.
    pub async fn is_super_admin(
        &self,
        user_id: UserId,
        tenant: Option<CompanyId>,
    ) -> AppResult<bool> {
        match self.resolver.resolve_roles(user_id, tenant).await {
            Ok(roles) => Ok(roles.iter().any(ResolvedRole::is_super_admin)),
            Err(error) => fail_closed(error, "is_super_admin"),
        }
    }
}
