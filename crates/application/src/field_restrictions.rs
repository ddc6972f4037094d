use std::collections::BTreeMap;
use std::sync::Arc;

use protecta_core::{AppResult, CompanyId, UserId};
use protecta_domain::{FieldVisibility, Resource, RoleId};

use crate::access_ports::PermissionStore;
use crate::role_resolver::{ResolvedRole, RoleResolver, fail_closed};

/// Resolves the effective per-field visibility map for one resource.
#[derive(Clone)]
pub struct FieldRestrictionResolver {
    resolver: Arc<RoleResolver>,
    permissions: Arc<dyn PermissionStore>,
}

impl FieldRestrictionResolver {
    /// Creates a resolver from the role resolver and permission lookups.
    #[must_use]
    pub fn new(resolver: Arc<RoleResolver>, permissions: Arc<dyn PermissionStore>) -> Self {
        Self {
            resolver,
            permissions,
        }
    }

    /// Returns the merged field visibility map for the user on a resource.
    ///
    /// Storage failures on this path answer the empty map; the outer layer
    /// treats missing restrictions as "nothing extra visible" only after
    /// the permission check itself has already denied or allowed.
    pub async fn field_restrictions(
        &self,
        user_id: UserId,
        tenant: Option<CompanyId>,
        resource: Resource,
    ) -> AppResult<BTreeMap<String, FieldVisibility>> {
        let roles = match self.resolver.resolve_roles(user_id, tenant).await {
            Ok(roles) => roles,
            Err(error) => return fail_closed(error, "field_restrictions"),
        };

        self.field_restrictions_for_roles(&roles, resource).await
    }

    /// Restriction merge over an already-resolved role set.
    ///
    /// Super-admins get the empty map: "no restrictions" is the correct
    /// representation of unrestricted access. Across multiple roles the
    /// merge is field-by-field, most restrictive wins; with exactly one
    /// contributing role the result is that role's map unchanged.
    pub async fn field_restrictions_for_roles(
        &self,
        roles: &[ResolvedRole],
        resource: Resource,
    ) -> AppResult<BTreeMap<String, FieldVisibility>> {
        if roles.iter().any(ResolvedRole::is_super_admin) {
            return Ok(BTreeMap::new());
        }

        let role_ids: Vec<RoleId> = roles.iter().filter_map(|role| role.role_id).collect();
        if role_ids.is_empty() {
            return Ok(BTreeMap::new());
        }

        let permissions = match self.permissions.list_permissions_for_roles(&role_ids).await {
            Ok(permissions) => permissions,
            Err(error) => return fail_closed(error, "field_restrictions"),
        };

        let mut merged: BTreeMap<String, FieldVisibility> = BTreeMap::new();
        for permission in permissions {
            if !permission.is_active || permission.resource != resource {
                continue;
            }

            for (field, visibility) in permission.field_restrictions {
                merged
                    .entry(field)
                    .and_modify(|current| *current = current.most_restrictive(visibility))
                    .or_insert(visibility);
            }
        }

        Ok(merged)
    }
}
